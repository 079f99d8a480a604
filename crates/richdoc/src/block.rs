//! Content blocks and the ordered block map.
//!
//! A block is a paragraph-like unit: a character sequence plus one metadata
//! value per character and block-level attributes. All offsets are codepoint
//! positions; `chars.len() == text.chars().count()` is the structural
//! invariant every constructor and transaction maintains.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::keys::{generate_random_key, BlockKey, EntityKey};
use crate::pool::{CharacterMetadata, StyleSet};

/// Free-form block-level attributes (wire `data` field).
pub type BlockData = serde_json::Map<String, Value>;

/// Block type tag of a freshly created paragraph.
pub const UNSTYLED: &str = "unstyled";

// ── ContentBlock ───────────────────────────────────────────────────────────

/// One ordered text block with per-character metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    key: BlockKey,
    block_type: String,
    depth: u32,
    text: String,
    chars: Vec<Arc<CharacterMetadata>>,
    data: BlockData,
}

impl ContentBlock {
    /// An empty `unstyled` block.
    pub fn new(key: BlockKey) -> Self {
        ContentBlock {
            key,
            block_type: UNSTYLED.to_owned(),
            depth: 0,
            text: String::new(),
            chars: Vec::new(),
            data: BlockData::new(),
        }
    }

    // ── Derived copies (builder-style) ─────────────────────────────────────

    pub fn with_key(mut self, key: BlockKey) -> Self {
        self.key = key;
        self
    }

    pub fn with_type(mut self, block_type: impl Into<String>) -> Self {
        self.block_type = block_type.into();
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Replaces text and character list together.
    ///
    /// Callers must pass one metadata value per codepoint of `text`; this is
    /// checked in debug builds.
    pub fn with_text(mut self, text: impl Into<String>, chars: Vec<Arc<CharacterMetadata>>) -> Self {
        self.text = text.into();
        debug_assert_eq!(self.text.chars().count(), chars.len());
        self.chars = chars;
        self
    }

    /// Replaces the character list only (text unchanged, same length).
    pub fn with_chars(mut self, chars: Vec<Arc<CharacterMetadata>>) -> Self {
        debug_assert_eq!(self.text.chars().count(), chars.len());
        self.chars = chars;
        self
    }

    pub fn with_data(mut self, data: BlockData) -> Self {
        self.data = data;
        self
    }

    /// Shallow-merges `patch` over the existing data map.
    pub fn merging_data(mut self, patch: &BlockData) -> Self {
        for (k, v) in patch {
            self.data.insert(k.clone(), v.clone());
        }
        self
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn key(&self) -> &BlockKey {
        &self.key
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &[Arc<CharacterMetadata>] {
        &self.chars
    }

    pub fn data(&self) -> &BlockData {
        &self.data
    }

    /// Block length in codepoints.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn char_at(&self, offset: usize) -> Option<&Arc<CharacterMetadata>> {
        self.chars.get(offset)
    }

    /// Entity reference of the character at `offset`, if any.
    pub fn entity_at(&self, offset: usize) -> Option<EntityKey> {
        self.chars.get(offset).and_then(|c| c.entity)
    }

    /// Style set of the character at `offset` (empty past the end).
    pub fn style_at(&self, offset: usize) -> Option<&StyleSet> {
        self.chars.get(offset).map(|c| &c.style)
    }

    /// Byte position of codepoint `offset` within `text`.
    pub fn byte_offset(&self, offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(offset)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Substring covering codepoints `start..end`.
    pub fn text_slice(&self, start: usize, end: usize) -> &str {
        &self.text[self.byte_offset(start)..self.byte_offset(end)]
    }
}

// ── BlockMap ───────────────────────────────────────────────────────────────

/// Ordered, unique-keyed sequence of blocks; iteration order is reading
/// order.
///
/// Updates derive a new map: block handles are `Arc`s, so an untouched block
/// is shared between the old and new snapshot, never copied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockMap {
    blocks: IndexMap<BlockKey, Arc<ContentBlock>>,
}

impl BlockMap {
    pub fn new() -> Self {
        BlockMap::default()
    }

    pub fn from_blocks<I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = ContentBlock>,
    {
        BlockMap {
            blocks: blocks
                .into_iter()
                .map(|b| (b.key().clone(), Arc::new(b)))
                .collect(),
        }
    }

    pub fn from_shared<I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = Arc<ContentBlock>>,
    {
        BlockMap {
            blocks: blocks
                .into_iter()
                .map(|b| (b.key().clone(), b))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains_key(&self, key: &BlockKey) -> bool {
        self.blocks.contains_key(key)
    }

    pub fn get(&self, key: &BlockKey) -> Option<&Arc<ContentBlock>> {
        self.blocks.get(key)
    }

    pub fn first(&self) -> Option<&Arc<ContentBlock>> {
        self.blocks.first().map(|(_, b)| b)
    }

    pub fn last(&self) -> Option<&Arc<ContentBlock>> {
        self.blocks.last().map(|(_, b)| b)
    }

    pub fn index_of(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.get_index_of(key)
    }

    pub fn key_before(&self, key: &BlockKey) -> Option<&BlockKey> {
        let idx = self.blocks.get_index_of(key)?;
        idx.checked_sub(1)
            .and_then(|i| self.blocks.get_index(i))
            .map(|(k, _)| k)
    }

    pub fn key_after(&self, key: &BlockKey) -> Option<&BlockKey> {
        let idx = self.blocks.get_index_of(key)?;
        self.blocks.get_index(idx + 1).map(|(k, _)| k)
    }

    pub fn block_before(&self, key: &BlockKey) -> Option<&Arc<ContentBlock>> {
        let before = self.key_before(key)?;
        self.blocks.get(before)
    }

    pub fn block_after(&self, key: &BlockKey) -> Option<&Arc<ContentBlock>> {
        let after = self.key_after(key)?;
        self.blocks.get(after)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockKey, &Arc<ContentBlock>)> {
        self.blocks.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &BlockKey> {
        self.blocks.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Arc<ContentBlock>> {
        self.blocks.values()
    }

    /// Derives a map with `block` stored under its key, replacing in place
    /// when the key exists and appending otherwise.
    pub fn set(&self, block: ContentBlock) -> BlockMap {
        let mut blocks = self.blocks.clone();
        blocks.insert(block.key().clone(), Arc::new(block));
        BlockMap { blocks }
    }

    /// Derives a map without `key`, preserving the order of the rest.
    pub fn remove(&self, key: &BlockKey) -> BlockMap {
        let mut blocks = self.blocks.clone();
        blocks.shift_remove(key);
        BlockMap { blocks }
    }

    /// Derives a map with the contiguous run `start_key..=end_key` replaced
    /// by `replacement`.
    pub fn splice(
        &self,
        start_key: &BlockKey,
        end_key: &BlockKey,
        replacement: Vec<Arc<ContentBlock>>,
    ) -> BlockMap {
        let mut blocks = IndexMap::with_capacity(self.blocks.len() + replacement.len());
        let mut inside = false;
        for (key, block) in &self.blocks {
            if key == start_key {
                inside = true;
                for repl in &replacement {
                    blocks.insert(repl.key().clone(), Arc::clone(repl));
                }
            }
            if !inside {
                blocks.insert(key.clone(), Arc::clone(block));
            }
            if inside && key == end_key {
                inside = false;
            }
        }
        BlockMap { blocks }
    }

    /// A random key not currently present in the map.
    pub fn fresh_key(&self) -> BlockKey {
        loop {
            let key = generate_random_key();
            if !self.blocks.contains_key(&key) {
                return key;
            }
        }
    }
}

impl FromIterator<ContentBlock> for BlockMap {
    fn from_iter<I: IntoIterator<Item = ContentBlock>>(iter: I) -> Self {
        BlockMap::from_blocks(iter)
    }
}
