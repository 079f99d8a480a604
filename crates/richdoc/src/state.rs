//! The root immutable document value.
//!
//! A `ContentState` bundles the block map, the entity and meta registries,
//! the selections bracketing the last edit, and (when enabled) the operation
//! log. Every transaction returns a new value; unaffected blocks and
//! registries are shared by reference, and prior snapshots stay valid for as
//! long as someone holds them.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::block::{BlockMap, ContentBlock};
use crate::entity::{EntityData, EntityInstance, EntityRegistry, Mutability};
use crate::error::ModelError;
use crate::keys::{generate_random_key, BlockKey, EntityKey, MetaKey};
use crate::meta::{MetaData, MetaInstance, MetaRegistry};
use crate::modifier;
use crate::modifier::operations::Op;
use crate::pool::MetadataPool;
use crate::selection::SelectionState;

/// Immutable snapshot of a rich-text document.
#[derive(Debug, Clone)]
pub struct ContentState {
    pool: Arc<MetadataPool>,
    blocks: BlockMap,
    entities: Arc<EntityRegistry>,
    metas: Arc<MetaRegistry>,
    selection_before: SelectionState,
    selection_after: SelectionState,
    ot: bool,
    operations: Arc<Vec<Op>>,
}

fn default_delimiter() -> &'static Regex {
    static DELIMITER: OnceLock<Regex> = OnceLock::new();
    DELIMITER.get_or_init(|| Regex::new(r"\r\n?|\n").expect("literal delimiter pattern"))
}

/// Strips carriage returns so no block ever contains one.
fn sanitize_text(text: &str) -> String {
    text.replace('\r', "")
}

impl ContentState {
    // ── Construction ───────────────────────────────────────────────────────

    /// Assembles a state from prepared blocks, defaulting the selection to a
    /// collapsed point at the first block.
    pub fn create_from_block_array(
        pool: Arc<MetadataPool>,
        blocks: Vec<ContentBlock>,
        entities: Option<EntityRegistry>,
        metas: Option<MetaRegistry>,
    ) -> ContentState {
        let blocks = BlockMap::from_blocks(blocks);
        let selection = match blocks.first() {
            Some(first) => SelectionState::create_empty(first.key().clone()),
            None => SelectionState::default(),
        };
        ContentState {
            pool,
            blocks,
            entities: Arc::new(entities.unwrap_or_default()),
            metas: Arc::new(metas.unwrap_or_default()),
            selection_before: selection.clone(),
            selection_after: selection,
            ot: false,
            operations: Arc::new(Vec::new()),
        }
    }

    /// One `unstyled` block per delimiter-split segment of `text`, split on
    /// the default `\r\n?|\n` delimiter.
    pub fn create_from_text(pool: Arc<MetadataPool>, text: &str) -> ContentState {
        Self::create_from_text_with_delimiter(pool, text, default_delimiter())
    }

    pub fn create_from_text_with_delimiter(
        pool: Arc<MetadataPool>,
        text: &str,
        delimiter: &Regex,
    ) -> ContentState {
        let blocks = delimiter
            .split(text)
            .map(|segment| {
                let segment = sanitize_text(segment);
                let chars = vec![pool.empty(); segment.chars().count()];
                ContentBlock::new(generate_random_key()).with_text(segment, chars)
            })
            .collect();
        Self::create_from_block_array(pool, blocks, None, None)
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn pool(&self) -> &Arc<MetadataPool> {
        &self.pool
    }

    pub fn block_map(&self) -> &BlockMap {
        &self.blocks
    }

    pub fn entity_registry(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn meta_registry(&self) -> &MetaRegistry {
        &self.metas
    }

    pub fn selection_before(&self) -> &SelectionState {
        &self.selection_before
    }

    pub fn selection_after(&self) -> &SelectionState {
        &self.selection_after
    }

    pub fn is_ot_enabled(&self) -> bool {
        self.ot
    }

    /// The insertion-ordered transaction log.
    pub fn operations(&self) -> &[Op] {
        &self.operations
    }

    // ── Block traversal ────────────────────────────────────────────────────

    pub fn block_for_key(&self, key: &BlockKey) -> Option<&Arc<ContentBlock>> {
        self.blocks.get(key)
    }

    pub fn first_block(&self) -> Option<&Arc<ContentBlock>> {
        self.blocks.first()
    }

    pub fn last_block(&self) -> Option<&Arc<ContentBlock>> {
        self.blocks.last()
    }

    pub fn key_before(&self, key: &BlockKey) -> Option<&BlockKey> {
        self.blocks.key_before(key)
    }

    pub fn key_after(&self, key: &BlockKey) -> Option<&BlockKey> {
        self.blocks.key_after(key)
    }

    pub fn block_before(&self, key: &BlockKey) -> Option<&Arc<ContentBlock>> {
        self.blocks.block_before(key)
    }

    pub fn block_after(&self, key: &BlockKey) -> Option<&Arc<ContentBlock>> {
        self.blocks.block_after(key)
    }

    /// Block texts joined by `delimiter` (newline when `None`).
    pub fn plain_text(&self, delimiter: Option<&str>) -> String {
        let delimiter = delimiter.unwrap_or("\n");
        let mut out = String::new();
        for (i, block) in self.blocks.values().enumerate() {
            if i > 0 {
                out.push_str(delimiter);
            }
            out.push_str(block.text());
        }
        out
    }

    /// True when the document holds any text at all.
    pub fn has_text(&self) -> bool {
        self.blocks.len() > 1 || self.first_block().map(|b| b.len() > 0).unwrap_or(false)
    }

    // ── Registry access ────────────────────────────────────────────────────

    pub fn get_entity(&self, key: EntityKey) -> Result<Arc<EntityInstance>, ModelError> {
        self.entities.get(key).map(Arc::clone)
    }

    pub fn get_meta(&self, key: MetaKey) -> Result<Arc<MetaInstance>, ModelError> {
        self.metas.get(key).map(Arc::clone)
    }

    pub fn last_created_entity_key(&self) -> Option<EntityKey> {
        self.entities.last_key()
    }

    pub fn last_created_meta_key(&self) -> Option<MetaKey> {
        self.metas.last_key()
    }

    // ── Registry transactions (conveniences over `modifier`) ───────────────

    pub fn create_entity(
        &self,
        entity_type: impl Into<String>,
        mutability: Mutability,
        data: EntityData,
        key: Option<EntityKey>,
    ) -> ContentState {
        modifier::create_entity(self, entity_type, mutability, data, key)
    }

    pub fn add_entity(&self, instance: EntityInstance, key: Option<EntityKey>) -> ContentState {
        modifier::add_entity(self, instance, key)
    }

    pub fn merge_entity_data(
        &self,
        key: EntityKey,
        patch: &EntityData,
    ) -> Result<ContentState, ModelError> {
        modifier::merge_entity_data(self, key, patch)
    }

    pub fn replace_entity_data(
        &self,
        key: EntityKey,
        data: EntityData,
    ) -> Result<ContentState, ModelError> {
        modifier::replace_entity_data(self, key, data)
    }

    pub fn create_meta(
        &self,
        meta_type: impl Into<String>,
        data: MetaData,
        key: Option<MetaKey>,
    ) -> ContentState {
        modifier::create_meta(self, meta_type, data, key)
    }

    pub fn add_meta(&self, instance: MetaInstance, key: Option<MetaKey>) -> ContentState {
        modifier::add_meta(self, instance, key)
    }

    pub fn merge_meta_data(&self, key: MetaKey, patch: &MetaData) -> Result<ContentState, ModelError> {
        modifier::merge_meta_data(self, key, patch)
    }

    pub fn replace_meta_data(&self, key: MetaKey, data: MetaData) -> Result<ContentState, ModelError> {
        modifier::replace_meta_data(self, key, data)
    }

    // ── Operation log control ──────────────────────────────────────────────

    pub fn enable_ot(&self) -> ContentState {
        let mut next = self.clone();
        next.ot = true;
        next
    }

    pub fn disable_ot(&self) -> ContentState {
        let mut next = self.clone();
        next.ot = false;
        next
    }

    pub fn clear_operations(&self) -> ContentState {
        let mut next = self.clone();
        next.operations = Arc::new(Vec::new());
        next
    }

    /// Appends `op` to the log when tracking is enabled; the log entry lands
    /// before the edit it describes is applied.
    pub(crate) fn log_op(&self, op: Op) -> ContentState {
        if !self.ot {
            return self.clone();
        }
        let mut ops: Vec<Op> = (*self.operations).clone();
        ops.push(op);
        let mut next = self.clone();
        next.operations = Arc::new(ops);
        next
    }

    // ── Derived copies (crate-internal) ────────────────────────────────────

    pub(crate) fn with_blocks(
        &self,
        blocks: BlockMap,
        selection_before: SelectionState,
        selection_after: SelectionState,
    ) -> ContentState {
        let mut next = self.clone();
        next.blocks = blocks;
        next.selection_before = selection_before;
        next.selection_after = selection_after;
        next
    }

    pub(crate) fn with_block_map(&self, blocks: BlockMap) -> ContentState {
        let mut next = self.clone();
        next.blocks = blocks;
        next
    }

    pub(crate) fn with_selection_after(&self, selection_after: SelectionState) -> ContentState {
        let mut next = self.clone();
        next.selection_after = selection_after;
        next
    }

    pub(crate) fn with_entities(&self, entities: EntityRegistry) -> ContentState {
        let mut next = self.clone();
        next.entities = Arc::new(entities);
        next
    }

    pub(crate) fn with_metas(&self, metas: MetaRegistry) -> ContentState {
        let mut next = self.clone();
        next.metas = Arc::new(metas);
        next
    }

}
