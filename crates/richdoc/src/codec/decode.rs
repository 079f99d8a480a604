//! Raw wire format to [`ContentState`].
//!
//! Decode is best-effort by contract: unknown storage keys drop the ranges
//! that reference them, missing optional fields take defaults, and nothing
//! here returns an error. Entities and metas are renumbered into fresh
//! registries; wire storage keys never leak into the document.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::block::ContentBlock;
use crate::entity::{EntityInstance, EntityRegistry, Mutability};
use crate::keys::{generate_random_key, BlockKey, EntityKey, MetaKey};
use crate::meta::{MetaInstance, MetaRegistry};
use crate::pool::{CharacterMetadata, MetadataPool, StyleMetaMap, StyleSet};
use crate::state::ContentState;

use super::raw::{storage_key, RawBlock, RawContentState};

/// Decodes a raw wire document into a [`ContentState`] backed by `pool`.
pub fn decode(pool: &Arc<MetadataPool>, raw: &RawContentState) -> ContentState {
    let mut metas = MetaRegistry::new();
    let mut meta_keys: HashMap<&str, MetaKey> = HashMap::new();
    for (stored, raw_meta) in &raw.meta_map {
        let instance = MetaInstance::new(
            raw_meta.meta_type.clone().unwrap_or_default(),
            raw_meta.data.clone().unwrap_or_default(),
        );
        let (next, key) = metas.add(instance, None);
        metas = next;
        meta_keys.insert(stored.as_str(), key);
    }

    let mut entities = EntityRegistry::new();
    let mut entity_keys: HashMap<&str, EntityKey> = HashMap::new();
    for (stored, raw_entity) in &raw.entity_map {
        let instance = EntityInstance::new(
            raw_entity.entity_type.clone().unwrap_or_default(),
            raw_entity
                .mutability
                .as_deref()
                .map(Mutability::from_wire)
                .unwrap_or_default(),
            raw_entity.data.clone().unwrap_or_default(),
        );
        let (next, key) = entities.add(instance, None);
        entities = next;
        entity_keys.insert(stored.as_str(), key);
    }

    let blocks = raw
        .blocks
        .iter()
        .map(|raw_block| decode_block(pool, raw_block, &entity_keys, &meta_keys))
        .collect();

    ContentState::create_from_block_array(Arc::clone(pool), blocks, Some(entities), Some(metas))
}

/// Parses a JSON value through the wire structs first; only serde-level
/// shape errors (a non-object document, a numeric `text`) surface.
pub fn from_json(pool: &Arc<MetadataPool>, value: &Value) -> Result<ContentState, serde_json::Error> {
    let raw: RawContentState = serde_json::from_value(value.clone())?;
    Ok(decode(pool, &raw))
}

fn decode_block(
    pool: &MetadataPool,
    raw: &RawBlock,
    entity_keys: &HashMap<&str, EntityKey>,
    meta_keys: &HashMap<&str, MetaKey>,
) -> ContentBlock {
    let key = raw
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(BlockKey::from)
        .unwrap_or_else(generate_random_key);
    let char_count = raw.text.chars().count();

    let mut styles: Vec<StyleSet> = vec![StyleSet::new(); char_count];
    let mut style_metas: Vec<StyleMetaMap> = vec![StyleMetaMap::new(); char_count];
    for range in &raw.inline_style_ranges {
        let (start, end) = utf16_range_to_chars(&raw.text, range.offset, range.length);
        // Provenance rides on the same ranges: a later range overrides an
        // earlier one for the same style at the same position.
        let meta = storage_key(&range.key).and_then(|k| meta_keys.get(k.as_str()).copied());
        for i in start..end {
            styles[i].insert(range.style.clone());
            if let Some(meta) = meta {
                style_metas[i].insert(range.style.clone(), meta);
            }
        }
    }

    let mut entity_refs: Vec<Option<EntityKey>> = vec![None; char_count];
    for range in &raw.entity_ranges {
        // Ranges naming an unknown storage key are dropped, not fatal.
        let key = match storage_key(&range.key).and_then(|k| entity_keys.get(k.as_str()).copied()) {
            Some(key) => key,
            None => continue,
        };
        let (start, end) = utf16_range_to_chars(&raw.text, range.offset, range.length);
        for slot in &mut entity_refs[start..end] {
            *slot = Some(key);
        }
    }

    let chars = styles
        .into_iter()
        .zip(entity_refs)
        .zip(style_metas)
        .map(|((style, entity), meta)| {
            pool.create(CharacterMetadata {
                style,
                entity,
                meta,
            })
        })
        .collect();

    ContentBlock::new(key)
        .with_type(raw.block_type.clone().unwrap_or_else(|| "unstyled".to_owned()))
        .with_depth(raw.depth.unwrap_or(0))
        .with_text(raw.text.clone(), chars)
        .with_data(raw.data.clone().unwrap_or_default())
}

/// Translates a wire range, counted in UTF-16 code units, into codepoint
/// positions in the per-character array.
///
/// Multi-unit codepoints occupy one array slot but two counting units, so
/// the text is walked codepoint by codepoint. Offsets landing inside a
/// codepoint round up to the next boundary; the result clamps to the text
/// length.
fn utf16_range_to_chars(text: &str, offset: usize, length: usize) -> (usize, usize) {
    let start = utf16_boundary_to_char(text, offset);
    let end = utf16_boundary_to_char(text, offset.saturating_add(length));
    (start, end.max(start))
}

fn utf16_boundary_to_char(text: &str, target_units: usize) -> usize {
    let mut units = 0;
    for (i, ch) in text.chars().enumerate() {
        if units >= target_units {
            return i;
        }
        units += ch.len_utf16();
    }
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_ranges_translate_one_to_one() {
        assert_eq!(utf16_range_to_chars("hello", 1, 3), (1, 4));
        assert_eq!(utf16_range_to_chars("hello", 0, 5), (0, 5));
    }

    #[test]
    fn surrogate_pairs_collapse_to_one_slot() {
        // '😀' is two UTF-16 units but one codepoint slot.
        let text = "a😀b";
        assert_eq!(utf16_range_to_chars(text, 0, 1), (0, 1));
        assert_eq!(utf16_range_to_chars(text, 1, 2), (1, 2));
        assert_eq!(utf16_range_to_chars(text, 3, 1), (2, 3));
        assert_eq!(utf16_range_to_chars(text, 0, 4), (0, 3));
    }

    #[test]
    fn ranges_clamp_to_text_length() {
        assert_eq!(utf16_range_to_chars("ab", 1, 10), (1, 2));
        assert_eq!(utf16_range_to_chars("ab", 9, 3), (2, 2));
    }
}
