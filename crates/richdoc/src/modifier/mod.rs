//! The transaction algebra.
//!
//! Every public function here takes a state and a target selection, derives
//! a new state whose `selection_after` exactly delimits the edit result, and
//! leaves the input untouched. Larger edits decompose into these
//! transactions: replacing text is remove-entities-at-edges, remove-range,
//! insert-text; moving text is remove-range plus replace-with-fragment.
//!
//! When operation tracking is enabled on the state, each transaction appends
//! its [`Op`](operations::Op) descriptor to the log before applying the
//! edit.

pub mod operations;

mod entities;
mod range;
mod styles;

use std::sync::Arc;

use crate::block::{BlockData, BlockMap};
use crate::entity::{EntityData, EntityInstance, Mutability};
use crate::error::ModelError;
use crate::keys::{BlockKey, EntityKey, MetaKey};
use crate::meta::{MetaData, MetaInstance};
use crate::pool::{CharacterMetadata, StyleSet};
use crate::selection::SelectionState;
use crate::state::ContentState;

pub use operations::{InsertionMode, Op, RemovalDirection};

use entities::{apply_entity_to_state, character_removal_range, remove_entities_at_edges};
use range::{
    adjust_block_depth_for_state, insert_fragment_into_state, insert_text_into_state,
    modify_block_for_state, move_block_in_state, remove_range_from_state, split_block_in_state,
    state_fragment,
};
use styles::{modify_inline_style, StyleEdit};

// ── Text ───────────────────────────────────────────────────────────────────

/// Replaces the selected range with `text`, stamping every inserted
/// character with `style`/`entity`.
pub fn replace_text(
    state: &ContentState,
    range: &SelectionState,
    text: &str,
    style: Option<StyleSet>,
    entity: Option<EntityKey>,
) -> Result<ContentState, ModelError> {
    let style = style.unwrap_or_default();
    let state = state.log_op(Op::ReplaceText {
        target: range.clone(),
        text: text.to_owned(),
        style: style.clone(),
        entity,
    });
    let without_entities = remove_entities_at_edges(&state, range)?;
    let without_text = remove_range_from_state(&without_entities, range)?;
    let character = without_text.pool().create(CharacterMetadata {
        style,
        entity,
        ..Default::default()
    });
    let target = without_text.selection_after().clone();
    insert_text_into_state(&without_text, &target, text, character)
}

/// Inserts `text` at a collapsed selection.
///
/// Fails with [`ModelError::InvalidTarget`] when the target has a range; the
/// input state is unaffected.
pub fn insert_text(
    state: &ContentState,
    target: &SelectionState,
    text: &str,
    style: Option<StyleSet>,
    entity: Option<EntityKey>,
) -> Result<ContentState, ModelError> {
    if !target.is_collapsed() {
        return Err(ModelError::InvalidTarget(
            "target range must be collapsed for insert_text",
        ));
    }
    replace_text(state, target, text, style, entity)
}

/// Removes the selected range.
///
/// A range wholly inside one entity run is adjusted first: IMMUTABLE runs
/// are deleted whole, SEGMENTED runs to the segment boundary picked by
/// `direction`. Otherwise boundary entities are cleared and the raw range
/// removed, merging boundary blocks when the range spans several.
pub fn remove_range(
    state: &ContentState,
    range: &SelectionState,
    direction: RemovalDirection,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::RemoveRange {
        range: range.clone(),
        direction,
    });

    if range.is_within_block() && !range.is_collapsed() {
        let key = range.start_key().clone();
        let block = state
            .block_map()
            .get(&key)
            .ok_or_else(|| ModelError::unknown_block(&key))?;
        let start_entity = block.entity_at(range.start_offset());
        let end_entity = range
            .end_offset()
            .checked_sub(1)
            .and_then(|i| block.entity_at(i));
        if let (Some(start), Some(end)) = (start_entity, end_entity) {
            if start == end {
                let adjusted =
                    character_removal_range(state.entity_registry(), block, range, direction)?;
                return remove_range_from_state(&state, &adjusted);
            }
        }
    }

    let without_entities = remove_entities_at_edges(&state, range)?;
    remove_range_from_state(&without_entities, range)
}

/// Replaces the selected range with a detached block fragment.
///
/// Fragment blocks lacking a key, or whose key collides with a block already
/// in the document, are re-keyed first.
pub fn replace_with_fragment(
    state: &ContentState,
    target: &SelectionState,
    fragment: &BlockMap,
) -> Result<ContentState, ModelError> {
    let fragment = rekey_fragment(state.block_map(), fragment);
    let state = state.log_op(Op::ReplaceWithFragment {
        target: target.clone(),
        fragment: fragment.clone(),
    });
    let without_entities = remove_entities_at_edges(&state, target)?;
    let without_text = remove_range_from_state(&without_entities, target)?;
    let at = without_text.selection_after().clone();
    insert_fragment_into_state(&without_text, &at, &fragment)
}

/// Moves the selected range to `target`: extract fragment, remove, reinsert.
///
/// `target` must be valid in the state left by the removal, so it cannot
/// overlap `removal`.
pub fn move_text(
    state: &ContentState,
    removal: &SelectionState,
    target: &SelectionState,
) -> Result<ContentState, ModelError> {
    let fragment = state_fragment(state, removal)?;
    let after_removal = remove_range(state, removal, RemovalDirection::Backward)?;
    replace_with_fragment(&after_removal, target, &fragment)
}

/// Copies the selected range out as a detached fragment, for later
/// [`replace_with_fragment`] / [`move_text`] style reinsertion.
pub fn extract_fragment(
    state: &ContentState,
    selection: &SelectionState,
) -> Result<BlockMap, ModelError> {
    state_fragment(state, selection)
}

fn rekey_fragment(existing: &BlockMap, fragment: &BlockMap) -> BlockMap {
    let mut rekeyed = Vec::with_capacity(fragment.len());
    for block in fragment.values() {
        if block.key().is_empty() || existing.contains_key(block.key()) {
            rekeyed.push(Arc::new(
                block.as_ref().clone().with_key(existing.fresh_key()),
            ));
        } else {
            rekeyed.push(Arc::clone(block));
        }
    }
    BlockMap::from_shared(rekeyed)
}

// ── Blocks ─────────────────────────────────────────────────────────────────

/// Splits the block at the selection into two; any selected range is removed
/// first. The lower block takes `key_below` or a freshly generated key.
pub fn split_block(
    state: &ContentState,
    selection: &SelectionState,
    key_below: Option<BlockKey>,
) -> Result<ContentState, ModelError> {
    let key_below = key_below.unwrap_or_else(|| state.block_map().fresh_key());
    let state = state.log_op(Op::SplitBlock {
        target: selection.clone(),
        key_below: key_below.clone(),
    });
    let without_entities = remove_entities_at_edges(&state, selection)?;
    let without_text = remove_range_from_state(&without_entities, selection)?;
    let at = without_text.selection_after().clone();
    split_block_in_state(&without_text, &at, key_below)
}

/// Relocates `block` before or after `target` (used for atomic blocks).
pub fn move_block(
    state: &ContentState,
    block: &BlockKey,
    target: &BlockKey,
    mode: InsertionMode,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::MoveBlock {
        block: block.clone(),
        target: target.clone(),
        mode,
    });
    move_block_in_state(&state, block, target, mode)
}

/// Drops one block by key, adopting `selection_after` as the new selection.
pub fn remove_block(
    state: &ContentState,
    selection_after: &SelectionState,
    key: &BlockKey,
) -> Result<ContentState, ModelError> {
    if !state.block_map().contains_key(key) {
        return Err(ModelError::unknown_block(key));
    }
    let blocks = state.block_map().remove(key);
    if !blocks.contains_key(selection_after.start_key()) {
        return Err(ModelError::unknown_block(selection_after.start_key()));
    }
    Ok(state.with_blocks(blocks, state.selection_after().clone(), selection_after.clone()))
}

/// Sets the type of every selected block, resetting depth to 0.
pub fn set_block_type(
    state: &ContentState,
    selection: &SelectionState,
    block_type: impl Into<String>,
) -> Result<ContentState, ModelError> {
    let block_type = block_type.into();
    let state = state.log_op(Op::SetBlockType {
        range: selection.clone(),
        block_type: block_type.clone(),
    });
    modify_block_for_state(&state, selection, |block| {
        block.clone().with_type(block_type.clone()).with_depth(0)
    })
}

/// Replaces the data map of every selected block.
pub fn set_block_data(
    state: &ContentState,
    selection: &SelectionState,
    data: BlockData,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::SetBlockData {
        range: selection.clone(),
        data: data.clone(),
    });
    modify_block_for_state(&state, selection, |block| {
        block.clone().with_data(data.clone())
    })
}

/// Shallow-merges `data` into every selected block's data map.
pub fn merge_block_data(
    state: &ContentState,
    selection: &SelectionState,
    data: BlockData,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::MergeBlockData {
        range: selection.clone(),
        data: data.clone(),
    });
    modify_block_for_state(&state, selection, |block| block.clone().merging_data(&data))
}

/// Changes list nesting depth of every selected block by `adjustment`,
/// clamped to `[0, max_depth]`.
pub fn adjust_block_depth(
    state: &ContentState,
    selection: &SelectionState,
    adjustment: i32,
    max_depth: u32,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::AdjustBlockDepth {
        range: selection.clone(),
        adjustment,
        max_depth,
    });
    adjust_block_depth_for_state(&state, selection, adjustment, max_depth)
}

// ── Inline styles ──────────────────────────────────────────────────────────

/// Adds `style` to every selected character, recording `meta` provenance
/// when given.
pub fn apply_inline_style(
    state: &ContentState,
    selection: &SelectionState,
    style: &str,
    meta: Option<MetaKey>,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::ApplyInlineStyle {
        range: selection.clone(),
        style: style.to_owned(),
        meta,
    });
    modify_inline_style(&state, selection, StyleEdit::Apply { style, meta })
}

/// Removes `style` (and its provenance entry) from every selected character.
pub fn remove_inline_style(
    state: &ContentState,
    selection: &SelectionState,
    style: &str,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::RemoveInlineStyle {
        range: selection.clone(),
        style: style.to_owned(),
    });
    modify_inline_style(&state, selection, StyleEdit::Remove { style })
}

// ── Entities ───────────────────────────────────────────────────────────────

/// Stamps `entity` over the selection (or clears it, for `None`), first
/// clearing non-mutable entities straddling the selection edges.
pub fn apply_entity(
    state: &ContentState,
    selection: &SelectionState,
    entity: Option<EntityKey>,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::ApplyEntity {
        range: selection.clone(),
        entity,
    });
    let without_entities = remove_entities_at_edges(&state, selection)?;
    apply_entity_to_state(&without_entities, selection, entity)
}

/// Creates a registry entity; the key defaults to `last + 1` (first `1`).
pub fn create_entity(
    state: &ContentState,
    entity_type: impl Into<String>,
    mutability: Mutability,
    data: EntityData,
    key: Option<EntityKey>,
) -> ContentState {
    let entity_type = entity_type.into();
    let key = key.unwrap_or_else(|| state.entity_registry().next_key());
    let state = state.log_op(Op::CreateEntity {
        entity_type: entity_type.clone(),
        mutability,
        data: data.clone(),
        key,
    });
    let (registry, _) = state
        .entity_registry()
        .add(EntityInstance::new(entity_type, mutability, data), Some(key));
    state.with_entities(registry)
}

/// Appends a prebuilt entity instance; same key defaulting as
/// [`create_entity`].
pub fn add_entity(
    state: &ContentState,
    instance: EntityInstance,
    key: Option<EntityKey>,
) -> ContentState {
    let key = key.unwrap_or_else(|| state.entity_registry().next_key());
    let state = state.log_op(Op::AddEntity {
        instance: Arc::new(instance.clone()),
        key,
    });
    let (registry, _) = state.entity_registry().add(instance, Some(key));
    state.with_entities(registry)
}

/// Shallow-merges `patch` into an entity's data.
pub fn merge_entity_data(
    state: &ContentState,
    key: EntityKey,
    patch: &EntityData,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::MergeEntityData {
        key,
        data: patch.clone(),
    });
    let registry = state.entity_registry().merge_data(key, patch)?;
    Ok(state.with_entities(registry))
}

/// Replaces an entity's data wholesale.
pub fn replace_entity_data(
    state: &ContentState,
    key: EntityKey,
    data: EntityData,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::ReplaceEntityData {
        key,
        data: data.clone(),
    });
    let registry = state.entity_registry().replace_data(key, data)?;
    Ok(state.with_entities(registry))
}

// ── Metas ──────────────────────────────────────────────────────────────────

/// Creates a registry meta; the key defaults to `last + 1` (first `1`).
pub fn create_meta(
    state: &ContentState,
    meta_type: impl Into<String>,
    data: MetaData,
    key: Option<MetaKey>,
) -> ContentState {
    let meta_type = meta_type.into();
    let key = key.unwrap_or_else(|| state.meta_registry().next_key());
    let state = state.log_op(Op::CreateMeta {
        meta_type: meta_type.clone(),
        data: data.clone(),
        key,
    });
    let (registry, _) = state
        .meta_registry()
        .add(MetaInstance::new(meta_type, data), Some(key));
    state.with_metas(registry)
}

/// Appends a prebuilt meta instance.
pub fn add_meta(state: &ContentState, instance: MetaInstance, key: Option<MetaKey>) -> ContentState {
    let key = key.unwrap_or_else(|| state.meta_registry().next_key());
    let state = state.log_op(Op::AddMeta {
        instance: Arc::new(instance.clone()),
        key,
    });
    let (registry, _) = state.meta_registry().add(instance, Some(key));
    state.with_metas(registry)
}

/// Shallow-merges `patch` into a meta's data.
pub fn merge_meta_data(
    state: &ContentState,
    key: MetaKey,
    patch: &MetaData,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::MergeMetaData {
        key,
        data: patch.clone(),
    });
    let registry = state.meta_registry().merge_data(key, patch)?;
    Ok(state.with_metas(registry))
}

/// Replaces a meta's data wholesale.
pub fn replace_meta_data(
    state: &ContentState,
    key: MetaKey,
    data: MetaData,
) -> Result<ContentState, ModelError> {
    let state = state.log_op(Op::ReplaceMetaData {
        key,
        data: data.clone(),
    });
    let registry = state.meta_registry().replace_data(key, data)?;
    Ok(state.with_metas(registry))
}
