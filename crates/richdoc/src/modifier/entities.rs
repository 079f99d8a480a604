//! Entity-aware edit helpers.
//!
//! Non-mutable entity runs must never be silently truncated: a selection
//! boundary inside an IMMUTABLE or SEGMENTED run clears the run's entity
//! references before the edit, and a deletion inside a single run grows to
//! the run (IMMUTABLE) or to segment boundaries (SEGMENTED) instead of
//! nibbling at it.

use std::sync::Arc;

use crate::block::ContentBlock;
use crate::entity::{EntityRegistry, Mutability};
use crate::error::ModelError;
use crate::keys::EntityKey;
use crate::modifier::operations::RemovalDirection;
use crate::pool::{CharacterMetadata, MetadataPool};
use crate::selection::SelectionState;
use crate::state::ContentState;

// ── Edge clearing ──────────────────────────────────────────────────────────

/// Clears entity references around selection boundaries that fall inside a
/// non-mutable entity run. Selections are left untouched.
pub(crate) fn remove_entities_at_edges(
    state: &ContentState,
    sel: &SelectionState,
) -> Result<ContentState, ModelError> {
    let pool = Arc::clone(state.pool());
    let entities = state.entity_registry().clone();
    let mut blocks = state.block_map().clone();

    let start_key = sel.start_key().clone();
    let start_block = blocks
        .get(&start_key)
        .ok_or_else(|| ModelError::unknown_block(&start_key))?;
    let mut end_source = Arc::clone(start_block);
    if let Some(updated) = strip_edge_entity(&pool, &entities, start_block, sel.start_offset())? {
        let updated = Arc::new(updated);
        if sel.start_key() == sel.end_key() {
            end_source = Arc::clone(&updated);
        }
        blocks = blocks.set(updated.as_ref().clone());
    }

    let end_key = sel.end_key().clone();
    let end_block = if sel.start_key() == sel.end_key() {
        end_source
    } else {
        Arc::clone(
            blocks
                .get(&end_key)
                .ok_or_else(|| ModelError::unknown_block(&end_key))?,
        )
    };
    if let Some(updated) = strip_edge_entity(&pool, &entities, &end_block, sel.end_offset())? {
        blocks = blocks.set(updated);
    }

    Ok(state.with_block_map(blocks))
}

/// When the characters on both sides of `offset` share one non-mutable
/// entity, returns the block with that whole run's entity cleared.
fn strip_edge_entity(
    pool: &MetadataPool,
    entities: &EntityRegistry,
    block: &ContentBlock,
    offset: usize,
) -> Result<Option<ContentBlock>, ModelError> {
    let before = offset
        .checked_sub(1)
        .and_then(|i| block.entity_at(i));
    let after = block.entity_at(offset);
    let key = match (before, after) {
        (Some(b), Some(a)) if b == a => a,
        _ => return Ok(None),
    };
    if entities.get(key)?.mutability == Mutability::Mutable {
        return Ok(None);
    }

    let (start, end) = match run_containing(block.chars(), key, offset) {
        Some(run) => run,
        None => return Ok(None),
    };
    let mut chars = block.chars().to_vec();
    for slot in &mut chars[start..end] {
        *slot = pool.apply_entity(slot, None);
    }
    Ok(Some(block.clone().with_chars(chars)))
}

/// The maximal run of characters carrying `key` that contains the boundary
/// at `offset` (characters on both sides belong to it).
fn run_containing(
    chars: &[Arc<CharacterMetadata>],
    key: EntityKey,
    offset: usize,
) -> Option<(usize, usize)> {
    if offset == 0 || offset >= chars.len() {
        return None;
    }
    if chars[offset - 1].entity != Some(key) || chars[offset].entity != Some(key) {
        return None;
    }
    let mut start = offset;
    while start > 0 && chars[start - 1].entity == Some(key) {
        start -= 1;
    }
    let mut end = offset;
    while end < chars.len() && chars[end].entity == Some(key) {
        end += 1;
    }
    (start < end).then_some((start, end))
}

// ── Removal range adjustment ───────────────────────────────────────────────

/// Adjusts a single-block removal range that lies wholly inside one entity
/// run, honoring the entity's mutability.
pub(crate) fn character_removal_range(
    entities: &EntityRegistry,
    block: &ContentBlock,
    sel: &SelectionState,
    direction: RemovalDirection,
) -> Result<SelectionState, ModelError> {
    let start = sel.start_offset();
    let end = sel.end_offset();
    let key = match block.entity_at(start) {
        Some(key) => key,
        None => return Ok(sel.clone()),
    };
    let mutability = entities.get(key)?.mutability;
    if mutability == Mutability::Mutable {
        return Ok(sel.clone());
    }

    // The removal range must overlap exactly one run of this entity.
    let overlapping: Vec<(usize, usize)> = entity_runs(block.chars(), key)
        .into_iter()
        .filter(|&(run_start, run_end)| start < run_end && end > run_start)
        .collect();
    let (run_start, run_end) = match overlapping.as_slice() {
        [run] => *run,
        _ => return Ok(sel.clone()),
    };

    let adjusted = match mutability {
        Mutability::Immutable => (run_start, run_end),
        Mutability::Segmented => {
            let run_text = block.text_slice(run_start, run_end);
            match segment_removal_range(start, end, run_text, run_start, direction) {
                Some(range) => range,
                None => return Ok(sel.clone()),
            }
        }
        Mutability::Mutable => (start, end),
    };
    Ok(sel.with_offsets(adjusted.0, adjusted.1))
}

/// Maximal contiguous runs of characters carrying `key`.
fn entity_runs(chars: &[Arc<CharacterMetadata>], key: EntityKey) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, c) in chars.iter().enumerate() {
        if c.entity == Some(key) {
            start.get_or_insert(i);
        } else if let Some(s) = start.take() {
            runs.push((s, i));
        }
    }
    if let Some(s) = start {
        runs.push((s, chars.len()));
    }
    runs
}

/// Grows a removal range inside a SEGMENTED run to segment boundaries.
///
/// Segments are the space-delimited words of the run; each separator space
/// sticks to the following segment for forward deletes and to the preceding
/// one for backward deletes. A partial removal at one end of the run also
/// consumes the adjacent separator, so deleting a word from a mention takes
/// its joining space with it.
fn segment_removal_range(
    sel_start: usize,
    sel_end: usize,
    run_text: &str,
    run_start: usize,
    direction: RemovalDirection,
) -> Option<(usize, usize)> {
    let words: Vec<&str> = run_text.split(' ').collect();
    let mut segments: Vec<usize> = Vec::with_capacity(words.len());
    for (i, word) in words.iter().enumerate() {
        let mut len = word.chars().count();
        match direction {
            RemovalDirection::Forward => {
                if i > 0 {
                    len += 1; // leading separator
                }
            }
            RemovalDirection::Backward => {
                if i < words.len() - 1 {
                    len += 1; // trailing separator
                }
            }
        }
        segments.push(len);
    }

    let mut removal_start = None;
    let mut removal_end = None;
    let mut segment_start = run_start;
    for len in segments {
        let segment_end = segment_start + len;
        if sel_start < segment_end && segment_start < sel_end {
            if removal_start.is_none() {
                removal_start = Some(segment_start);
            }
            removal_end = Some(segment_end);
        }
        segment_start = segment_end;
    }
    let (mut start, mut end) = (removal_start?, removal_end?);

    let run_end = run_start + run_text.chars().count();
    let at_start = start == run_start;
    let at_end = end == run_end;
    if at_start != at_end {
        match direction {
            RemovalDirection::Forward => {
                if end != run_end {
                    end += 1;
                }
            }
            RemovalDirection::Backward => {
                if start != run_start {
                    start -= 1;
                }
            }
        }
    }
    Some((start, end))
}

// ── Entity application ─────────────────────────────────────────────────────

/// Stamps `entity` (or clears, for `None`) over every selected character.
pub(crate) fn apply_entity_to_state(
    state: &ContentState,
    sel: &SelectionState,
    entity: Option<EntityKey>,
) -> Result<ContentState, ModelError> {
    let pool = Arc::clone(state.pool());
    let start_key = sel.start_key().clone();
    let end_key = sel.end_key().clone();
    if !state.block_map().contains_key(&start_key) {
        return Err(ModelError::unknown_block(&start_key));
    }
    if !state.block_map().contains_key(&end_key) {
        return Err(ModelError::unknown_block(&end_key));
    }

    let mut blocks = state.block_map().clone();
    let mut inside = false;
    for (key, block) in state.block_map().iter() {
        let at_start = key == &start_key;
        let at_end = key == &end_key;
        if at_start {
            inside = true;
        }
        if inside {
            let slice_start = if at_start { sel.start_offset().min(block.len()) } else { 0 };
            let slice_end = if at_end { sel.end_offset().min(block.len()) } else { block.len() };
            blocks = blocks.set(apply_entity_to_block(
                &pool,
                block,
                slice_start,
                slice_end,
                entity,
            ));
        }
        if at_end {
            break;
        }
    }
    Ok(state.with_blocks(blocks, sel.clone(), sel.clone()))
}

fn apply_entity_to_block(
    pool: &MetadataPool,
    block: &ContentBlock,
    start: usize,
    end: usize,
    entity: Option<EntityKey>,
) -> ContentBlock {
    let mut chars = block.chars().to_vec();
    for slot in &mut chars[start..end.max(start)] {
        *slot = pool.apply_entity(slot, entity);
    }
    block.clone().with_chars(chars)
}
