//! Range primitives over the block map.
//!
//! The building blocks the public transactions compose: range removal,
//! text/fragment insertion, block split/move, and whole-block transforms.
//! Each derives a new state and leaves the input untouched. Offsets are
//! codepoints and out-of-range offsets clamp to block length, so a slice can
//! never panic on a stale selection.

use std::sync::Arc;

use crate::block::{BlockMap, ContentBlock};
use crate::error::ModelError;
use crate::keys::BlockKey;
use crate::modifier::operations::InsertionMode;
use crate::pool::CharacterMetadata;
use crate::selection::SelectionState;
use crate::state::ContentState;

fn block_for<'a>(
    state: &'a ContentState,
    key: &BlockKey,
) -> Result<&'a Arc<ContentBlock>, ModelError> {
    state
        .block_map()
        .get(key)
        .ok_or_else(|| ModelError::unknown_block(key))
}

// ── Removal ────────────────────────────────────────────────────────────────

/// Deletes the selected range, merging boundary blocks when the range spans
/// more than one.
///
/// A collapsed range leaves the blocks alone but still normalizes
/// `selection_after` to the collapsed point, so composed transactions (such
/// as replace-then-insert) target the right position.
pub(crate) fn remove_range_from_state(
    state: &ContentState,
    sel: &SelectionState,
) -> Result<ContentState, ModelError> {
    let start_key = sel.start_key().clone();
    let start_block = block_for(state, &start_key)?;
    let start_offset = sel.start_offset().min(start_block.len());

    let after = sel.collapse_to(start_key.clone(), start_offset);
    if sel.is_collapsed() {
        return Ok(state.with_blocks(state.block_map().clone(), sel.clone(), after));
    }

    let end_key = sel.end_key().clone();
    let end_block = block_for(state, &end_key)?;
    let end_offset = sel.end_offset().min(end_block.len());

    let merged = if start_key == end_key {
        let end_offset = end_offset.max(start_offset);
        let mut chars = start_block.chars()[..start_offset].to_vec();
        chars.extend_from_slice(&start_block.chars()[end_offset..]);
        let text = format!(
            "{}{}",
            start_block.text_slice(0, start_offset),
            start_block.text_slice(end_offset, start_block.len())
        );
        start_block.as_ref().clone().with_text(text, chars)
    } else {
        let mut chars = start_block.chars()[..start_offset].to_vec();
        chars.extend_from_slice(&end_block.chars()[end_offset..]);
        let text = format!(
            "{}{}",
            start_block.text_slice(0, start_offset),
            end_block.text_slice(end_offset, end_block.len())
        );
        start_block.as_ref().clone().with_text(text, chars)
    };

    let blocks = state
        .block_map()
        .splice(&start_key, &end_key, vec![Arc::new(merged)]);
    Ok(state.with_blocks(blocks, sel.clone(), after))
}

// ── Insertion ──────────────────────────────────────────────────────────────

/// Splices `text` at a collapsed position, stamping every inserted character
/// with the one pooled metadata value.
pub(crate) fn insert_text_into_state(
    state: &ContentState,
    sel: &SelectionState,
    text: &str,
    character: Arc<CharacterMetadata>,
) -> Result<ContentState, ModelError> {
    if !sel.is_collapsed() {
        return Err(ModelError::InvalidTarget(
            "text insertion target must be collapsed",
        ));
    }
    let key = sel.start_key().clone();
    let block = block_for(state, &key)?;
    let offset = sel.start_offset().min(block.len());
    let len = text.chars().count();
    if len == 0 {
        let after = sel.collapse_to(key, offset);
        return Ok(state.with_blocks(state.block_map().clone(), sel.clone(), after));
    }

    let mut chars = Vec::with_capacity(block.len() + len);
    chars.extend_from_slice(&block.chars()[..offset]);
    chars.extend(std::iter::repeat(character).take(len));
    chars.extend_from_slice(&block.chars()[offset..]);
    let new_text = format!(
        "{}{}{}",
        block.text_slice(0, offset),
        text,
        block.text_slice(offset, block.len())
    );
    let updated = block.as_ref().clone().with_text(new_text, chars);

    let after = sel.collapse_to(key, offset + len);
    Ok(state.with_blocks(state.block_map().set(updated), sel.clone(), after))
}

/// Splices a block fragment at a collapsed position.
///
/// A one-block fragment merges into the target block (adopting the
/// fragment's block data). A longer fragment splits the target: its head
/// joins the fragment's first block, interior fragment blocks land verbatim,
/// and the fragment's last block absorbs the target's tail and provides the
/// final caret block.
pub(crate) fn insert_fragment_into_state(
    state: &ContentState,
    sel: &SelectionState,
    fragment: &BlockMap,
) -> Result<ContentState, ModelError> {
    if !sel.is_collapsed() {
        return Err(ModelError::InvalidTarget(
            "fragment insertion target must be collapsed",
        ));
    }
    let key = sel.start_key().clone();
    let block = block_for(state, &key)?;
    let offset = sel.start_offset().min(block.len());

    let mut pieces = fragment.values();
    let first = match pieces.next() {
        Some(first) => first,
        None => {
            let after = sel.collapse_to(key, offset);
            return Ok(state.with_blocks(state.block_map().clone(), sel.clone(), after));
        }
    };

    if fragment.len() == 1 {
        let mut chars = Vec::with_capacity(block.len() + first.len());
        chars.extend_from_slice(&block.chars()[..offset]);
        chars.extend_from_slice(first.chars());
        chars.extend_from_slice(&block.chars()[offset..]);
        let text = format!(
            "{}{}{}",
            block.text_slice(0, offset),
            first.text(),
            block.text_slice(offset, block.len())
        );
        let updated = block
            .as_ref()
            .clone()
            .with_text(text, chars)
            .with_data(first.data().clone());
        let after = sel.collapse_to(key, offset + first.len());
        return Ok(state.with_blocks(state.block_map().set(updated), sel.clone(), after));
    }

    // Head: target text before the caret plus the fragment's first block.
    let head_empty = offset == 0;
    let mut head_chars = block.chars()[..offset].to_vec();
    head_chars.extend_from_slice(first.chars());
    let head_text = format!("{}{}", block.text_slice(0, offset), first.text());
    let head = block
        .as_ref()
        .clone()
        .with_text(head_text, head_chars)
        .with_type(if head_empty {
            first.block_type().to_owned()
        } else {
            block.block_type().to_owned()
        })
        .with_data(first.data().clone());

    let mut replacement: Vec<Arc<ContentBlock>> = vec![Arc::new(head)];
    let interior: Vec<_> = fragment.values().skip(1).collect();
    let (last, interior) = interior.split_last().expect("fragment has >= 2 blocks");
    for piece in interior {
        replacement.push(Arc::clone(piece));
    }

    // Tail: the fragment's last block absorbs the target's remainder.
    let final_key = last.key().clone();
    let final_offset = last.len();
    let mut tail_chars = last.chars().to_vec();
    tail_chars.extend_from_slice(&block.chars()[offset..]);
    let tail_text = format!("{}{}", last.text(), block.text_slice(offset, block.len()));
    let tail = last.as_ref().clone().with_text(tail_text, tail_chars);
    replacement.push(Arc::new(tail));

    let blocks = state.block_map().splice(&key, &key, replacement);
    let after = sel.collapse_to(final_key, final_offset);
    Ok(state.with_blocks(blocks, sel.clone(), after))
}

// ── Split / move ───────────────────────────────────────────────────────────

/// Splits a block at a collapsed position; the lower half takes `key_below`.
pub(crate) fn split_block_in_state(
    state: &ContentState,
    sel: &SelectionState,
    key_below: BlockKey,
) -> Result<ContentState, ModelError> {
    if !sel.is_collapsed() {
        return Err(ModelError::InvalidTarget(
            "block split target must be collapsed",
        ));
    }
    let key = sel.start_key().clone();
    let block = block_for(state, &key)?;
    let offset = sel.start_offset().min(block.len());

    let above = block
        .as_ref()
        .clone()
        .with_text(
            block.text_slice(0, offset).to_owned(),
            block.chars()[..offset].to_vec(),
        );
    // Block-level data stays with the upper block.
    let below = block
        .as_ref()
        .clone()
        .with_key(key_below.clone())
        .with_text(
            block.text_slice(offset, block.len()).to_owned(),
            block.chars()[offset..].to_vec(),
        )
        .with_data(Default::default());

    let blocks = state
        .block_map()
        .splice(&key, &key, vec![Arc::new(above), Arc::new(below)]);
    let after = sel.collapse_to(key_below, 0);
    Ok(state.with_blocks(blocks, sel.clone(), after))
}

/// Relocates one block before or after `target_key`.
pub(crate) fn move_block_in_state(
    state: &ContentState,
    block_key: &BlockKey,
    target_key: &BlockKey,
    mode: InsertionMode,
) -> Result<ContentState, ModelError> {
    if block_key == target_key {
        return Err(ModelError::InvalidTarget(
            "cannot move a block relative to itself",
        ));
    }
    let moved = Arc::clone(block_for(state, block_key)?);
    block_for(state, target_key)?;

    let remaining = state.block_map().remove(block_key);
    let mut blocks = Vec::with_capacity(remaining.len() + 1);
    for (key, block) in remaining.iter() {
        if key == target_key && mode == InsertionMode::Before {
            blocks.push(Arc::clone(&moved));
        }
        blocks.push(Arc::clone(block));
        if key == target_key && mode == InsertionMode::After {
            blocks.push(Arc::clone(&moved));
        }
    }
    let block_map = BlockMap::from_shared(blocks);

    let before = state.selection_after().clone();
    let after = before.collapse_to(block_key.clone(), 0);
    Ok(state.with_blocks(block_map, before, after))
}

// ── Block-level transforms ─────────────────────────────────────────────────

/// Applies `transform` to every block touched by the selection.
pub(crate) fn modify_block_for_state<F>(
    state: &ContentState,
    sel: &SelectionState,
    transform: F,
) -> Result<ContentState, ModelError>
where
    F: Fn(&ContentBlock) -> ContentBlock,
{
    let start_key = sel.start_key().clone();
    let end_key = sel.end_key().clone();
    block_for(state, &start_key)?;
    block_for(state, &end_key)?;

    let mut blocks = state.block_map().clone();
    let mut inside = false;
    for (key, block) in state.block_map().iter() {
        let at_start = key == &start_key;
        let at_end = key == &end_key;
        if at_start {
            inside = true;
        }
        if inside {
            blocks = blocks.set(transform(block));
        }
        if at_end {
            break;
        }
    }
    Ok(state.with_blocks(blocks, sel.clone(), sel.clone()))
}

/// Changes list nesting depth by `adjustment`, clamped to `[0, max_depth]`.
pub(crate) fn adjust_block_depth_for_state(
    state: &ContentState,
    sel: &SelectionState,
    adjustment: i32,
    max_depth: u32,
) -> Result<ContentState, ModelError> {
    modify_block_for_state(state, sel, |block| {
        let depth = (i64::from(block.depth()) + i64::from(adjustment))
            .clamp(0, i64::from(max_depth)) as u32;
        block.clone().with_depth(depth)
    })
}

// ── Fragment extraction ────────────────────────────────────────────────────

/// Copies the selected range out as a detached fragment.
///
/// Boundary blocks are trimmed to the selection; interior blocks are shared
/// untouched. Keys are kept, so reinsertion into the same document relies on
/// the fragment re-keying performed by `replace_with_fragment`.
pub(crate) fn state_fragment(
    state: &ContentState,
    sel: &SelectionState,
) -> Result<BlockMap, ModelError> {
    let start_key = sel.start_key().clone();
    let end_key = sel.end_key().clone();
    let start_block = block_for(state, &start_key)?;
    let end_block = block_for(state, &end_key)?;
    let start_offset = sel.start_offset().min(start_block.len());
    let end_offset = sel.end_offset().min(end_block.len());

    let mut pieces: Vec<Arc<ContentBlock>> = Vec::new();
    let mut inside = false;
    for (key, block) in state.block_map().iter() {
        let at_start = key == &start_key;
        let at_end = key == &end_key;
        if at_start {
            inside = true;
        }
        if inside {
            let piece = if at_start && at_end {
                let end_offset = end_offset.max(start_offset);
                Arc::new(block.as_ref().clone().with_text(
                    block.text_slice(start_offset, end_offset).to_owned(),
                    block.chars()[start_offset..end_offset].to_vec(),
                ))
            } else if at_start {
                Arc::new(block.as_ref().clone().with_text(
                    block.text_slice(start_offset, block.len()).to_owned(),
                    block.chars()[start_offset..].to_vec(),
                ))
            } else if at_end {
                Arc::new(block.as_ref().clone().with_text(
                    block.text_slice(0, end_offset).to_owned(),
                    block.chars()[..end_offset].to_vec(),
                ))
            } else {
                Arc::clone(block)
            };
            pieces.push(piece);
        }
        if at_end {
            break;
        }
    }
    Ok(BlockMap::from_shared(pieces))
}
