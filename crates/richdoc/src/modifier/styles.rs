//! Inline style application over selections.
//!
//! Adding a style may record style provenance (a meta key) on every touched
//! character; removing a style drops the provenance entry with it. Entity
//! references are never affected either way.

use std::sync::Arc;

use crate::error::ModelError;
use crate::keys::MetaKey;
use crate::selection::SelectionState;
use crate::state::ContentState;

#[derive(Clone, Copy)]
pub(crate) enum StyleEdit<'a> {
    Apply {
        style: &'a str,
        meta: Option<MetaKey>,
    },
    Remove {
        style: &'a str,
    },
}

/// Applies or removes one style over every character in the selection.
pub(crate) fn modify_inline_style(
    state: &ContentState,
    sel: &SelectionState,
    edit: StyleEdit<'_>,
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
            let mut chars = block.chars().to_vec();
            for slot in &mut chars[slice_start..slice_end.max(slice_start)] {
                *slot = match edit {
                    StyleEdit::Apply { style, meta } => pool.apply_style(slot, style, meta),
                    StyleEdit::Remove { style } => pool.remove_style(slot, style),
                };
            }
            blocks = blocks.set(block.as_ref().clone().with_chars(chars));
        }
        if at_end {
            break;
        }
    }
    Ok(state.with_blocks(blocks, sel.clone(), sel.clone()))
}
