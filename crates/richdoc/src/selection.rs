//! Selection ranges over the block map.
//!
//! Offsets index a block's `chars` list (codepoints), never raw string
//! units. A selection whose anchor and focus coincide is collapsed.

use crate::keys::BlockKey;

/// An anchor/focus range over the document.
///
/// `is_backward` marks a focus that precedes the anchor in reading order;
/// the `start_*`/`end_*` accessors fold it away for range arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub anchor_key: BlockKey,
    pub anchor_offset: usize,
    pub focus_key: BlockKey,
    pub focus_offset: usize,
    pub is_backward: bool,
    pub has_focus: bool,
}

impl Default for SelectionState {
    fn default() -> Self {
        SelectionState::create_empty(BlockKey::default())
    }
}

impl SelectionState {
    /// A collapsed selection at offset 0 of `key`, without focus.
    pub fn create_empty(key: BlockKey) -> Self {
        SelectionState {
            anchor_key: key.clone(),
            anchor_offset: 0,
            focus_key: key,
            focus_offset: 0,
            is_backward: false,
            has_focus: false,
        }
    }

    /// A collapsed selection at `(key, offset)`, without focus.
    pub fn collapsed(key: BlockKey, offset: usize) -> Self {
        SelectionState {
            anchor_key: key.clone(),
            anchor_offset: offset,
            focus_key: key,
            focus_offset: offset,
            is_backward: false,
            has_focus: false,
        }
    }

    /// A forward range from `(anchor_key, anchor_offset)` to
    /// `(focus_key, focus_offset)`.
    pub fn range(
        anchor_key: BlockKey,
        anchor_offset: usize,
        focus_key: BlockKey,
        focus_offset: usize,
    ) -> Self {
        SelectionState {
            anchor_key,
            anchor_offset,
            focus_key,
            focus_offset,
            is_backward: false,
            has_focus: false,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }

    pub fn start_key(&self) -> &BlockKey {
        if self.is_backward {
            &self.focus_key
        } else {
            &self.anchor_key
        }
    }

    pub fn start_offset(&self) -> usize {
        if self.is_backward {
            self.focus_offset
        } else {
            self.anchor_offset
        }
    }

    pub fn end_key(&self) -> &BlockKey {
        if self.is_backward {
            &self.anchor_key
        } else {
            &self.focus_key
        }
    }

    pub fn end_offset(&self) -> usize {
        if self.is_backward {
            self.anchor_offset
        } else {
            self.focus_offset
        }
    }

    /// True when the whole selection lies within one block.
    pub fn is_within_block(&self) -> bool {
        self.anchor_key == self.focus_key
    }

    /// Derives a collapsed copy at `(key, offset)`, keeping `has_focus`.
    pub fn collapse_to(&self, key: BlockKey, offset: usize) -> Self {
        SelectionState {
            anchor_key: key.clone(),
            anchor_offset: offset,
            focus_key: key,
            focus_offset: offset,
            is_backward: false,
            has_focus: self.has_focus,
        }
    }

    /// Derives a forward copy spanning `(start, end)` offsets within the
    /// selection's own block layout.
    pub fn with_offsets(&self, anchor_offset: usize, focus_offset: usize) -> Self {
        SelectionState {
            anchor_key: self.anchor_key.clone(),
            anchor_offset,
            focus_key: self.focus_key.clone(),
            focus_offset,
            is_backward: false,
            has_focus: self.has_focus,
        }
    }

    pub fn with_has_focus(mut self, has_focus: bool) -> Self {
        self.has_focus = has_focus;
        self
    }

    pub fn with_backward(mut self, is_backward: bool) -> Self {
        self.is_backward = is_backward;
        self
    }
}
