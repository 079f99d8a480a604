//! Transaction descriptors for the operation log.
//!
//! When a document has operation tracking enabled, every public transaction
//! appends one [`Op`] before applying its edit. A variant carries the full
//! typed argument list of its transaction (including keys that were
//! defaulted at call time), enough to replay the logical edit without the
//! resulting snapshot. Reconciling logs from concurrent writers happens in a
//! layer above; only the shape is a contract here.

use std::fmt;
use std::sync::Arc;

use crate::block::{BlockData, BlockMap};
use crate::entity::{EntityData, EntityInstance, Mutability};
use crate::keys::{BlockKey, EntityKey, MetaKey};
use crate::meta::{MetaData, MetaInstance};
use crate::pool::StyleSet;
use crate::selection::SelectionState;

/// Which way a deletion was initiated; decides the segment boundary used
/// when trimming a SEGMENTED entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalDirection {
    Backward,
    Forward,
}

/// Where a moved block lands relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionMode {
    Before,
    After,
}

/// One logged transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    ReplaceText {
        target: SelectionState,
        text: String,
        style: StyleSet,
        entity: Option<EntityKey>,
    },
    RemoveRange {
        range: SelectionState,
        direction: RemovalDirection,
    },
    ReplaceWithFragment {
        target: SelectionState,
        fragment: BlockMap,
    },
    SplitBlock {
        target: SelectionState,
        key_below: BlockKey,
    },
    MoveBlock {
        block: BlockKey,
        target: BlockKey,
        mode: InsertionMode,
    },
    ApplyInlineStyle {
        range: SelectionState,
        style: String,
        meta: Option<MetaKey>,
    },
    RemoveInlineStyle {
        range: SelectionState,
        style: String,
    },
    SetBlockType {
        range: SelectionState,
        block_type: String,
    },
    SetBlockData {
        range: SelectionState,
        data: BlockData,
    },
    MergeBlockData {
        range: SelectionState,
        data: BlockData,
    },
    AdjustBlockDepth {
        range: SelectionState,
        adjustment: i32,
        max_depth: u32,
    },
    ApplyEntity {
        range: SelectionState,
        entity: Option<EntityKey>,
    },
    CreateEntity {
        entity_type: String,
        mutability: Mutability,
        data: EntityData,
        key: EntityKey,
    },
    AddEntity {
        instance: Arc<EntityInstance>,
        key: EntityKey,
    },
    MergeEntityData {
        key: EntityKey,
        data: EntityData,
    },
    ReplaceEntityData {
        key: EntityKey,
        data: EntityData,
    },
    CreateMeta {
        meta_type: String,
        data: MetaData,
        key: MetaKey,
    },
    AddMeta {
        instance: Arc<MetaInstance>,
        key: MetaKey,
    },
    MergeMetaData {
        key: MetaKey,
        data: MetaData,
    },
    ReplaceMetaData {
        key: MetaKey,
        data: MetaData,
    },
}

impl Op {
    /// Stable mnemonic name of the transaction kind.
    pub fn name(&self) -> &'static str {
        match self {
            Op::ReplaceText { .. } => "replace_text",
            Op::RemoveRange { .. } => "remove_range",
            Op::ReplaceWithFragment { .. } => "replace_with_fragment",
            Op::SplitBlock { .. } => "split_block",
            Op::MoveBlock { .. } => "move_block",
            Op::ApplyInlineStyle { .. } => "apply_inline_style",
            Op::RemoveInlineStyle { .. } => "remove_inline_style",
            Op::SetBlockType { .. } => "set_block_type",
            Op::SetBlockData { .. } => "set_block_data",
            Op::MergeBlockData { .. } => "merge_block_data",
            Op::AdjustBlockDepth { .. } => "adjust_block_depth",
            Op::ApplyEntity { .. } => "apply_entity",
            Op::CreateEntity { .. } => "create_entity",
            Op::AddEntity { .. } => "add_entity",
            Op::MergeEntityData { .. } => "merge_entity_data",
            Op::ReplaceEntityData { .. } => "replace_entity_data",
            Op::CreateMeta { .. } => "create_meta",
            Op::AddMeta { .. } => "add_meta",
            Op::MergeMetaData { .. } => "merge_meta_data",
            Op::ReplaceMetaData { .. } => "replace_meta_data",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::ReplaceText { target, text, .. } => write!(
                f,
                "{} @{}:{} {:?}",
                self.name(),
                target.start_key(),
                target.start_offset(),
                text
            ),
            Op::RemoveRange { range, direction } => write!(
                f,
                "{} {}:{}..{}:{} ({:?})",
                self.name(),
                range.start_key(),
                range.start_offset(),
                range.end_key(),
                range.end_offset(),
                direction
            ),
            Op::SplitBlock { target, key_below } => write!(
                f,
                "{} @{}:{} -> {}",
                self.name(),
                target.start_key(),
                target.start_offset(),
                key_below
            ),
            Op::MoveBlock { block, target, mode } => {
                write!(f, "{} {} {:?} {}", self.name(), block, mode, target)
            }
            Op::CreateEntity { entity_type, key, .. } => {
                write!(f, "{} {} = {}", self.name(), key, entity_type)
            }
            Op::CreateMeta { meta_type, key, .. } => {
                write!(f, "{} {} = {}", self.name(), key, meta_type)
            }
            _ => f.write_str(self.name()),
        }
    }
}
