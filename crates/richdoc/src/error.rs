//! Error taxonomy shared across the model.
//!
//! Both variants signal caller bugs (invariant violations), not recoverable
//! runtime conditions: decode never raises them, and malformed wire input is
//! repaired with defaults instead.

use std::fmt;

use crate::keys::{BlockKey, EntityKey, MetaKey};

/// Which keyed collection a missing key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Block,
    Entity,
    Meta,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Block => f.write_str("block"),
            KeyKind::Entity => f.write_str("entity"),
            KeyKind::Meta => f.write_str("meta"),
        }
    }
}

/// Invariant violations raised by the transaction algebra.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The target selection does not satisfy the operation's precondition.
    #[error("invalid target selection: {0}")]
    InvalidTarget(&'static str),

    /// A block, entity, or meta key was looked up but does not exist.
    #[error("unknown {kind} key `{key}`")]
    UnknownKey { kind: KeyKind, key: String },
}

impl ModelError {
    pub fn unknown_block(key: &BlockKey) -> Self {
        ModelError::UnknownKey {
            kind: KeyKind::Block,
            key: key.to_string(),
        }
    }

    pub fn unknown_entity(key: EntityKey) -> Self {
        ModelError::UnknownKey {
            kind: KeyKind::Entity,
            key: key.to_string(),
        }
    }

    pub fn unknown_meta(key: MetaKey) -> Self {
        ModelError::UnknownKey {
            kind: KeyKind::Meta,
            key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_message_names_the_kind() {
        let err = ModelError::unknown_entity(EntityKey::new(7));
        assert_eq!(err.to_string(), "unknown entity key `7`");
        let err = ModelError::unknown_block(&BlockKey::from("b1"));
        assert_eq!(err.to_string(), "unknown block key `b1`");
    }
}
