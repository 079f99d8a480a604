//! Typed keys for blocks, entities, and metas, plus block key generation.
//!
//! Block keys are short random base-32 strings so fragments pasted between
//! documents rarely collide. Entity and meta keys are monotonically assigned
//! integers: registries hand out `last + 1`, starting at `1`.

use std::fmt;

use rand::Rng;

// ── BlockKey ───────────────────────────────────────────────────────────────

/// Opaque unique identifier of a [`ContentBlock`](crate::block::ContentBlock).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockKey(String);

impl BlockKey {
    pub fn new(key: impl Into<String>) -> Self {
        BlockKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty key marks a fragment block that still needs a generated one.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKey {
    fn from(key: &str) -> Self {
        BlockKey(key.to_owned())
    }
}

impl From<String> for BlockKey {
    fn from(key: String) -> Self {
        BlockKey(key)
    }
}

const KEY_LEN: usize = 5;
const KEY_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuv";

/// Generates a random block key.
///
/// Keys that are all digits are rejected and redrawn so a key never parses as
/// a number (numeric-looking keys confuse downstream JSON consumers that
/// coerce object keys).
pub fn generate_random_key() -> BlockKey {
    let mut rng = rand::thread_rng();
    loop {
        let key: String = (0..KEY_LEN)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect();
        if !key.bytes().all(|b| b.is_ascii_digit()) {
            return BlockKey(key);
        }
    }
}

// ── EntityKey / MetaKey ────────────────────────────────────────────────────

/// Key of an entry in the [`EntityRegistry`](crate::entity::EntityRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey(u64);

/// Key of an entry in the [`MetaRegistry`](crate::meta::MetaRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetaKey(u64);

macro_rules! numeric_key {
    ($name:ident) => {
        impl $name {
            /// The first key a registry assigns.
            pub const FIRST: $name = $name(1);

            pub fn new(raw: u64) -> Self {
                $name(raw)
            }

            pub fn get(self) -> u64 {
                self.0
            }

            /// The key a registry assigns after this one.
            pub fn next(self) -> Self {
                $name(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_key!(EntityKey);
numeric_key!(MetaKey);
