//! Entity instances and the append-only entity registry.
//!
//! Entities are shared out-of-band objects (a link target, a mention)
//! referenced by zero or more characters. Because many characters may point
//! at one entry, entries are updated in place at a stable key and never
//! deleted; referential integrity over the whole document lifetime depends
//! on that.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;
use crate::keys::EntityKey;

/// Free-form entity payload (wire `data` field).
pub type EntityData = serde_json::Map<String, Value>;

/// How an entity run reacts to edits of its text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mutability {
    /// Text may be edited freely; the reference just shrinks or grows.
    #[default]
    Mutable,
    /// The run is atomic; partial deletion removes the whole run.
    Immutable,
    /// Deleting any part of a space-delimited segment removes that segment.
    Segmented,
}

impl Mutability {
    /// Parses a wire tag, defaulting to `Mutable` for unknown values so a
    /// malformed field never fails decode.
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "IMMUTABLE" => Mutability::Immutable,
            "SEGMENTED" => Mutability::Segmented,
            _ => Mutability::Mutable,
        }
    }
}

// ── EntityInstance ─────────────────────────────────────────────────────────

/// One registry entry: a type tag, its mutability, and arbitrary data.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    pub entity_type: String,
    pub mutability: Mutability,
    pub data: EntityData,
}

impl EntityInstance {
    pub fn new(entity_type: impl Into<String>, mutability: Mutability, data: EntityData) -> Self {
        EntityInstance {
            entity_type: entity_type.into(),
            mutability,
            data,
        }
    }
}

// ── EntityRegistry ─────────────────────────────────────────────────────────

/// Append-growing keyed store of entities.
///
/// Keys are assigned monotonically (`last + 1`, first `1`) unless the caller
/// provides one. Updates derive a new registry sharing untouched entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRegistry {
    entries: IndexMap<EntityKey, Arc<EntityInstance>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        EntityRegistry::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: EntityKey) -> Result<&Arc<EntityInstance>, ModelError> {
        self.entries
            .get(&key)
            .ok_or_else(|| ModelError::unknown_entity(key))
    }

    /// The most recently assigned key.
    pub fn last_key(&self) -> Option<EntityKey> {
        self.entries.last().map(|(k, _)| *k)
    }

    /// The key the next keyless [`add`](Self::add) will assign.
    pub fn next_key(&self) -> EntityKey {
        self.last_key().map(EntityKey::next).unwrap_or(EntityKey::FIRST)
    }

    /// Appends `instance`, assigning `key` or the next monotonic key.
    ///
    /// Re-adding at an existing key replaces that entry's record in place;
    /// no entry is ever removed.
    pub fn add(&self, instance: EntityInstance, key: Option<EntityKey>) -> (EntityRegistry, EntityKey) {
        let key = key.unwrap_or_else(|| self.next_key());
        let mut entries = self.entries.clone();
        entries.insert(key, Arc::new(instance));
        (EntityRegistry { entries }, key)
    }

    /// Shallow-merges `patch` into the entry's data map.
    pub fn merge_data(&self, key: EntityKey, patch: &EntityData) -> Result<EntityRegistry, ModelError> {
        let current = self.get(key)?;
        let mut data = current.data.clone();
        for (k, v) in patch {
            data.insert(k.clone(), v.clone());
        }
        self.write_data(key, data)
    }

    /// Replaces the entry's data map wholesale.
    pub fn replace_data(&self, key: EntityKey, data: EntityData) -> Result<EntityRegistry, ModelError> {
        self.get(key)?;
        self.write_data(key, data)
    }

    fn write_data(&self, key: EntityKey, data: EntityData) -> Result<EntityRegistry, ModelError> {
        let current = self.get(key)?;
        let updated = EntityInstance {
            entity_type: current.entity_type.clone(),
            mutability: current.mutability,
            data,
        };
        let mut entries = self.entries.clone();
        entries.insert(key, Arc::new(updated));
        Ok(EntityRegistry { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Arc<EntityInstance>)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}
