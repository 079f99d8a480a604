//! Meta instances and the append-only meta registry.
//!
//! A meta records why or how a style was applied to a character (the
//! reviewer who suggested a highlight, the rule that produced an emphasis).
//! Characters reference metas through their style-provenance map, so the
//! registry follows the same stable-key, never-delete discipline as the
//! entity registry.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::ModelError;
use crate::keys::MetaKey;

/// Free-form meta payload (wire `data` field).
pub type MetaData = serde_json::Map<String, Value>;

/// One registry entry: a type tag and arbitrary data.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaInstance {
    pub meta_type: String,
    pub data: MetaData,
}

impl MetaInstance {
    pub fn new(meta_type: impl Into<String>, data: MetaData) -> Self {
        MetaInstance {
            meta_type: meta_type.into(),
            data,
        }
    }
}

/// Append-growing keyed store of metas; same key discipline as
/// [`EntityRegistry`](crate::entity::EntityRegistry).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaRegistry {
    entries: IndexMap<MetaKey, Arc<MetaInstance>>,
}

impl MetaRegistry {
    pub fn new() -> Self {
        MetaRegistry::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: MetaKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: MetaKey) -> Result<&Arc<MetaInstance>, ModelError> {
        self.entries
            .get(&key)
            .ok_or_else(|| ModelError::unknown_meta(key))
    }

    pub fn last_key(&self) -> Option<MetaKey> {
        self.entries.last().map(|(k, _)| *k)
    }

    pub fn next_key(&self) -> MetaKey {
        self.last_key().map(MetaKey::next).unwrap_or(MetaKey::FIRST)
    }

    /// Appends `instance`, assigning `key` or the next monotonic key.
    pub fn add(&self, instance: MetaInstance, key: Option<MetaKey>) -> (MetaRegistry, MetaKey) {
        let key = key.unwrap_or_else(|| self.next_key());
        let mut entries = self.entries.clone();
        entries.insert(key, Arc::new(instance));
        (MetaRegistry { entries }, key)
    }

    /// Shallow-merges `patch` into the entry's data map.
    pub fn merge_data(&self, key: MetaKey, patch: &MetaData) -> Result<MetaRegistry, ModelError> {
        let current = self.get(key)?;
        let mut data = current.data.clone();
        for (k, v) in patch {
            data.insert(k.clone(), v.clone());
        }
        self.write_data(key, data)
    }

    /// Replaces the entry's data map wholesale.
    pub fn replace_data(&self, key: MetaKey, data: MetaData) -> Result<MetaRegistry, ModelError> {
        self.get(key)?;
        self.write_data(key, data)
    }

    fn write_data(&self, key: MetaKey, data: MetaData) -> Result<MetaRegistry, ModelError> {
        let current = self.get(key)?;
        let updated = MetaInstance {
            meta_type: current.meta_type.clone(),
            data,
        };
        let mut entries = self.entries.clone();
        entries.insert(key, Arc::new(updated));
        Ok(MetaRegistry { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetaKey, &Arc<MetaInstance>)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_grow_monotonically_from_one() {
        let reg = MetaRegistry::new();
        let (reg, k1) = reg.add(MetaInstance::new("SUGGESTION", MetaData::new()), None);
        let (reg, k2) = reg.add(MetaInstance::new("SUGGESTION", MetaData::new()), None);
        assert_eq!(k1, MetaKey::new(1));
        assert_eq!(k2, MetaKey::new(2));
        assert!(reg.get(k1).is_ok());
        assert!(reg.get(k2).is_ok());
    }

    #[test]
    fn merge_then_replace() {
        let reg = MetaRegistry::new();
        let mut data = MetaData::new();
        data.insert("author".into(), json!("ana"));
        let (reg, k) = reg.add(MetaInstance::new("SUGGESTION", data), None);

        let mut patch = MetaData::new();
        patch.insert("resolved".into(), json!(true));
        let merged = reg.merge_data(k, &patch).unwrap();
        assert_eq!(merged.get(k).unwrap().data["author"], json!("ana"));
        assert_eq!(merged.get(k).unwrap().data["resolved"], json!(true));

        let replaced = merged.replace_data(k, MetaData::new()).unwrap();
        assert!(replaced.get(k).unwrap().data.is_empty());
    }

    #[test]
    fn unknown_key_fails() {
        let reg = MetaRegistry::new();
        assert_eq!(
            reg.get(MetaKey::new(3)).unwrap_err(),
            ModelError::unknown_meta(MetaKey::new(3))
        );
    }
}
