//! Per-character metadata and its interning pool.
//!
//! Documents use only a small number of distinct style/entity/provenance
//! combinations, so structurally equal [`CharacterMetadata`] values are
//! interned: the pool hands out one shared `Arc` per combination and never
//! evicts. Growth is bounded by the number of distinct combinations in use,
//! not by document length.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::keys::{EntityKey, MetaKey};

/// The set of style tags applied to one character.
pub type StyleSet = BTreeSet<String>;

/// Style tag to provenance record, for the styles on one character that
/// carry a provenance entry.
pub type StyleMetaMap = BTreeMap<String, MetaKey>;

// ── CharacterMetadata ──────────────────────────────────────────────────────

/// Immutable metadata attached to a single character.
///
/// Values are canonical: obtain them through [`MetadataPool::create`] (or the
/// derived `apply_*`/`remove_*` helpers) so equal combinations share one
/// instance. The struct itself is the interning key, which is why it derives
/// `Eq + Hash` over all three components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CharacterMetadata {
    /// Style tags applied to the character.
    pub style: StyleSet,
    /// Entity reference, if the character belongs to an entity run.
    pub entity: Option<EntityKey>,
    /// Why/how each style was applied, keyed by style tag.
    pub meta: StyleMetaMap,
}

impl CharacterMetadata {
    pub fn has_style(&self, style: &str) -> bool {
        self.style.contains(style)
    }

    /// Provenance record for `style`, when one was captured.
    pub fn style_meta(&self, style: &str) -> Option<MetaKey> {
        self.meta.get(style).copied()
    }
}

// ── MetadataPool ───────────────────────────────────────────────────────────

/// Interning pool for [`CharacterMetadata`].
///
/// An explicit capability object rather than a process-level singleton: each
/// document (or test) owns its pool via `Arc<MetadataPool>`, carried by the
/// `ContentState` it serves. Append-only and read-mostly; inserts serialize
/// on the write lock, reads share the read lock.
#[derive(Debug)]
pub struct MetadataPool {
    interned: RwLock<HashMap<CharacterMetadata, Arc<CharacterMetadata>>>,
}

impl Default for MetadataPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataPool {
    /// Creates a pool with the default (no style, no entity, no provenance)
    /// value pre-interned.
    pub fn new() -> Self {
        let empty = CharacterMetadata::default();
        let mut interned = HashMap::new();
        interned.insert(empty.clone(), Arc::new(empty));
        MetadataPool {
            interned: RwLock::new(interned),
        }
    }

    /// The pooled default value.
    pub fn empty(&self) -> Arc<CharacterMetadata> {
        self.create(CharacterMetadata::default())
    }

    /// Interns `value`, returning the canonical shared instance.
    ///
    /// Calling this twice with structurally equal values returns the same
    /// `Arc`. Unspecified fields are covered by `CharacterMetadata`'s
    /// `Default` together with struct-update syntax at call sites.
    pub fn create(&self, value: CharacterMetadata) -> Arc<CharacterMetadata> {
        if let Some(existing) = self.read().get(&value) {
            return Arc::clone(existing);
        }
        let mut interned = self.write();
        // Re-check: another writer may have won the race for this value.
        if let Some(existing) = interned.get(&value) {
            return Arc::clone(existing);
        }
        let canonical = Arc::new(value.clone());
        interned.insert(value, Arc::clone(&canonical));
        canonical
    }

    /// Derives `base` with `style` added, recording provenance when
    /// `meta_key` is given.
    pub fn apply_style(
        &self,
        base: &CharacterMetadata,
        style: &str,
        meta_key: Option<MetaKey>,
    ) -> Arc<CharacterMetadata> {
        let mut next = base.clone();
        next.style.insert(style.to_owned());
        if let Some(key) = meta_key {
            next.meta.insert(style.to_owned(), key);
        }
        self.create(next)
    }

    /// Derives `base` with `style` removed, dropping its provenance entry.
    pub fn remove_style(&self, base: &CharacterMetadata, style: &str) -> Arc<CharacterMetadata> {
        let mut next = base.clone();
        next.style.remove(style);
        next.meta.remove(style);
        self.create(next)
    }

    /// Derives `base` with the entity reference replaced (or cleared).
    ///
    /// Styles and provenance are left untouched.
    pub fn apply_entity(
        &self,
        base: &CharacterMetadata,
        entity: Option<EntityKey>,
    ) -> Arc<CharacterMetadata> {
        let mut next = base.clone();
        next.entity = entity;
        self.create(next)
    }

    /// Number of distinct combinations interned so far.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<CharacterMetadata, Arc<CharacterMetadata>>> {
        match self.interned.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CharacterMetadata, Arc<CharacterMetadata>>> {
        match self.interned.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
