//! Persistent, structurally shared document model for rich text.
//!
//! The root value is an immutable [`ContentState`]: ordered text blocks with
//! per-character style/entity/provenance metadata, keyed registries for
//! out-of-band objects, and the selections bracketing the last edit. Edits
//! go through the [`modifier`] transaction algebra, which derives a new
//! snapshot and shares every untouched block by reference. The [`codec`]
//! module turns the raw JSON wire format into this model.
//!
//! ```
//! use std::sync::Arc;
//! use richdoc::{modifier, ContentState, MetadataPool, SelectionState};
//!
//! let pool = Arc::new(MetadataPool::new());
//! let state = ContentState::create_from_text(pool, "ab\ncd");
//! let first = state.first_block().unwrap().key().clone();
//! let edited = modifier::insert_text(
//!     &state,
//!     &SelectionState::collapsed(first, 2),
//!     "X",
//!     None,
//!     None,
//! )
//! .unwrap();
//! assert_eq!(edited.plain_text(None), "abX\ncd");
//! ```

pub mod block;
pub mod codec;
pub mod entity;
pub mod error;
pub mod keys;
pub mod meta;
pub mod modifier;
pub mod pool;
pub mod selection;
pub mod state;

pub use block::{BlockData, BlockMap, ContentBlock};
pub use entity::{EntityData, EntityInstance, EntityRegistry, Mutability};
pub use error::{KeyKind, ModelError};
pub use keys::{generate_random_key, BlockKey, EntityKey, MetaKey};
pub use meta::{MetaData, MetaInstance, MetaRegistry};
pub use modifier::{InsertionMode, Op, RemovalDirection};
pub use pool::{CharacterMetadata, MetadataPool, StyleMetaMap, StyleSet};
pub use selection::SelectionState;
pub use state::ContentState;
