//! Wire format support: raw JSON document structs and the decode path.
//!
//! Only decoding is provided here; serializing a document back out is the
//! concern of an external persistence layer.

pub mod decode;
pub mod raw;

pub use decode::{decode, from_json};
pub use raw::{RawBlock, RawContentState, RawEntity, RawEntityRange, RawMeta, RawStyleRange};
