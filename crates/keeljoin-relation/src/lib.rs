//! Hash relation backing equality joins over Arrow chunks.
//!
//! A [`HashRelation`] is filled on the build side of a join with key chunks
//! and payload chunks, then probed by key from any number of threads. Keys
//! are numeric, string-like, or composite rows encoded with [`RowEncoder`].

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod column;
mod key;
mod registry;
mod relation;
mod row;

pub use column::{ByteColumn, HashRelationColumn, NumericColumn, PrimitiveColumn, StringLikeColumn};
pub use key::{JoinKey, KeyBytes, KeyDomain, KeyKind, KeyType, canonical_f64_bits};
pub use registry::{
    ColumnFactory, ColumnRegistry, RelationFactory, RelationRegistry, is_supported_key,
    make_hash_relation, make_hash_relation_column, make_hash_relation_columns,
};
pub use relation::HashRelation;
pub use row::{RowEncoder, UnsafeRow};
