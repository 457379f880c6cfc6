//! keeljoin - the build/probe hash relation of an equality join over Arrow chunks.
//!
//! The build side appends key chunks (and payload chunks) to a
//! [`HashRelation`]. Every non-null key lands in an append-only hash arena
//! under the [`RowLocation`] of its row; null keys are only recorded. The
//! finished relation is read-only and can be probed from any number of
//! threads, or handed to another relation as three [`MemoryHandle`]s.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use arrow::array::{ArrayRef, Int32Array};
//! use arrow::datatypes::DataType;
//! use keeljoin::{HashRelation, HashRelationConfig, KeyType, RowLocation};
//!
//! let config = HashRelationConfig::default()
//!     .with_initial_capacity(16)
//!     .with_initial_bytes(1024);
//! let mut relation = HashRelation::new(KeyType::Single(DataType::Int32), vec![], &config)?;
//!
//! let keys: ArrayRef = Arc::new(Int32Array::from(vec![Some(7), None, Some(7)]));
//! relation.append_key_column(&keys)?;
//!
//! let mut matches = Vec::new();
//! relation.get(&7i32, &mut matches)?;
//! assert_eq!(matches, vec![RowLocation::new(0, 0), RowLocation::new(0, 2)]);
//! assert!(relation.get_null());
//! # Ok::<(), keeljoin::Error>(())
//! ```

pub use arrow;
pub use keeljoin_arena::{
    ArenaError, ArenaHeader, ArenaStats, ArenaView, Matches, RawHashArena, hash_bytes, hash_scalar,
};
pub use keeljoin_common::config::{
    DEFAULT_INITIAL_BYTES, DEFAULT_INITIAL_CAPACITY, DEFAULT_LOAD_FACTOR, DEFAULT_MAX_BYTES,
};
pub use keeljoin_common::{Error, HashRelationConfig, MemoryHandle, Result, RowLocation};
pub use keeljoin_relation::column;
pub use keeljoin_relation::{
    ByteColumn, ColumnFactory, ColumnRegistry, HashRelation, HashRelationColumn, JoinKey,
    KeyBytes, KeyDomain, KeyKind, KeyType, NumericColumn, PrimitiveColumn, RelationFactory,
    RelationRegistry, RowEncoder, StringLikeColumn, UnsafeRow, canonical_f64_bits,
    is_supported_key, make_hash_relation, make_hash_relation_column, make_hash_relation_columns,
};
