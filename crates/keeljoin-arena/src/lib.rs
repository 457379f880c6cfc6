//! Append-only hash arena backing keeljoin hash relations.
//!
//! [`RawHashArena`] owns a slot array and an overflow region of chained
//! entries. [`ArenaView`] reads either an owned arena or one reattached from
//! exported [`MemoryHandle`](keeljoin_common::MemoryHandle)s.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

mod arena;
mod error;
mod hash;
pub mod layout;
mod view;

pub use arena::{A64, RawHashArena};
pub use error::ArenaError;
pub use hash::{hash_bytes, hash_scalar};
pub use layout::{ArenaHeader, SLOT_WIDTH, UNTAGGED};
pub use view::{ArenaStats, ArenaView, Matches};
