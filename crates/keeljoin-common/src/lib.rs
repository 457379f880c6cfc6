//! Common types, errors and configuration shared by the keeljoin crates.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod error;
pub mod location;

pub use config::HashRelationConfig;
pub use error::{Error, Result};
pub use location::{MemoryHandle, RowLocation};
