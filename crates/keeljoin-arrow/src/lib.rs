//! Arrow re-exports plus value extraction and assertions for arrays that
//! come back out of a hash relation.

mod test_utils;

pub use arrow;
pub use arrow::array::ArrayRef;
pub use arrow::{array, datatypes};
pub use test_utils::*;
