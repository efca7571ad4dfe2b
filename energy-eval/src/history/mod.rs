//! History Module — optimization history and the three-way comparison
//!
//! ```text
//! index 0        original, unoptimized baseline (never overwritten)
//! index 1..N     optimization attempts that reached measurement
//! ```
//!
//! The comparison reduces the history to the views an evaluator needs:
//! the original, the lowest-energy record so far, and the latest record.

pub mod comparison;
pub mod store;

pub use comparison::{Comparison, IndexedRecord};
pub use store::History;
