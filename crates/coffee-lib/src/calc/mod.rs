//! # Calculations
//!
//! Constant-property batches and the formula references that tie them together.
//!
//! - [`formula`] - `[NAME]` reference extraction
//! - [`batch`] - Batch file loading, validation, ordering, and partitioning

pub mod batch;
pub mod formula;

pub use batch::{
    BatchError, BatchFormat, ConstantPropertyRow, external_references, load_batch,
    partition_calculation_tree, sort_rows, to_entities,
};
pub use formula::formula_references;
