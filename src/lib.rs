//! BOQ Toolkit
//!
//! Bills of quantities kept as plain-text YAML files: line items with
//! derived totals, a configurable validation checklist with a score,
//! catalog mapping suggestions, an approval workflow and version chains.

pub mod cli;
pub mod core;
pub mod entities;
pub mod logging;
pub mod schema;
