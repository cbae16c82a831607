//! Entity type definitions
//!
//! - [`Boq`] - Bills of quantities with line items, totals, validation and versions
//! - [`CatalogItem`] - Canonical items that BOQ lines are mapped to

pub mod boq;
pub mod catalog;

pub use boq::{Boq, BoqItem, BoqTotals, ItemPatch, MappingStatus, MappingSuggestion};
pub use catalog::CatalogItem;
