//! Core module - fundamental types, rules and the BOQ service layer

pub mod config;
pub mod entity;
pub mod identity;
pub mod import;
pub mod loader;
pub mod mapping;
pub mod project;
pub mod shortid;
pub mod store;
pub mod validation;
pub mod workflow;

pub use config::Config;
pub use entity::{Entity, Status};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use import::{ImportError, ImportStats};
pub use mapping::{CatalogMatcher, MappingConfig};
pub use project::{Project, ProjectError};
pub use shortid::ShortIdIndex;
pub use store::{BoqFilter, BoqStatistics, BoqStore, BoqUpdate, NewBoq, StoreError};
pub use validation::{BoqValidator, ValidationReport, ValidationRules, ValidationStatus};
pub use workflow::{BoqWorkflow, WorkflowError};
