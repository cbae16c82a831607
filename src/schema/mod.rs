//! Schema system - file validation and report templates

pub mod registry;
pub mod template;
pub mod validator;

pub use registry::SchemaRegistry;
pub use template::{ReportRenderer, TemplateError};
pub use validator::{CheckError, CheckOutcome, SchemaError, Validator};
