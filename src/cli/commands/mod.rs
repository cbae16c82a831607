//! CLI command implementations

pub mod boq;
pub mod catalog;
pub mod check;
pub mod completions;
pub mod init;
pub mod item;
pub mod map;
