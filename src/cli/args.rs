//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    boq::BoqCommands, catalog::CatalogCommands, check::CheckArgs,
    completions::CompletionsArgs, init::InitArgs, item::ItemCommands, map::MapCommands,
};

#[derive(Parser)]
#[command(name = "boq")]
#[command(author, version, about = "Bill of Quantities toolkit")]
#[command(long_about = "Manage bills of quantities as plain-text YAML files: line items, \
validation, catalog mapping, approvals and versions.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Project root (default: auto-detect by finding .boq/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new BOQ project
    Init(InitArgs),

    /// Bill of quantities management (headers, workflow, versions)
    #[command(subcommand)]
    Boq(BoqCommands),

    /// Line item management within a BOQ
    #[command(subcommand)]
    Item(ItemCommands),

    /// Catalog mapping of line items
    #[command(subcommand)]
    Map(MapCommands),

    /// Catalog item management
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Check project files against the entity schemas
    Check(CheckArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}
