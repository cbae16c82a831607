//! Shared helper functions for CLI commands

use clap::ValueEnum;
use console::style;
use miette::Result;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityId;
use crate::core::project::Project;
use crate::core::store::BoqStore;
use crate::core::validation::{Severity, ValidationReport, ValidationStatus};
use crate::core::Config;

/// Find the project, honouring `--project`
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    let project = match global.project {
        Some(ref root) => Project::discover_from(root),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

/// Project, layered config and a store built from both
pub fn open_store(global: &GlobalOpts) -> Result<(BoqStore, Config)> {
    let project = open_project(global)?;
    let config = Config::load_with(Some(&project));
    let store = BoqStore::new(project, &config);
    Ok((store, config))
}

/// Resolve `auto` through the configured default, then the command's fallback
pub fn resolve_format(global: &GlobalOpts, config: &Config, fallback: OutputFormat) -> OutputFormat {
    if global.format != OutputFormat::Auto {
        return global.format;
    }
    config
        .default_format
        .as_deref()
        .and_then(|f| OutputFormat::from_str(f, true).ok())
        .filter(|f| *f != OutputFormat::Auto)
        .unwrap_or(fallback)
}

/// Format an EntityId for display, truncating if too long
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output (RFC 4180)
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Print a validation report with one line per issue
pub fn print_report(report: &ValidationReport) {
    let status = report.status.to_string();
    let styled = match report.status {
        ValidationStatus::Passed => style(status).green().bold(),
        ValidationStatus::Warnings => style(status).yellow().bold(),
        ValidationStatus::Failed => style(status).red().bold(),
    };
    println!(
        "{}: {}  {}: {:.1}  ({} error(s), {} warning(s))",
        style("Status").bold(),
        styled,
        style("Score").bold(),
        report.score,
        report.error_count,
        report.warning_count
    );

    for issue in &report.issues {
        let marker = match issue.severity {
            Severity::Error => style("✗").red(),
            Severity::Warning => style("!").yellow(),
        };
        let location = issue
            .line
            .map(|l| format!("line {}: ", l))
            .unwrap_or_default();
        println!(
            "  {} {}{} {}",
            marker,
            location,
            issue.message,
            style(format!("({})", issue.code)).dim()
        );
    }
}
