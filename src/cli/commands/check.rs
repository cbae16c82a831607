//! `boq check` command - Check project files against the entity schemas

use console::style;
use miette::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::helpers::open_project;
use crate::cli::GlobalOpts;
use crate::core::identity::EntityPrefix;
use crate::core::loader;
use crate::core::project::{Project, ENTITY_SUFFIX};
use crate::entities::boq::Boq;
use crate::schema::registry::SchemaRegistry;
use crate::schema::validator::{CheckError, CheckOutcome, Validator};

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Files or directories to check (default: entire project)
    #[arg()]
    pub paths: Vec<PathBuf>,

    /// Strict mode - warnings become errors
    #[arg(long)]
    pub strict: bool,

    /// Only check one entity type (boq, cat)
    #[arg(long, short = 't')]
    pub entity_type: Option<String>,

    /// Continue after the first failing file
    #[arg(long)]
    pub keep_going: bool,

    /// Show summary only, don't show individual errors
    #[arg(long)]
    pub summary: bool,

    /// Rewrite stale totals and line amounts in place
    #[arg(long)]
    pub fix: bool,
}

#[derive(Default)]
struct CheckStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
    total_warnings: usize,
    files_fixed: usize,
}

pub fn run(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let registry = SchemaRegistry;
    let validator = Validator::new(&registry);

    let entity_filter: Option<EntityPrefix> = match args.entity_type {
        Some(ref t) => Some(
            t.to_uppercase()
                .parse()
                .map_err(|_| miette::miette!("Unknown entity type '{}'. Use boq or cat", t))?,
        ),
        None => None,
    };

    let files = if args.paths.is_empty() {
        project_files(&project)
    } else {
        expand_paths(&args.paths)
    };

    let mut stats = CheckStats::default();
    let mut had_error = false;

    if !global.quiet {
        println!("{} Checking {} file(s)...\n", style("→").blue(), files.len());
    }

    for path in &files {
        let prefix = path
            .file_name()
            .and_then(|n| EntityPrefix::from_filename(&n.to_string_lossy()))
            .or_else(|| EntityPrefix::from_path(path));

        if let Some(filter) = entity_filter {
            if prefix != Some(filter) {
                continue;
            }
        }

        stats.files_checked += 1;

        match validator.check_file(path) {
            Ok(CheckOutcome::Valid(prefix)) => {
                let issues = match prefix {
                    EntityPrefix::Boq => check_derived_values(path, args.fix, &mut stats)?,
                    EntityPrefix::Cat => Vec::new(),
                };

                if issues.is_empty() {
                    stats.files_passed += 1;
                    if !args.summary {
                        println!("{} {}", style("✓").green(), path.display());
                    }
                    continue;
                }

                stats.total_warnings += issues.len();
                if !args.summary {
                    println!(
                        "{} {} - {} calculation warning(s)",
                        style("!").yellow(),
                        path.display(),
                        issues.len()
                    );
                    for issue in &issues {
                        println!("    {}", style(issue).yellow());
                    }
                }
                if args.strict {
                    stats.files_failed += 1;
                    had_error = true;
                } else {
                    stats.files_passed += 1;
                }
            }
            Ok(CheckOutcome::Skipped) => {
                stats.files_checked -= 1;
                if !args.summary {
                    println!(
                        "{} {} - unknown entity type (skipped)",
                        style("?").yellow(),
                        path.display()
                    );
                }
            }
            Err(CheckError::Schema(e)) => {
                stats.files_failed += 1;
                stats.total_errors += e.violation_count();
                had_error = true;

                if !args.summary {
                    println!(
                        "{} {} - {} error(s)",
                        style("✗").red(),
                        path.display(),
                        e.violation_count()
                    );
                    let report = miette::Report::new(e);
                    println!("{:?}", report);
                }

                if !args.keep_going {
                    break;
                }
            }
            Err(e) => {
                stats.files_failed += 1;
                stats.total_errors += 1;
                had_error = true;
                if !args.summary {
                    println!("{} {} - {}", style("✗").red(), path.display(), e);
                }
                if !args.keep_going {
                    break;
                }
            }
        }
    }

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Check Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Total errors:   {}", style(stats.total_errors).red());
    if stats.total_warnings > 0 {
        println!("  Total warnings: {}", style(stats.total_warnings).yellow());
    }
    if stats.files_fixed > 0 {
        println!("  Files fixed:    {}", style(stats.files_fixed).cyan());
    }
    println!();

    if had_error {
        if stats.files_failed == 1 {
            Err(miette::miette!("Check failed: 1 file has errors"))
        } else {
            Err(miette::miette!(
                "Check failed: {} files have errors",
                stats.files_failed
            ))
        }
    } else {
        println!("{} All files passed!", style("✓").green().bold());
        Ok(())
    }
}

/// Compare stored totals and line amounts with the values derived from the items
fn check_derived_values(path: &Path, fix: bool, stats: &mut CheckStats) -> Result<Vec<String>> {
    let Ok(boq) = loader::load_file::<Boq>(path) else {
        // already reported by the schema pass
        return Ok(Vec::new());
    };

    let mut expected = boq.clone();
    expected.recalculate_totals();

    let mut issues = Vec::new();
    for (i, (stored, derived)) in boq.items.iter().zip(&expected.items).enumerate() {
        if (stored.estimated_amount - derived.estimated_amount).abs() > 0.005 {
            issues.push(format!(
                "line {}: estimated_amount is {:.2} but quantity × price is {:.2}",
                i + 1,
                stored.estimated_amount,
                derived.estimated_amount
            ));
        }
    }
    if boq.totals.total_items != expected.totals.total_items {
        issues.push(format!(
            "totals.total_items is {} but the BOQ has {} line(s)",
            boq.totals.total_items, expected.totals.total_items
        ));
    }
    if (boq.totals.total_quantity - expected.totals.total_quantity).abs() > 0.0005 {
        issues.push(format!(
            "totals.total_quantity is {} but the lines sum to {}",
            boq.totals.total_quantity, expected.totals.total_quantity
        ));
    }
    if (boq.totals.estimated_total_value - expected.totals.estimated_total_value).abs() > 0.005 {
        issues.push(format!(
            "totals.estimated_total_value is {:.2} but the lines sum to {:.2}",
            boq.totals.estimated_total_value, expected.totals.estimated_total_value
        ));
    }

    if fix && !issues.is_empty() {
        loader::write_file(path, &expected).map_err(|e| miette::miette!("{}", e))?;
        tracing::info!(path = %path.display(), "rewrote derived values");
        stats.files_fixed += 1;
        issues.clear();
    }

    Ok(issues)
}

/// Every entity file under the project's entity directories
fn project_files(project: &Project) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = EntityPrefix::all()
        .iter()
        .flat_map(|p| project.iter_entity_files(*p))
        .collect();
    files.sort();
    files
}

/// Expand directories into the entity files they contain
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if entry.path().to_string_lossy().ends_with(ENTITY_SUFFIX) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        } else {
            tracing::warn!(path = %path.display(), "path does not exist");
        }
    }

    files.sort();
    files
}
