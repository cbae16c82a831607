//! `boq map` command - Catalog mapping of line items

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{open_store, resolve_format};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::boq::{Boq, MappingStatus};

#[derive(Subcommand, Debug)]
pub enum MapCommands {
    /// Suggest catalog items for unmapped and suggested lines
    Suggest(SuggestArgs),

    /// Map a line to a catalog item
    Confirm(ConfirmArgs),

    /// Mark a line as a custom item with no catalog counterpart
    Custom(LineArgs),

    /// Clear the mapping of a line
    Reset(LineArgs),
}

#[derive(clap::Args, Debug)]
pub struct SuggestArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub boq: String,
}

#[derive(clap::Args, Debug)]
pub struct ConfirmArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub boq: String,

    /// Line number (1-based) or item ID prefix
    pub item: String,

    /// Catalog item code, ID or short ID
    pub catalog: String,
}

#[derive(clap::Args, Debug)]
pub struct LineArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub boq: String,

    /// Line number (1-based) or item ID prefix
    pub item: String,
}

pub fn run(cmd: MapCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MapCommands::Suggest(args) => run_suggest(args, global),
        MapCommands::Confirm(args) => run_confirm(args, global),
        MapCommands::Custom(args) => run_custom(args, global),
        MapCommands::Reset(args) => run_reset(args, global),
    }
}

/// Ranked suggestions of every line that has any
pub(crate) fn print_suggestions(boq: &Boq) {
    for (i, item) in boq.items.iter().enumerate() {
        if item.suggestions.is_empty() {
            continue;
        }
        println!();
        println!(
            "  {} {}",
            style(format!("{}.", i + 1)).cyan(),
            item.description
        );
        for s in &item.suggestions {
            println!(
                "      {:>5.1}%  {} {}  {}",
                s.confidence,
                style(&s.catalog_code).cyan(),
                s.name,
                style(&s.reason).dim()
            );
        }
    }
}

fn run_suggest(args: SuggestArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let (boq, changed) = store
        .suggest_mappings(&args.boq)
        .map_err(|e| miette::miette!("{}", e))?;

    match resolve_format(global, &config, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&boq.items).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&boq.items).into_diagnostic()?);
        }
        _ => {
            println!(
                "{} Updated suggestions on {} line(s) of {} v{}",
                style("✓").green(),
                style(changed).cyan(),
                style(&boq.boq_number).cyan(),
                boq.version
            );
            if !global.quiet {
                print_suggestions(&boq);
                let pending = boq
                    .items
                    .iter()
                    .filter(|i| i.mapping_status == MappingStatus::Suggested)
                    .count();
                if pending > 0 {
                    println!();
                    println!(
                        "Use {} to accept a suggestion",
                        style("boq map confirm <BOQ> <LINE> <CODE>").yellow()
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_confirm(args: ConfirmArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let catalog = store
        .find_catalog_item(&args.catalog)
        .map_err(|e| miette::miette!("{}", e))?;
    let boq = store
        .confirm_mapping(&args.boq, &args.item, &catalog.id.to_string())
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Mapped line {} of {} to {} {}",
        style("✓").green(),
        style(&args.item).cyan(),
        style(&boq.boq_number).cyan(),
        style(&catalog.code).cyan(),
        catalog.name
    );
    let item = boq.find_item_index(&args.item).map(|i| &boq.items[i]);
    if let (Some(item), false) = (item, global.quiet) {
        if let Some(confidence) = item.mapping_confidence {
            println!("   Confidence: {:.1}%", confidence);
        }
        if let Some(price) = item.estimated_unit_price {
            println!("   Unit price: {:.2}", price);
        }
    }
    Ok(())
}

fn run_custom(args: LineArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let boq = store
        .mark_custom(&args.boq, &args.item)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Marked line {} of {} as custom",
        style("✓").green(),
        style(&args.item).cyan(),
        style(&boq.boq_number).cyan()
    );
    Ok(())
}

fn run_reset(args: LineArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let boq = store
        .reset_mapping(&args.boq, &args.item)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Cleared mapping of line {} in {}",
        style("✓").green(),
        style(&args.item).cyan(),
        style(&boq.boq_number).cyan()
    );
    Ok(())
}
