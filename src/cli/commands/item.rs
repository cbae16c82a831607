//! `boq item` command - Line items of a bill of quantities

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{open_store, resolve_format};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::boq::{Boq, BoqItem, ItemPatch};
use crate::schema::template::{format_money, format_quantity};

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Append a line item
    Add(AddArgs),

    /// Change fields of a line item
    Update(UpdateArgs),

    /// Remove a line item
    Remove(RemoveArgs),

    /// List the line items of a BOQ
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub boq: String,

    /// Item description
    #[arg(long, short = 'd')]
    pub description: String,

    /// Quantity
    #[arg(long, visible_alias = "qty", allow_negative_numbers = true)]
    pub quantity: f64,

    /// Unit of measure
    #[arg(long, short = 'u', default_value = "nos")]
    pub unit: String,

    /// Estimated unit price
    #[arg(long, short = 'r', visible_alias = "price", allow_negative_numbers = true)]
    pub rate: Option<f64>,

    /// Item number as printed on the customer's sheet (e.g. 1.0)
    #[arg(long)]
    pub item_no: Option<String>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Technical specification text
    #[arg(long)]
    pub spec: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub boq: String,

    /// Line number (1-based) or item ID prefix
    pub item: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, visible_alias = "qty", allow_negative_numbers = true)]
    pub quantity: Option<f64>,

    #[arg(long, short = 'u')]
    pub unit: Option<String>,

    #[arg(long, short = 'r', visible_alias = "price", allow_negative_numbers = true)]
    pub rate: Option<f64>,

    #[arg(long)]
    pub item_no: Option<String>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long)]
    pub spec: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub boq: String,

    /// Line number (1-based) or item ID prefix
    pub item: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub boq: String,
}

pub fn run(cmd: ItemCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ItemCommands::Add(args) => run_add(args, global),
        ItemCommands::Update(args) => run_update(args, global),
        ItemCommands::Remove(args) => run_remove(args, global),
        ItemCommands::List(args) => run_list(args, global),
    }
}

pub(crate) const ITEM_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("item_no", "NO", 8),
    ColumnDef::new("description", "DESCRIPTION", 36),
    ColumnDef::new("quantity", "QTY", 10),
    ColumnDef::new("unit", "UNIT", 6),
    ColumnDef::new("rate", "RATE", 12),
    ColumnDef::new("amount", "AMOUNT", 14),
    ColumnDef::new("mapping", "MAPPING", 10),
];

/// One row per line, keyed by the 1-based line number
pub(crate) fn item_rows(boq: &Boq) -> Vec<TableRow> {
    boq.items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            TableRow::with_handle(item.id.clone(), (i + 1).to_string())
                .cell(
                    "item_no",
                    item.item_no
                        .clone()
                        .map(CellValue::Text)
                        .unwrap_or(CellValue::Empty),
                )
                .cell("description", CellValue::Text(item.description.clone()))
                .cell("quantity", CellValue::Quantity(item.quantity))
                .cell("unit", CellValue::Text(item.unit.clone()))
                .cell(
                    "rate",
                    item.estimated_unit_price
                        .map(CellValue::Money)
                        .unwrap_or(CellValue::Empty),
                )
                .cell("amount", CellValue::Money(item.computed_amount()))
                .cell("mapping", CellValue::Mapping(item.mapping_status))
        })
        .collect()
}

fn describe(boq: &Boq) -> String {
    format!("{} v{}", boq.boq_number, boq.version)
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;

    let mut item = BoqItem::new(args.description, args.quantity, args.unit);
    item.estimated_unit_price = args.rate;
    item.item_no = args.item_no;
    item.category = args.category;
    item.specifications = args.spec;
    item.notes = args.notes;

    let (boq, index) = store
        .add_item(&args.boq, item)
        .map_err(|e| miette::miette!("{}", e))?;
    let added = &boq.items[index];

    println!(
        "{} Added line {} to {}",
        style("✓").green(),
        style(index + 1).cyan(),
        style(describe(&boq)).cyan()
    );
    if !global.quiet {
        println!(
            "   {} {} {} = {}",
            added.description,
            format_quantity(added.quantity),
            added.unit,
            style(format_money(added.computed_amount())).yellow()
        );
        println!(
            "   Total: {} {}",
            boq.currency,
            style(format_money(boq.totals.estimated_total_value)).yellow()
        );
    }
    Ok(())
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;

    let patch = ItemPatch {
        item_no: args.item_no,
        description: args.description,
        quantity: args.quantity,
        unit: args.unit,
        estimated_unit_price: args.rate,
        category: args.category,
        specifications: args.spec,
        notes: args.notes,
    };

    let boq = store
        .update_item(&args.boq, &args.item, patch)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Updated line {} of {}",
        style("✓").green(),
        style(&args.item).cyan(),
        style(describe(&boq)).cyan()
    );
    if !global.quiet {
        println!(
            "   Total: {} {}",
            boq.currency,
            style(format_money(boq.totals.estimated_total_value)).yellow()
        );
    }
    Ok(())
}

fn run_remove(args: RemoveArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;

    let (boq, removed) = store
        .remove_item(&args.boq, &args.item)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Removed '{}' from {}",
        style("✓").green(),
        removed.description,
        style(describe(&boq)).cyan()
    );
    if !global.quiet {
        println!("   {} line(s) remain", boq.items.len());
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let boq = store
        .find_one(&args.boq)
        .map_err(|e| miette::miette!("{}", e))?;

    match resolve_format(global, &config, OutputFormat::Tsv) {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&boq.items).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&boq.items).into_diagnostic()?;
            print!("{}", yaml);
        }
        format => {
            if boq.items.is_empty() && format == OutputFormat::Tsv {
                println!("No line items in {}.", describe(&boq));
                return Ok(());
            }
            TableFormatter::new(ITEM_COLUMNS, "line item")
                .with_handle_header("LINE")
                .without_summary()
                .output(item_rows(&boq), format);
            if format == OutputFormat::Tsv && !global.quiet {
                println!();
                println!(
                    "{} line item(s), total {} {}",
                    style(boq.totals.total_items).cyan(),
                    boq.currency,
                    style(format_money(boq.totals.estimated_total_value)).yellow()
                );
            }
        }
    }
    Ok(())
}
