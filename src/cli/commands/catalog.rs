//! `boq catalog` command - Catalog item management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::{open_store, resolve_format};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::shortid::ShortIdIndex;
use crate::entities::catalog::CatalogItem;

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Create a catalog item
    New(NewArgs),

    /// List catalog items
    List(ListArgs),

    /// Show a catalog item
    Show(ShowArgs),

    /// Create catalog items from a CSV file
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Unique item code
    #[arg(long)]
    pub code: String,

    /// Item name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Unit of measure
    #[arg(long, short = 'u', default_value = "nos")]
    pub unit: String,

    /// List price per unit
    #[arg(long, short = 'p')]
    pub price: Option<f64>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Extra match keywords (comma-separated)
    #[arg(long, short = 'k', value_delimiter = ',')]
    pub keywords: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Search in code, name and keywords
    #[arg(long)]
    pub search: Option<String>,

    /// Filter by category (case-insensitive)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Catalog code, ID or short ID (@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file with code, name, unit, unit_price, category, keywords columns
    pub file: PathBuf,

    /// Skip rows that fail to parse instead of aborting
    #[arg(long)]
    pub skip_errors: bool,
}

pub fn run(cmd: CatalogCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CatalogCommands::New(args) => run_new(args, global),
        CatalogCommands::List(args) => run_list(args, global),
        CatalogCommands::Show(args) => run_show(args, global),
        CatalogCommands::Import(args) => run_import(args, global),
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 14),
    ColumnDef::new("name", "NAME", 32),
    ColumnDef::new("unit", "UNIT", 6),
    ColumnDef::new("price", "PRICE", 14),
    ColumnDef::new("category", "CATEGORY", 16),
];

fn matches_search(item: &CatalogItem, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    item.code.to_lowercase().contains(&needle)
        || item.name.to_lowercase().contains(&needle)
        || item.keywords.iter().any(|k| k.to_lowercase().contains(&needle))
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;

    let mut item = CatalogItem::new(args.code, args.name, args.unit, config.author());
    item.unit_price = args.price;
    item.category = args.category;
    item.description = args.description;
    item.keywords = args
        .keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    let item = store
        .create_catalog_item(item)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut short_ids = ShortIdIndex::load(store.project());
    let short_id = short_ids.add(item.id.to_string());
    let _ = short_ids.save(store.project());

    println!(
        "{} Created catalog item {} {}",
        style("✓").green(),
        style(&item.code).cyan(),
        style(format!("(@{})", short_id)).dim()
    );
    if !global.quiet {
        println!("   {}", style(store.path_of(&item.id).display()).dim());
        println!("   Name: {}", style(&item.name).yellow());
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;

    let items: Vec<CatalogItem> = store
        .list_catalog()
        .into_iter()
        .filter(|c| args.search.as_deref().map_or(true, |s| matches_search(c, s)))
        .filter(|c| {
            args.category.as_deref().map_or(true, |cat| {
                c.category
                    .as_deref()
                    .is_some_and(|have| have.eq_ignore_ascii_case(cat))
            })
        })
        .collect();

    if args.count {
        println!("{}", items.len());
        return Ok(());
    }

    if items.is_empty() {
        println!("No catalog items found.");
        return Ok(());
    }

    let mut short_ids = ShortIdIndex::load(store.project());
    short_ids.ensure_all(items.iter().map(|c| c.id.to_string()));
    let _ = short_ids.save(store.project());

    match resolve_format(global, &config, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&items).into_diagnostic()?);
        }
        format => {
            let rows = items.iter().map(|c| {
                TableRow::new(c.id.to_string(), &short_ids)
                    .cell("code", CellValue::Text(c.code.clone()))
                    .cell("name", CellValue::Text(c.name.clone()))
                    .cell("unit", CellValue::Text(c.unit.clone()))
                    .cell(
                        "price",
                        c.unit_price.map(CellValue::Money).unwrap_or(CellValue::Empty),
                    )
                    .cell(
                        "category",
                        c.category
                            .clone()
                            .map(CellValue::Text)
                            .unwrap_or(CellValue::Empty),
                    )
            });
            TableFormatter::new(COLUMNS, "catalog item").output(rows, format);
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let item = store
        .find_catalog_item(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    match resolve_format(global, &config, OutputFormat::Auto) {
        OutputFormat::Yaml => {
            let content = fs::read_to_string(store.path_of(&item.id)).into_diagnostic()?;
            print!("{}", content);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&item).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", item.id),
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("ID").bold(), style(item.id.to_string()).cyan());
            println!("{}: {}", style("Code").bold(), style(&item.code).cyan());
            println!("{}: {}", style("Name").bold(), style(&item.name).yellow());
            println!("{}: {}", style("Unit").bold(), item.unit);
            if let Some(price) = item.unit_price {
                println!("{}: {:.2}", style("Unit price").bold(), price);
            }
            if let Some(ref category) = item.category {
                println!("{}: {}", style("Category").bold(), category);
            }
            if !item.keywords.is_empty() {
                println!("{}: {}", style("Keywords").bold(), item.keywords.join(", "));
            }
            if let Some(ref description) = item.description {
                println!();
                println!("{}", description);
            }
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {}",
                style("Author").dim(),
                item.author,
                style("Created").dim(),
                item.created.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let file = fs::File::open(&args.file)
        .map_err(|e| miette::miette!("Cannot open {}: {}", args.file.display(), e))?;

    let (created, stats) = store
        .import_catalog(file, args.skip_errors)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut short_ids = ShortIdIndex::load(store.project());
    short_ids.ensure_all(created.iter().map(|c| c.id.to_string()));
    let _ = short_ids.save(store.project());

    println!(
        "{} Imported {} catalog item(s)",
        style("✓").green(),
        style(created.len()).cyan()
    );
    if !global.quiet {
        println!(
            "   Rows: {} processed, {} skipped, {} error(s)",
            stats.rows_processed, stats.skipped, stats.errors
        );
    }
    Ok(())
}
