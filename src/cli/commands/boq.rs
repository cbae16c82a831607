//! `boq boq` command - Bill of quantities headers, workflow and versions

use clap::{Subcommand, ValueEnum};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::item::{item_rows, ITEM_COLUMNS};
use crate::cli::commands::map::print_suggestions;
use crate::cli::helpers::{open_store, print_report, resolve_format};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Status;
use crate::core::shortid::ShortIdIndex;
use crate::core::store::{BoqFilter, BoqStatistics, BoqUpdate, NewBoq};
use crate::core::workflow::BoqWorkflow;
use crate::entities::boq::Boq;
use crate::schema::template::{format_money, format_quantity, ReportRenderer};

#[derive(Subcommand, Debug)]
pub enum BoqCommands {
    /// Create a new BOQ
    New(NewArgs),

    /// List BOQs with filtering
    List(ListArgs),

    /// Show a BOQ with its line items
    Show(ShowArgs),

    /// Change header fields, or open the file in your editor
    Edit(EditArgs),

    /// Delete a BOQ version
    Delete(DeleteArgs),

    /// Run the validation checklist and store the report
    Validate(IdArgs),

    /// Approve a BOQ (re-validates first)
    Approve(ApproveArgs),

    /// Reject a BOQ with a reason
    Reject(RejectArgs),

    /// Start the next version of a BOQ
    Version(IdArgs),

    /// Show every version of a BOQ
    History(IdArgs),

    /// Aggregate figures over the latest versions
    Stats,

    /// Append line items from a CSV file
    Import(ImportArgs),

    /// Write line items as CSV
    Export(ExportArgs),

    /// Render a Markdown report
    Report(ReportArgs),
}

/// Status filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Draft,
    Validated,
    Approved,
    Rejected,
    /// All statuses
    All,
}

impl StatusFilter {
    fn status(self) -> Option<Status> {
        match self {
            StatusFilter::Draft => Some(Status::Draft),
            StatusFilter::Validated => Some(Status::Validated),
            StatusFilter::Approved => Some(Status::Approved),
            StatusFilter::Rejected => Some(Status::Rejected),
            StatusFilter::All => None,
        }
    }
}

/// Sort key for list output
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortField {
    Number,
    Title,
    Status,
    Value,
    Updated,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// BOQ title (required unless interactive)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Customer ID from the CRM
    #[arg(long)]
    pub customer: Option<String>,

    /// Customer display name
    #[arg(long)]
    pub customer_name: Option<String>,

    /// Originating RFP reference
    #[arg(long)]
    pub rfp: Option<String>,

    /// ERP project reference
    #[arg(long)]
    pub project_ref: Option<String>,

    /// Currency code (default from config, else INR)
    #[arg(long)]
    pub currency: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Tags (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Open in editor after creation
    #[arg(long, short = 'e')]
    pub edit: bool,

    /// Interactive mode (prompt for fields)
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Filter by customer name or ID (substring match)
    #[arg(long)]
    pub customer: Option<String>,

    /// Search in title and BOQ number
    #[arg(long)]
    pub search: Option<String>,

    /// Include superseded versions
    #[arg(long, short = 'a')]
    pub all_versions: bool,

    /// Sort by field
    #[arg(long, default_value = "number")]
    pub sort: SortField,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub id: String,

    /// Also list mapping suggestions per line
    #[arg(long)]
    pub suggestions: bool,
}

#[derive(clap::Args, Debug)]
pub struct IdArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub id: String,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[arg(long)]
    pub customer: Option<String>,

    #[arg(long)]
    pub customer_name: Option<String>,

    #[arg(long)]
    pub rfp: Option<String>,

    #[arg(long)]
    pub project_ref: Option<String>,

    #[arg(long)]
    pub currency: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Replace tags (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub id: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct ApproveArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub id: String,

    /// Approver name (default: configured author)
    #[arg(long)]
    pub by: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RejectArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub id: String,

    /// Reason for rejection
    #[arg(long)]
    pub reason: String,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub id: String,

    /// CSV file with item_no, description, quantity, unit, rate, amount columns
    pub file: PathBuf,

    /// Skip rows that fail to parse instead of aborting
    #[arg(long)]
    pub skip_errors: bool,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub id: String,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    /// BOQ ID, short ID (@N) or BOQ number
    pub id: String,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Run a BOQ subcommand
pub fn run(cmd: BoqCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BoqCommands::New(args) => run_new(args, global),
        BoqCommands::List(args) => run_list(args, global),
        BoqCommands::Show(args) => run_show(args, global),
        BoqCommands::Edit(args) => run_edit(args, global),
        BoqCommands::Delete(args) => run_delete(args, global),
        BoqCommands::Validate(args) => run_validate(args, global),
        BoqCommands::Approve(args) => run_approve(args, global),
        BoqCommands::Reject(args) => run_reject(args, global),
        BoqCommands::Version(args) => run_version(args, global),
        BoqCommands::History(args) => run_history(args, global),
        BoqCommands::Stats => run_stats(global),
        BoqCommands::Import(args) => run_import(args, global),
        BoqCommands::Export(args) => run_export(args, global),
        BoqCommands::Report(args) => run_report(args, global),
    }
}

const LIST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "NUMBER", 14),
    ColumnDef::new("version", "VER", 4),
    ColumnDef::new("title", "TITLE", 32),
    ColumnDef::new("customer", "CUSTOMER", 20),
    ColumnDef::new("status", "STATUS", 10),
    ColumnDef::new("items", "ITEMS", 6),
    ColumnDef::new("value", "VALUE", 16),
    ColumnDef::new("score", "SCORE", 6),
];

const HISTORY_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("version", "VER", 4),
    ColumnDef::new("status", "STATUS", 10),
    ColumnDef::new("items", "ITEMS", 6),
    ColumnDef::new("value", "VALUE", 16),
    ColumnDef::new("score", "SCORE", 6),
    ColumnDef::new("author", "AUTHOR", 14),
    ColumnDef::new("updated", "UPDATED", 10),
];

fn customer_of(boq: &Boq) -> Option<String> {
    boq.customer_name.clone().or_else(|| boq.customer_id.clone())
}

fn summary_row(boq: &Boq, short_ids: &ShortIdIndex) -> TableRow {
    TableRow::new(boq.id.to_string(), short_ids)
        .cell("number", CellValue::Text(boq.boq_number.clone()))
        .cell("version", CellValue::Number(boq.version as usize))
        .cell("title", CellValue::Text(boq.title.clone()))
        .cell(
            "customer",
            customer_of(boq).map(CellValue::Text).unwrap_or(CellValue::Empty),
        )
        .cell("status", CellValue::Status(boq.status))
        .cell("items", CellValue::Number(boq.totals.total_items))
        .cell("value", CellValue::Money(boq.totals.estimated_total_value))
        .cell("score", CellValue::Score(boq.validation.as_ref().map(|r| r.score)))
        .cell("author", CellValue::Text(boq.author.clone()))
        .cell("updated", CellValue::Date(boq.updated))
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;

    let mut new = NewBoq {
        title: String::new(),
        customer_id: args.customer,
        customer_name: args.customer_name,
        rfp_id: args.rfp,
        project_id: args.project_ref,
        currency: args.currency,
        notes: args.notes,
        tags: args.tags,
        items: Vec::new(),
    };

    if args.interactive {
        let theme = ColorfulTheme::default();
        new.title = Input::with_theme(&theme)
            .with_prompt("Title")
            .interact_text()
            .into_diagnostic()?;
        let customer: String = Input::with_theme(&theme)
            .with_prompt("Customer name")
            .allow_empty(true)
            .interact_text()
            .into_diagnostic()?;
        if !customer.trim().is_empty() {
            new.customer_name = Some(customer);
        }
    } else {
        new.title = args.title.ok_or_else(|| {
            miette::miette!("Title is required (use --title or -i for interactive)")
        })?;
    }

    let boq = store.create_boq(new).map_err(|e| miette::miette!("{}", e))?;
    let file_path = store.path_of(&boq.id);

    let mut short_ids = ShortIdIndex::load(store.project());
    let short_id = short_ids.add(boq.id.to_string());
    let _ = short_ids.save(store.project());

    println!(
        "{} Created BOQ {} {}",
        style("✓").green(),
        style(&boq.boq_number).cyan(),
        style(format!("(@{})", short_id)).dim()
    );
    if !global.quiet {
        println!("   {}", style(file_path.display()).dim());
        println!("   Title: {}", style(&boq.title).yellow());
    }

    if args.edit {
        println!();
        println!("Opening in {}...", style(config.editor()).yellow());
        config.run_editor(&file_path).into_diagnostic()?;
    }

    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;

    let filter = BoqFilter {
        status: args.status.status(),
        customer: args.customer,
        search: args.search,
        latest_only: !args.all_versions,
    };
    let mut boqs = store.find_all(&filter);

    match args.sort {
        // find_all already orders by number then version
        SortField::Number => {}
        SortField::Title => boqs.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortField::Status => boqs.sort_by_key(|b| b.status.to_string()),
        SortField::Value => boqs.sort_by(|a, b| {
            a.totals
                .estimated_total_value
                .total_cmp(&b.totals.estimated_total_value)
        }),
        SortField::Updated => boqs.sort_by_key(|b| b.updated),
    }

    if args.reverse {
        boqs.reverse();
    }

    if let Some(limit) = args.limit {
        boqs.truncate(limit);
    }

    if args.count {
        println!("{}", boqs.len());
        return Ok(());
    }

    if boqs.is_empty() {
        println!("No BOQs found.");
        return Ok(());
    }

    let mut short_ids = ShortIdIndex::load(store.project());
    short_ids.ensure_all(boqs.iter().map(|b| b.id.to_string()));
    let _ = short_ids.save(store.project());

    match resolve_format(global, &config, OutputFormat::Tsv) {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&boqs).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&boqs).into_diagnostic()?;
            print!("{}", yaml);
        }
        format => {
            let rows = boqs.iter().map(|b| summary_row(b, &short_ids));
            TableFormatter::new(LIST_COLUMNS, "BOQ").output(rows, format);
        }
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let boq = store.find_one(&args.id).map_err(|e| miette::miette!("{}", e))?;

    let mut short_ids = ShortIdIndex::load(store.project());
    let short_id = short_ids.add(boq.id.to_string());
    let _ = short_ids.save(store.project());

    match resolve_format(global, &config, OutputFormat::Auto) {
        OutputFormat::Yaml => {
            let content = fs::read_to_string(store.path_of(&boq.id)).into_diagnostic()?;
            print!("{}", content);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&boq).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Id => {
            println!("{}", boq.id);
        }
        OutputFormat::Md => {
            let renderer = ReportRenderer::new().map_err(|e| miette::miette!("{}", e))?;
            let report = renderer.render_boq(&boq).map_err(|e| miette::miette!("{}", e))?;
            print!("{}", report);
        }
        format => {
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} {}",
                style("ID").bold(),
                style(&boq.id.to_string()).cyan(),
                style(format!("@{}", short_id)).dim()
            );
            println!(
                "{}: {} v{}",
                style("Number").bold(),
                style(&boq.boq_number).cyan(),
                boq.version
            );
            println!("{}: {}", style("Title").bold(), style(&boq.title).yellow());
            println!("{}: {}", style("Status").bold(), boq.status);
            if let Some(customer) = customer_of(&boq) {
                println!("{}: {}", style("Customer").bold(), customer);
            }
            if let Some(ref rfp) = boq.rfp_id {
                println!("{}: {}", style("RFP").bold(), rfp);
            }
            if let Some(ref project) = boq.project_id {
                println!("{}: {}", style("Project").bold(), project);
            }
            if let Some(ref previous) = boq.previous_version_id {
                println!("{}: {}", style("Previous version").bold(), previous);
            }
            if let Some(ref approver) = boq.approved_by {
                let when = boq
                    .approved_at
                    .map(|t| format!(" on {}", t.format("%Y-%m-%d")))
                    .unwrap_or_default();
                println!("{}: {}{}", style("Approved by").bold(), approver, when);
            }
            if let Some(ref reason) = boq.rejection_reason {
                println!("{}: {}", style("Rejected").bold(), style(reason).red());
            }
            println!("{}", style("─".repeat(60)).dim());

            println!();
            if boq.items.is_empty() {
                println!("{}", style("No line items").dim());
            } else {
                let table_format = if format == OutputFormat::Auto {
                    OutputFormat::Tsv
                } else {
                    format
                };
                TableFormatter::new(ITEM_COLUMNS, "line item")
                    .with_handle_header("LINE")
                    .without_summary()
                    .output(item_rows(&boq), table_format);
            }

            if args.suggestions {
                print_suggestions(&boq);
            }

            println!();
            println!(
                "{}: {} item(s), quantity {}, value {} {}",
                style("Totals").bold(),
                boq.totals.total_items,
                format_quantity(boq.totals.total_quantity),
                boq.currency,
                style(format_money(boq.totals.estimated_total_value)).yellow()
            );

            match boq.validation {
                Some(ref report) => {
                    println!();
                    print_report(report);
                }
                None => {
                    println!(
                        "{}: {}",
                        style("Validation").bold(),
                        style("not validated since the last change").dim()
                    );
                }
            }

            if !boq.tags.is_empty() {
                println!();
                println!("{}: {}", style("Tags").bold(), boq.tags.join(", "));
            }

            if let Some(ref notes) = boq.notes {
                if !notes.is_empty() {
                    println!();
                    println!("{}", style("Notes:").bold());
                    println!("{}", notes);
                }
            }

            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {} | {}: {}",
                style("Author").dim(),
                boq.author,
                style("Updated").dim(),
                boq.updated.format("%Y-%m-%d %H:%M"),
                style("Revision").dim(),
                boq.entity_revision
            );
        }
    }

    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;

    let update = BoqUpdate {
        title: args.title,
        customer_id: args.customer,
        customer_name: args.customer_name,
        rfp_id: args.rfp,
        project_id: args.project_ref,
        currency: args.currency,
        notes: args.notes,
        tags: args.tags,
    };

    if update.is_empty() {
        let boq = store.find_one(&args.id).map_err(|e| miette::miette!("{}", e))?;
        store
            .ensure_modifiable(&boq)
            .map_err(|e| miette::miette!("{}", e))?;
        let path = store.path_of(&boq.id);
        println!(
            "Opening {} in {}...",
            style(path.display()).cyan(),
            style(config.editor()).yellow()
        );
        config.run_editor(&path).into_diagnostic()?;
        return Ok(());
    }

    let boq = store
        .update_header(&args.id, update)
        .map_err(|e| miette::miette!("{}", e))?;
    println!(
        "{} Updated {} v{}",
        style("✓").green(),
        style(&boq.boq_number).cyan(),
        boq.version
    );
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;

    if !args.yes {
        let boq = store.find_one(&args.id).map_err(|e| miette::miette!("{}", e))?;
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete {} v{} ({})?",
                boq.boq_number, boq.version, boq.title
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let boq = store.delete_boq(&args.id).map_err(|e| miette::miette!("{}", e))?;
    println!(
        "{} Deleted {} v{}",
        style("✓").green(),
        style(&boq.boq_number).cyan(),
        boq.version
    );
    Ok(())
}

fn run_validate(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let (boq, report) = store.validate(&args.id).map_err(|e| miette::miette!("{}", e))?;

    match resolve_format(global, &config, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&report).into_diagnostic()?);
        }
        _ => {
            println!(
                "{} Validated {} v{}",
                style("→").blue(),
                style(&boq.boq_number).cyan(),
                boq.version
            );
            print_report(&report);
            if boq.status.is_locked() && !global.quiet {
                println!(
                    "   {}",
                    style(format!("{} BOQ left unchanged", boq.status)).dim()
                );
            }
        }
    }

    if report.has_errors() {
        Err(miette::miette!(
            "Validation failed: {} error(s)",
            report.error_count
        ))
    } else {
        Ok(())
    }
}

fn run_approve(args: ApproveArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let approver = args.by.unwrap_or_else(|| config.author());

    let boq = store
        .approve(&args.id, &approver)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Approved {} v{} by {}",
        style("✓").green(),
        style(&boq.boq_number).cyan(),
        boq.version,
        style(&approver).yellow()
    );
    if !global.quiet {
        if let Some(ref report) = boq.validation {
            println!("   Score: {:.1} ({} warning(s))", report.score, report.warning_count);
        }
    }
    Ok(())
}

fn run_reject(args: RejectArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let boq = store
        .reject(&args.id, &args.reason)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Rejected {} v{}",
        style("✓").green(),
        style(&boq.boq_number).cyan(),
        boq.version
    );
    if !global.quiet {
        println!("   Reason: {}", args.reason.trim());
        println!(
            "   Use {} to revise it",
            style(format!("boq boq version {}", boq.boq_number)).yellow()
        );
    }
    Ok(())
}

fn run_version(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let next = store
        .create_new_version(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut short_ids = ShortIdIndex::load(store.project());
    let short_id = short_ids.add(next.id.to_string());
    let _ = short_ids.save(store.project());

    println!(
        "{} Created {} v{} {}",
        style("✓").green(),
        style(&next.boq_number).cyan(),
        next.version,
        style(format!("(@{})", short_id)).dim()
    );
    if !global.quiet {
        println!("   {}", style(store.path_of(&next.id).display()).dim());
        if let Some(ref previous) = next.previous_version_id {
            println!("   Previous: {}", previous);
        }
    }
    Ok(())
}

fn run_history(args: IdArgs, global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let chain = store
        .version_history(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    let mut short_ids = ShortIdIndex::load(store.project());
    short_ids.ensure_all(chain.iter().map(|b| b.id.to_string()));
    let _ = short_ids.save(store.project());

    match resolve_format(global, &config, OutputFormat::Tsv) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&chain).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&chain).into_diagnostic()?);
        }
        format => {
            if format == OutputFormat::Tsv {
                if let Some(first) = chain.first() {
                    println!("{} {}", style(&first.boq_number).cyan().bold(), first.title);
                    println!();
                }
            }
            let rows = chain.iter().map(|b| summary_row(b, &short_ids));
            TableFormatter::new(HISTORY_COLUMNS, "version").output(rows, format);
        }
    }
    Ok(())
}

fn run_stats(global: &GlobalOpts) -> Result<()> {
    let (store, config) = open_store(global)?;
    let stats = store.statistics();

    match resolve_format(global, &config, OutputFormat::Auto) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&stats).into_diagnostic()?);
        }
        OutputFormat::Md => print!("{}", stats_markdown(&stats)),
        _ => {
            println!("{}", style("BOQ Statistics").bold());
            println!("{}", style("─".repeat(40)).dim());
            println!(
                "  BOQs:          {} ({} version(s))",
                style(stats.total_boqs).cyan(),
                stats.total_versions
            );
            for (status, count) in &stats.by_status {
                println!("    {:<12} {}", status, count);
            }
            println!("  Line items:    {}", style(stats.total_items).cyan());
            println!(
                "  Total value:   {}",
                style(format_money(stats.total_value)).yellow()
            );
            match stats.average_score {
                Some(score) => println!("  Avg. score:    {:.1}", score),
                None => println!("  Avg. score:    {}", style("-").dim()),
            }
            println!("  Mapping:");
            println!("    {:<12} {}", "unmapped", stats.mapping.unmapped);
            println!("    {:<12} {}", "suggested", stats.mapping.suggested);
            println!("    {:<12} {}", "confirmed", stats.mapping.confirmed);
            println!("    {:<12} {}", "custom", stats.mapping.custom);
        }
    }
    Ok(())
}

fn stats_markdown(stats: &BoqStatistics) -> String {
    let mut output = String::new();
    output.push_str("# BOQ Statistics\n\n");

    let mut summary = Builder::default();
    summary.push_record(["Metric", "Value"]);
    summary.push_record(["BOQs", &stats.total_boqs.to_string()]);
    summary.push_record(["Versions", &stats.total_versions.to_string()]);
    summary.push_record(["Line items", &stats.total_items.to_string()]);
    summary.push_record(["Total value", &format_money(stats.total_value)]);
    summary.push_record([
        "Average score",
        &stats
            .average_score
            .map(|s| format!("{:.1}", s))
            .unwrap_or_else(|| "-".to_string()),
    ]);
    output.push_str(&summary.build().with(Style::markdown()).to_string());
    output.push_str("\n\n## By Status\n\n");

    let mut by_status = Builder::default();
    by_status.push_record(["Status", "Count"]);
    for (status, count) in &stats.by_status {
        by_status.push_record([status.as_str(), &count.to_string()]);
    }
    output.push_str(&by_status.build().with(Style::markdown()).to_string());
    output.push_str("\n\n## Mapping\n\n");

    let mut mapping = Builder::default();
    mapping.push_record(["Mapping", "Lines"]);
    mapping.push_record(["unmapped", &stats.mapping.unmapped.to_string()]);
    mapping.push_record(["suggested", &stats.mapping.suggested.to_string()]);
    mapping.push_record(["confirmed", &stats.mapping.confirmed.to_string()]);
    mapping.push_record(["custom", &stats.mapping.custom.to_string()]);
    output.push_str(&mapping.build().with(Style::markdown()).to_string());
    output.push('\n');
    output
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let file = fs::File::open(&args.file)
        .map_err(|e| miette::miette!("Cannot open {}: {}", args.file.display(), e))?;

    let (boq, stats) = store
        .import_items(&args.id, file, args.skip_errors)
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Imported {} line item(s) into {} v{}",
        style("✓").green(),
        style(stats.imported).cyan(),
        style(&boq.boq_number).cyan(),
        boq.version
    );
    if !global.quiet {
        println!(
            "   Rows: {} processed, {} skipped, {} error(s)",
            stats.rows_processed, stats.skipped, stats.errors
        );
        println!(
            "   Total: {} {}",
            boq.currency,
            style(format_money(boq.totals.estimated_total_value)).yellow()
        );
    }
    Ok(())
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;

    match args.output {
        Some(ref path) => {
            let file = fs::File::create(path).into_diagnostic()?;
            let boq = store
                .export_items(&args.id, file)
                .map_err(|e| miette::miette!("{}", e))?;
            println!(
                "{} Exported {} line item(s) to {}",
                style("✓").green(),
                boq.items.len(),
                style(path.display()).cyan()
            );
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            store
                .export_items(&args.id, &mut handle)
                .map_err(|e| miette::miette!("{}", e))?;
            handle.flush().into_diagnostic()?;
        }
    }
    Ok(())
}

fn run_report(args: ReportArgs, global: &GlobalOpts) -> Result<()> {
    let (store, _) = open_store(global)?;
    let boq = store.find_one(&args.id).map_err(|e| miette::miette!("{}", e))?;

    let renderer = ReportRenderer::new().map_err(|e| miette::miette!("{}", e))?;
    let report = renderer.render_boq(&boq).map_err(|e| miette::miette!("{}", e))?;

    match args.output {
        Some(ref path) => {
            fs::write(path, &report).into_diagnostic()?;
            println!(
                "{} Wrote report for {} v{} to {}",
                style("✓").green(),
                style(&boq.boq_number).cyan(),
                boq.version,
                style(path.display()).cyan()
            );
        }
        None => print!("{}", report),
    }
    Ok(())
}
