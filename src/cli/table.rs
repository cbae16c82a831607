//! Table formatting for CLI list commands
//!
//! Every list command builds `TableRow`s and hands them to a
//! `TableFormatter`, which renders TSV, CSV, Markdown or bare ids.

use chrono::{DateTime, Local, Utc};
use console::style;

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::entity::Status;
use crate::core::shortid::ShortIdIndex;
use crate::entities::boq::MappingStatus;

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Entity ID (truncated, cyan)
    Id(String),
    /// Plain text, truncated to the column
    Text(String),
    /// Workflow status with color coding
    Status(Status),
    /// Mapping status with color coding
    Mapping(MappingStatus),
    /// Validation score, "-" when not validated
    Score(Option<f64>),
    /// Amount with two decimals
    Money(f64),
    /// Quantity without trailing zeros
    Quantity(f64),
    Number(usize),
    /// DateTime displayed as date only
    Date(DateTime<Utc>),
    /// Empty/placeholder
    Empty,
}

fn quantity_str(q: f64) -> String {
    crate::schema::template::format_quantity(q)
}

impl CellValue {
    /// Format for TSV output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => {
                let display = if id.len() > 16 {
                    format!("{}...", &id[..13])
                } else {
                    id.clone()
                };
                format!("{:<width$}", style(&display).cyan(), width = width)
            }
            CellValue::Text(s) => {
                let truncated = truncate_str(s, width.saturating_sub(2));
                format!("{:<width$}", truncated, width = width)
            }
            CellValue::Status(status) => {
                let s = status.to_string();
                let styled = match status {
                    Status::Draft => style(&s).dim(),
                    Status::Validated => style(&s).yellow(),
                    Status::Approved => style(&s).green(),
                    Status::Rejected => style(&s).red(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Mapping(mapping) => {
                let s = mapping.to_string();
                let styled = match mapping {
                    MappingStatus::Unmapped => style(&s).dim(),
                    MappingStatus::Suggested => style(&s).yellow(),
                    MappingStatus::Confirmed => style(&s).green(),
                    MappingStatus::Custom => style(&s).magenta(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Score(opt) => {
                let styled = match opt {
                    Some(score) => {
                        let s = format!("{:.1}", score);
                        if *score >= 90.0 {
                            style(s).green()
                        } else if *score >= 70.0 {
                            style(s).yellow()
                        } else {
                            style(s).red()
                        }
                    }
                    None => style("-".to_string()).dim(),
                };
                format!("{:>width$}", styled, width = width)
            }
            CellValue::Money(v) => format!("{:>width$.2}", v, width = width),
            CellValue::Quantity(q) => format!("{:>width$}", quantity_str(*q), width = width),
            CellValue::Number(n) => format!("{:>width$}", n, width = width),
            CellValue::Date(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                format!("{:<width$}", local.format("%Y-%m-%d"), width = width)
            }
            CellValue::Empty => format!("{:<width$}", "-", width = width),
        }
    }

    /// Raw string value (no colors, no padding)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(id) => id.clone(),
            CellValue::Text(s) => s.clone(),
            CellValue::Status(status) => status.to_string(),
            CellValue::Mapping(mapping) => mapping.to_string(),
            CellValue::Score(opt) => opt.map(|s| format!("{:.1}", s)).unwrap_or_default(),
            CellValue::Money(v) => format!("{:.2}", v),
            CellValue::Quantity(q) => quantity_str(*q),
            CellValue::Number(n) => n.to_string(),
            CellValue::Date(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                local.format("%Y-%m-%d").to_string()
            }
            CellValue::Empty => String::new(),
        }
    }

    /// Format for CSV output (RFC 4180, no colors)
    pub fn format_csv(&self) -> String {
        escape_csv(&self.raw())
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = match self {
            CellValue::Score(None) | CellValue::Empty => "-".to_string(),
            other => other.raw(),
        };
        raw.replace('|', "\\|")
    }

    /// Display width of this cell's content, for column sizing
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Id(id) => id.len().min(16),
            CellValue::Score(None) | CellValue::Empty => 1,
            other => other.raw().chars().count(),
        }
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    /// Handle shown in the first column (`@N` or a line number)
    pub handle: String,
    pub full_id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    /// Row for an entity, keyed by its short id
    pub fn new(full_id: String, short_ids: &ShortIdIndex) -> Self {
        let handle = short_ids.format_short(&full_id);
        Self::with_handle(full_id, handle)
    }

    pub fn with_handle(full_id: String, handle: String) -> Self {
        Self {
            handle,
            full_id,
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    handle_header: &'static str,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            handle_header: "SHORT",
            show_summary: true,
        }
    }

    /// Header of the first column, e.g. "LINE" for line items
    pub fn with_handle_header(mut self, header: &'static str) -> Self {
        self.handle_header = header;
        self
    }

    /// Hide the "N xxx(s) found" line
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    /// Output rows in the specified format
    pub fn output<I>(&self, rows: I, format: OutputFormat)
    where
        I: IntoIterator<Item = TableRow>,
    {
        let rows: Vec<TableRow> = rows.into_iter().collect();

        match format {
            OutputFormat::Csv => self.output_csv(&rows),
            OutputFormat::Md => self.output_md(&rows),
            OutputFormat::Id => self.output_ids(&rows),
            _ => self.output_tsv(&rows),
        }
    }

    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        let mut widths = Vec::with_capacity(self.columns.len() + 1);

        let handle_width = rows
            .iter()
            .map(|r| r.handle.len())
            .max()
            .unwrap_or(0)
            .max(self.handle_header.len());
        widths.push(handle_width);

        for col in self.columns {
            let max_content = rows
                .iter()
                .filter_map(|r| r.get(col.key))
                .map(|v| v.display_width())
                .max()
                .unwrap_or(0);
            // +2 leaves room for the truncation marker on text cells
            let natural = col.header.len().max(max_content.saturating_add(2));
            widths.push(natural.min(col.width));
        }

        widths
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let mut header_parts = vec![format!(
            "{:<width$}",
            style(self.handle_header).bold().dim(),
            width = widths[0]
        )];
        for (col, width) in self.columns.iter().zip(&widths[1..]) {
            header_parts.push(format!("{:<width$}", style(col.header).bold(), width = *width));
        }
        println!("{}", header_parts.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len() - 1;
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let mut row_parts = vec![format!(
                "{:<width$}",
                style(&row.handle).cyan(),
                width = widths[0]
            )];
            for (col, width) in self.columns.iter().zip(&widths[1..]) {
                match row.get(col.key) {
                    Some(value) => row_parts.push(value.format_tsv(*width)),
                    None => row_parts.push(format!("{:<width$}", "-", width = *width)),
                }
            }
            println!("{}", row_parts.join(" "));
        }

        if self.show_summary {
            println!();
            println!(
                "{} {}(s) found. Use {} to reference by short ID.",
                style(rows.len()).cyan(),
                self.entity_name,
                style("@N").cyan()
            );
        }
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let mut headers = vec![self.handle_header.to_lowercase(), "id".to_string()];
        headers.extend(self.columns.iter().map(|c| c.key.to_string()));
        println!("{}", headers.join(","));

        for row in rows {
            let mut values = vec![escape_csv(&row.handle), escape_csv(&row.full_id)];
            for col in self.columns {
                values.push(row.get(col.key).map(|v| v.format_csv()).unwrap_or_default());
            }
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let mut headers = vec![self.handle_header.to_string(), "ID".to_string()];
        headers.extend(self.columns.iter().map(|c| c.header.to_string()));
        println!("| {} |", headers.join(" | "));

        let separators: Vec<&str> = headers.iter().map(|_| "---").collect();
        println!("|{}|", separators.join("|"));

        for row in rows {
            let mut values = vec![row.handle.clone(), row.full_id.clone()];
            for col in self.columns {
                values.push(
                    row.get(col.key)
                        .map(|v| v.format_md())
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            println!("| {} |", values.join(" | "));
        }
    }

    fn output_ids(&self, rows: &[TableRow]) {
        for row in rows {
            println!("{}", row.full_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_text_format() {
        let cell = CellValue::Text("Hello World".to_string());
        assert!(cell.format_tsv(20).contains("Hello World"));
        assert_eq!(cell.format_csv(), "Hello World");
        assert_eq!(cell.format_md(), "Hello World");
    }

    #[test]
    fn test_status_cells() {
        assert_eq!(CellValue::Status(Status::Validated).format_csv(), "validated");
        assert_eq!(CellValue::Mapping(MappingStatus::Custom).format_md(), "custom");
    }

    #[test]
    fn test_numeric_cells() {
        assert_eq!(CellValue::Money(1875.5).raw(), "1875.50");
        assert_eq!(CellValue::Quantity(2.0).raw(), "2");
        assert_eq!(CellValue::Score(Some(83.33)).raw(), "83.3");
        assert_eq!(CellValue::Score(None).format_md(), "-");
        assert_eq!(CellValue::Score(None).format_csv(), "");
    }

    #[test]
    fn test_md_escapes_pipes() {
        let cell = CellValue::Text("a|b".to_string());
        assert_eq!(cell.format_md(), "a\\|b");
    }

    #[test]
    fn test_table_row_builder() {
        let mut short_ids = ShortIdIndex::new();
        short_ids.add("BOQ-123".to_string());
        let row = TableRow::new("BOQ-123".to_string(), &short_ids)
            .cell("title", CellValue::Text("Kitchen".to_string()))
            .cell("status", CellValue::Status(Status::Draft));

        assert_eq!(row.handle, "@1");
        assert!(row.get("title").is_some());
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_widths_capped_by_column() {
        let columns = [ColumnDef::new("title", "TITLE", 10)];
        let formatter = TableFormatter::new(&columns, "BOQ");
        let rows = vec![TableRow::with_handle("X".to_string(), "@1".to_string())
            .cell("title", CellValue::Text("A very long title indeed".to_string()))];
        assert_eq!(formatter.calculate_widths(&rows), vec![5, 10]);
    }
}
