//! CSV import and export of BOQ line items and catalog entries
//!
//! Headers are matched case-insensitively and several spellings are accepted
//! for each column, since BOQ sheets arrive from many different templates.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::HashMap;
use std::io::{Read, Write};
use thiserror::Error;

use crate::entities::boq::{Boq, BoqItem};
use crate::entities::catalog::CatalogItem;

const ITEM_NO: &[&str] = &["item_no", "item no", "item", "sl no", "s.no", "sr no", "no"];
const DESCRIPTION: &[&str] = &["description", "item_description", "desc"];
const QUANTITY: &[&str] = &["quantity", "qty"];
const UNIT: &[&str] = &["unit", "uom", "units"];
const RATE: &[&str] = &["rate", "price", "unit_price", "estimated_unit_price"];
const AMOUNT: &[&str] = &["amount", "total", "estimated_amount"];
const CATEGORY: &[&str] = &["category"];
const SPECIFICATIONS: &[&str] = &["specifications", "specification", "specs"];
const NOTES: &[&str] = &["notes", "remarks"];

const CODE: &[&str] = &["code", "catalog_code", "item_code"];
const NAME: &[&str] = &["name", "title"];
const KEYWORDS: &[&str] = &["keywords", "tags"];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Row {row}: {message}")]
    Row { row: usize, message: String },
}

/// Counts reported after an import
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub rows_processed: usize,
    pub imported: usize,
    pub skipped: usize,
    pub errors: usize,
}

struct Columns(HashMap<String, usize>);

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        Columns(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().to_lowercase(), i))
                .collect(),
        )
    }

    fn index(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.0.get(*a).copied())
    }

    fn require(&self, aliases: &[&'static str]) -> Result<usize, ImportError> {
        self.index(aliases)
            .ok_or(ImportError::MissingColumn(aliases[0]))
    }

    fn get(&self, record: &StringRecord, aliases: &[&str]) -> Option<String> {
        self.index(aliases)
            .and_then(|idx| record.get(idx))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Parse a number as written in spreadsheets: thousands separators allowed
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Run `parse` over every data row. Blank rows are skipped; failing rows
/// abort the import unless `skip_errors` is set.
fn parse_rows<R, T, F>(
    input: R,
    skip_errors: bool,
    required: &[&[&'static str]],
    mut parse: F,
) -> Result<(Vec<T>, ImportStats), ImportError>
where
    R: Read,
    F: FnMut(&Columns, &StringRecord) -> Result<T, String>,
{
    let mut rdr = reader(input);
    let columns = Columns::from_headers(rdr.headers()?);
    for aliases in required {
        columns.require(aliases)?;
    }

    let mut stats = ImportStats::default();
    let mut parsed = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        // header is row 1
        let row = idx + 2;
        stats.rows_processed += 1;

        let outcome = result
            .map_err(|e| e.to_string())
            .and_then(|record| {
                if record.iter().all(|f| f.trim().is_empty()) {
                    Ok(None)
                } else {
                    parse(&columns, &record).map(Some)
                }
            });

        match outcome {
            Ok(Some(value)) => {
                parsed.push(value);
                stats.imported += 1;
            }
            Ok(None) => stats.skipped += 1,
            Err(message) => {
                stats.errors += 1;
                if !skip_errors {
                    return Err(ImportError::Row { row, message });
                }
                tracing::warn!(row, "skipping row: {}", message);
            }
        }
    }

    Ok((parsed, stats))
}

fn optional_number(
    columns: &Columns,
    record: &StringRecord,
    aliases: &[&str],
    label: &str,
) -> Result<Option<f64>, String> {
    match columns.get(record, aliases) {
        Some(raw) => parse_number(&raw)
            .map(Some)
            .ok_or_else(|| format!("invalid {} '{}'", label, raw)),
        None => Ok(None),
    }
}

/// Parse BOQ line items from CSV
pub fn parse_items<R: Read>(
    input: R,
    skip_errors: bool,
) -> Result<(Vec<BoqItem>, ImportStats), ImportError> {
    parse_rows(input, skip_errors, &[DESCRIPTION, QUANTITY], |columns, record| {
        let description = columns
            .get(record, DESCRIPTION)
            .ok_or_else(|| "missing description".to_string())?;
        let quantity = optional_number(columns, record, QUANTITY, "quantity")?
            .ok_or_else(|| "missing quantity".to_string())?;
        let unit = columns.get(record, UNIT).unwrap_or_default();

        let mut item = BoqItem::new(description, quantity, unit);
        item.item_no = columns.get(record, ITEM_NO);
        if let Some(rate) = optional_number(columns, record, RATE, "rate")? {
            item = item.with_price(rate);
        }
        item.declared_amount = optional_number(columns, record, AMOUNT, "amount")?;
        item.category = columns.get(record, CATEGORY);
        item.specifications = columns.get(record, SPECIFICATIONS);
        item.notes = columns.get(record, NOTES);
        Ok(item)
    })
}

/// Parse catalog entries from CSV
pub fn parse_catalog<R: Read>(
    input: R,
    author: &str,
    skip_errors: bool,
) -> Result<(Vec<CatalogItem>, ImportStats), ImportError> {
    parse_rows(input, skip_errors, &[CODE, NAME], |columns, record| {
        let code = columns
            .get(record, CODE)
            .ok_or_else(|| "missing code".to_string())?;
        let name = columns
            .get(record, NAME)
            .ok_or_else(|| "missing name".to_string())?;
        let unit = columns.get(record, UNIT).unwrap_or_else(|| "nos".to_string());

        let mut item = CatalogItem::new(code, name, unit, author.to_string());
        item.unit_price = optional_number(columns, record, RATE, "unit price")?;
        item.description = columns.get(record, DESCRIPTION);
        item.category = columns.get(record, CATEGORY);
        item.keywords = columns
            .get(record, KEYWORDS)
            .map(|raw| {
                raw.split([',', ';'])
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(item)
    })
}

/// Write a BOQ's line items as CSV; the output re-imports with `parse_items`
pub fn write_items<W: Write>(output: W, boq: &Boq) -> Result<(), ImportError> {
    let mut wtr = WriterBuilder::new().from_writer(output);
    wtr.write_record([
        "item_no",
        "description",
        "quantity",
        "unit",
        "rate",
        "amount",
        "category",
        "mapping_status",
        "catalog_item_id",
    ])?;

    for item in &boq.items {
        wtr.write_record([
            item.item_no.clone().unwrap_or_default(),
            item.description.clone(),
            item.quantity.to_string(),
            item.unit.clone(),
            item.estimated_unit_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            item.computed_amount().to_string(),
            item.category.clone().unwrap_or_default(),
            item.mapping_status.to_string(),
            item.catalog_item_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_with_aliases() {
        let csv = "\
Sl No,Description,UOM,Qty,Price,Amount
1.0,Excavation and Earthwork,m3,500,450,\"2,25,000\"
2.0,Steel Reinforcement (Fe500),kg,\"25,000\",75,1875000
,,,,,
";
        let (items, stats) = parse_items(csv.as_bytes(), false).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(stats.imported, 2);
        assert_eq!(stats.skipped, 1);

        assert_eq!(items[0].item_no.as_deref(), Some("1.0"));
        assert_eq!(items[0].unit, "m3");
        assert_eq!(items[0].estimated_unit_price, Some(450.0));
        assert_eq!(items[0].declared_amount, Some(225000.0));
        assert_eq!(items[1].quantity, 25000.0);
        assert_eq!(items[1].estimated_amount, 1875000.0);
    }

    #[test]
    fn test_item_column_is_the_item_number() {
        let csv = "\
Item,Description,Unit,Quantity,Rate
1.0,Commercial Gas Range,nos,2,85000
1.1,Exhaust Hood SS304,nos,1,90000
";
        let (items, _) = parse_items(csv.as_bytes(), false).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_no.as_deref(), Some("1.0"));
        assert_eq!(items[0].description, "Commercial Gas Range");
        assert_eq!(items[1].item_no.as_deref(), Some("1.1"));
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let csv = "description,unit\nHood,nos\n";
        let err = parse_items(csv.as_bytes(), false).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn("quantity")));
    }

    #[test]
    fn test_bad_row_stops_or_is_skipped() {
        let csv = "description,quantity,unit\nHood,two,nos\nSink,1,nos\n";

        let err = parse_items(csv.as_bytes(), false).unwrap_err();
        assert!(matches!(err, ImportError::Row { row: 2, .. }));

        let (items, stats) = parse_items(csv.as_bytes(), true).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(items[0].description, "Sink");
    }

    #[test]
    fn test_parse_catalog() {
        let csv = "code,name,unit,unit_price,keywords\nRCC-M25,RCC M25 Grade Concrete,m3,6500,concrete;rcc\nELE-WIR,Electrical Wiring,,,\n";
        let (items, _) = parse_catalog(csv.as_bytes(), "importer", false).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unit_price, Some(6500.0));
        assert_eq!(items[0].keywords, vec!["concrete", "rcc"]);
        assert_eq!(items[1].unit, "nos");
        assert_eq!(items[1].author, "importer");
    }

    #[test]
    fn test_export_reimports() {
        let mut boq = Boq::new("BOQ-2025-001", "Kitchen", "test".to_string());
        boq.add_item(BoqItem::new("Exhaust Hood, SS304", 2.0, "nos").with_price(90000.0));
        boq.add_item(BoqItem::new("Plumbing Works", 1.0, "lot"));

        let mut out = Vec::new();
        write_items(&mut out, &boq).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("item_no,description,quantity,unit,rate,amount"));
        assert!(text.contains("\"Exhaust Hood, SS304\""));

        let (items, _) = parse_items(text.as_bytes(), false).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "Exhaust Hood, SS304");
        assert_eq!(items[0].declared_amount, Some(180000.0));
        assert_eq!(items[1].estimated_unit_price, None);
    }
}
