//! BOQ validation rules, issue reporting and scoring
//!
//! A BOQ is checked against a fixed checklist (required fields, quantity
//! bounds, unit allow-list, prices, duplicates, declared amounts). Each check
//! produces an error or a warning; the report status and the 0-100 score are
//! derived from those.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::entities::boq::{Boq, MappingStatus};

/// Tolerance when comparing a declared amount with quantity x price
const AMOUNT_TOLERANCE: f64 = 0.01;

/// Configurable thresholds for the checklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Units accepted without a warning (compared case-insensitively)
    pub allowed_units: Vec<String>,

    /// Quantities must be strictly greater than this
    pub min_quantity: f64,

    /// Quantities above this raise a warning
    pub max_quantity: f64,

    /// Missing price is an error instead of a warning
    pub require_price: bool,

    /// Descriptions shorter than this raise a warning
    pub min_description_length: usize,

    /// Warn about lines that are not mapped to the catalog
    pub warn_unmapped: bool,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            allowed_units: [
                "nos", "no", "pcs", "each", "pair", "set", "lot", "ls", "job", "m", "rmt", "rft",
                "m2", "sqm", "sqft", "m3", "cum", "kg", "ton", "mt", "l", "ltr", "hr", "day",
                "month", "box", "roll", "bag",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_quantity: 0.0,
            max_quantity: 1_000_000.0,
            require_price: false,
            min_description_length: 3,
            warn_unmapped: false,
        }
    }
}

impl ValidationRules {
    pub fn is_allowed_unit(&self, unit: &str) -> bool {
        let unit = unit.trim();
        self.allowed_units
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(unit))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Machine-readable issue kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    MissingTitle,
    MissingCustomer,
    EmptyBoq,
    MissingDescription,
    MissingUnit,
    InvalidQuantity,
    QuantityOutOfRange,
    UnknownUnit,
    NegativePrice,
    MissingPrice,
    ShortDescription,
    DuplicateDescription,
    AmountMismatch,
    UnmappedItem,
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueCode::MissingTitle => "missing_title",
            IssueCode::MissingCustomer => "missing_customer",
            IssueCode::EmptyBoq => "empty_boq",
            IssueCode::MissingDescription => "missing_description",
            IssueCode::MissingUnit => "missing_unit",
            IssueCode::InvalidQuantity => "invalid_quantity",
            IssueCode::QuantityOutOfRange => "quantity_out_of_range",
            IssueCode::UnknownUnit => "unknown_unit",
            IssueCode::NegativePrice => "negative_price",
            IssueCode::MissingPrice => "missing_price",
            IssueCode::ShortDescription => "short_description",
            IssueCode::DuplicateDescription => "duplicate_description",
            IssueCode::AmountMismatch => "amount_mismatch",
            IssueCode::UnmappedItem => "unmapped_item",
        };
        write!(f, "{}", s)
    }
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    /// Line id; `None` for header-level issues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// 1-based line number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

/// Overall outcome of a validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Warnings,
    Failed,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationStatus::Passed => write!(f, "passed"),
            ValidationStatus::Warnings => write!(f, "warnings"),
            ValidationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Stored result of validating a BOQ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    /// 0..=100, one decimal
    pub score: f64,
    pub error_count: usize,
    pub warning_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
    pub validated_at: DateTime<Utc>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

/// Runs the checklist against a BOQ
pub struct BoqValidator<'a> {
    rules: &'a ValidationRules,
}

impl<'a> BoqValidator<'a> {
    pub fn new(rules: &'a ValidationRules) -> Self {
        Self { rules }
    }

    pub fn validate(&self, boq: &Boq) -> ValidationReport {
        let mut issues = Vec::new();

        self.check_header(boq, &mut issues);

        if boq.items.is_empty() {
            issues.push(header_issue(
                Severity::Error,
                IssueCode::EmptyBoq,
                None,
                "BOQ has no line items",
            ));
        }

        // Normalized description -> first line number that used it
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (index, item) in boq.items.iter().enumerate() {
            let line = index + 1;
            let mut push = |severity, code, field: &str, message: String| {
                issues.push(ValidationIssue {
                    severity,
                    code,
                    item_id: Some(item.id.clone()),
                    line: Some(line),
                    field: Some(field.to_string()),
                    message,
                });
            };

            let description = item.description.trim();
            if description.is_empty() {
                push(
                    Severity::Error,
                    IssueCode::MissingDescription,
                    "description",
                    "description is required".to_string(),
                );
            } else if description.chars().count() < self.rules.min_description_length {
                push(
                    Severity::Warning,
                    IssueCode::ShortDescription,
                    "description",
                    format!(
                        "description '{}' is shorter than {} characters",
                        description, self.rules.min_description_length
                    ),
                );
            }

            let unit = item.unit.trim();
            if unit.is_empty() {
                push(
                    Severity::Error,
                    IssueCode::MissingUnit,
                    "unit",
                    "unit is required".to_string(),
                );
            } else if !self.rules.is_allowed_unit(unit) {
                push(
                    Severity::Warning,
                    IssueCode::UnknownUnit,
                    "unit",
                    format!("unit '{}' is not in the allowed unit list", unit),
                );
            }

            if !item.quantity.is_finite() || item.quantity <= self.rules.min_quantity {
                push(
                    Severity::Error,
                    IssueCode::InvalidQuantity,
                    "quantity",
                    format!(
                        "quantity {} must be greater than {}",
                        item.quantity, self.rules.min_quantity
                    ),
                );
            } else if item.quantity > self.rules.max_quantity {
                push(
                    Severity::Warning,
                    IssueCode::QuantityOutOfRange,
                    "quantity",
                    format!(
                        "quantity {} exceeds the expected maximum of {}",
                        item.quantity, self.rules.max_quantity
                    ),
                );
            }

            match item.estimated_unit_price {
                Some(price) if !price.is_finite() || price < 0.0 => push(
                    Severity::Error,
                    IssueCode::NegativePrice,
                    "estimated_unit_price",
                    format!("estimated unit price {} must not be negative", price),
                ),
                Some(_) => {}
                None => {
                    let severity = if self.rules.require_price {
                        Severity::Error
                    } else {
                        Severity::Warning
                    };
                    push(
                        severity,
                        IssueCode::MissingPrice,
                        "estimated_unit_price",
                        "no estimated unit price".to_string(),
                    );
                }
            }

            if let Some(declared) = item.declared_amount {
                let computed = item.computed_amount();
                if (declared - computed).abs() > AMOUNT_TOLERANCE {
                    push(
                        Severity::Warning,
                        IssueCode::AmountMismatch,
                        "declared_amount",
                        format!(
                            "declared amount {:.2} does not match quantity x rate = {:.2}",
                            declared, computed
                        ),
                    );
                }
            }

            if self.rules.warn_unmapped && item.mapping_status == MappingStatus::Unmapped {
                push(
                    Severity::Warning,
                    IssueCode::UnmappedItem,
                    "mapping_status",
                    "line is not mapped to a catalog item".to_string(),
                );
            }

            if !description.is_empty() {
                let key = description.to_lowercase();
                if let Some(first) = seen.get(&key) {
                    push(
                        Severity::Warning,
                        IssueCode::DuplicateDescription,
                        "description",
                        format!("duplicate of line {}", first),
                    );
                } else {
                    seen.insert(key, line);
                }
            }
        }

        build_report(boq.items.len(), issues)
    }

    fn check_header(&self, boq: &Boq, issues: &mut Vec<ValidationIssue>) {
        if boq.title.trim().is_empty() {
            issues.push(header_issue(
                Severity::Error,
                IssueCode::MissingTitle,
                Some("title"),
                "title is required",
            ));
        }

        let has_customer = [&boq.customer_id, &boq.customer_name]
            .iter()
            .any(|c| c.as_deref().is_some_and(|s| !s.trim().is_empty()));
        if !has_customer {
            issues.push(header_issue(
                Severity::Warning,
                IssueCode::MissingCustomer,
                Some("customer"),
                "no customer reference",
            ));
        }
    }
}

fn header_issue(
    severity: Severity,
    code: IssueCode,
    field: Option<&str>,
    message: &str,
) -> ValidationIssue {
    ValidationIssue {
        severity,
        code,
        item_id: None,
        line: None,
        field: field.map(String::from),
        message: message.to_string(),
    }
}

fn build_report(item_count: usize, issues: Vec<ValidationIssue>) -> ValidationReport {
    let error_count = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    let status = if error_count > 0 {
        ValidationStatus::Failed
    } else if warning_count > 0 {
        ValidationStatus::Warnings
    } else {
        ValidationStatus::Passed
    };

    ValidationReport {
        status,
        score: compute_score(item_count, &issues),
        error_count,
        warning_count,
        issues,
        validated_at: Utc::now(),
    }
}

/// Score over units = items + header. Units with errors count as failed,
/// units with only warnings count half. Empty BOQs score 0.
fn compute_score(item_count: usize, issues: &[ValidationIssue]) -> f64 {
    if item_count == 0 {
        return 0.0;
    }

    // None stands for the header unit
    let mut failed: HashSet<Option<usize>> = HashSet::new();
    let mut warned: HashSet<Option<usize>> = HashSet::new();
    for issue in issues {
        match issue.severity {
            Severity::Error => {
                failed.insert(issue.line);
            }
            Severity::Warning => {
                warned.insert(issue.line);
            }
        }
    }
    let warned_only = warned.difference(&failed).count();

    let units = (item_count + 1) as f64;
    let raw = 100.0 * (units - failed.len() as f64 - 0.5 * warned_only as f64) / units;
    (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::boq::BoqItem;

    fn clean_boq() -> Boq {
        let mut boq = Boq::new("BOQ-2025-001", "Cold Room", "test".to_string());
        boq.customer_name = Some("BigBasket".to_string());
        boq.add_item(BoqItem::new("Insulated PUF Panels", 320.0, "m2").with_price(2100.0));
        boq.add_item(BoqItem::new("Condensing Unit", 2.0, "nos").with_price(185000.0));
        boq
    }

    fn codes(report: &ValidationReport) -> Vec<IssueCode> {
        report.issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn test_clean_boq_passes_with_full_score() {
        let rules = ValidationRules::default();
        let report = BoqValidator::new(&rules).validate(&clean_boq());
        assert_eq!(report.status, ValidationStatus::Passed);
        assert_eq!(report.score, 100.0);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_empty_boq_fails_with_zero_score() {
        let rules = ValidationRules::default();
        let mut boq = clean_boq();
        boq.items.clear();
        let report = BoqValidator::new(&rules).validate(&boq);
        assert_eq!(report.status, ValidationStatus::Failed);
        assert_eq!(report.score, 0.0);
        assert_eq!(codes(&report), vec![IssueCode::EmptyBoq]);
    }

    #[test]
    fn test_warnings_only_yield_warnings_status() {
        let rules = ValidationRules::default();
        let mut boq = clean_boq();
        boq.add_item(BoqItem::new("Electrical Wiring", 1.0, "lot"));
        let report = BoqValidator::new(&rules).validate(&boq);

        assert_eq!(report.status, ValidationStatus::Warnings);
        assert_eq!(codes(&report), vec![IssueCode::MissingPrice]);
        // 4 units, one warned: 100 * 3.5 / 4
        assert_eq!(report.score, 87.5);
    }

    #[test]
    fn test_errors_fail_the_report() {
        let rules = ValidationRules::default();
        let mut boq = clean_boq();
        boq.add_item(BoqItem::new("", 0.0, "").with_price(-5.0));
        let report = BoqValidator::new(&rules).validate(&boq);

        assert_eq!(report.status, ValidationStatus::Failed);
        assert!(report.has_errors());
        let found = codes(&report);
        assert!(found.contains(&IssueCode::MissingDescription));
        assert!(found.contains(&IssueCode::MissingUnit));
        assert!(found.contains(&IssueCode::InvalidQuantity));
        assert!(found.contains(&IssueCode::NegativePrice));
        assert_eq!(report.errors().count(), 4);
        // 4 units, one failed: 75%
        assert_eq!(report.score, 75.0);
    }

    #[test]
    fn test_duplicates_are_case_insensitive() {
        let rules = ValidationRules::default();
        let mut boq = clean_boq();
        boq.add_item(BoqItem::new("  insulated puf PANELS ", 10.0, "m2").with_price(2100.0));
        let report = BoqValidator::new(&rules).validate(&boq);

        let dup: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::DuplicateDescription)
            .collect();
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].line, Some(3));
        assert!(dup[0].message.contains("line 1"));
    }

    #[test]
    fn test_unit_allow_list_and_quantity_bounds() {
        let rules = ValidationRules::default();
        let mut boq = clean_boq();
        boq.add_item(BoqItem::new("Gravel fill", 2_000_000.0, "Truckload").with_price(1.0));
        let report = BoqValidator::new(&rules).validate(&boq);
        let found = codes(&report);
        assert!(found.contains(&IssueCode::UnknownUnit));
        assert!(found.contains(&IssueCode::QuantityOutOfRange));
        assert!(rules.is_allowed_unit(" M3 "));
    }

    #[test]
    fn test_require_price_escalates_missing_price() {
        let rules = ValidationRules {
            require_price: true,
            ..Default::default()
        };
        let mut boq = clean_boq();
        boq.add_item(BoqItem::new("Plumbing Works", 1.0, "lot"));
        let report = BoqValidator::new(&rules).validate(&boq);
        assert_eq!(report.status, ValidationStatus::Failed);
    }

    #[test]
    fn test_declared_amount_mismatch() {
        let rules = ValidationRules::default();
        let mut boq = clean_boq();
        let mut item = BoqItem::new("Brick Masonry Work", 400.0, "m3").with_price(6500.0);
        item.declared_amount = Some(2_500_000.0);
        boq.add_item(item);
        let report = BoqValidator::new(&rules).validate(&boq);
        assert_eq!(codes(&report), vec![IssueCode::AmountMismatch]);
    }

    #[test]
    fn test_missing_title_is_header_error() {
        let rules = ValidationRules::default();
        let mut boq = clean_boq();
        boq.title = "  ".to_string();
        boq.customer_name = None;
        let report = BoqValidator::new(&rules).validate(&boq);
        assert_eq!(report.status, ValidationStatus::Failed);
        assert!(report.issues.iter().all(|i| i.line.is_none()));
        // header has an error and a warning; counts once as failed: 100 * 2 / 3
        assert_eq!(report.score, 66.7);
    }

    #[test]
    fn test_warn_unmapped() {
        let rules = ValidationRules {
            warn_unmapped: true,
            ..Default::default()
        };
        let report = BoqValidator::new(&rules).validate(&clean_boq());
        assert_eq!(report.warning_count, 2);
        assert!(report
            .warnings()
            .all(|w| w.code == IssueCode::UnmappedItem));
    }
}
