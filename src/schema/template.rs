//! Markdown reports rendered from embedded Tera templates

use rust_embed::Embed;
use serde::Serialize;
use tera::Tera;
use thiserror::Error;

use crate::core::validation::ValidationReport;
use crate::entities::boq::Boq;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const BOQ_REPORT: &str = "boq_report.md.tera";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),
}

#[derive(Serialize)]
struct ReportLine {
    item_no: String,
    description: String,
    quantity: String,
    unit: String,
    rate: String,
    amount: String,
    mapping: String,
}

#[derive(Serialize)]
struct ReportIssue {
    severity: String,
    code: String,
    location: String,
    message: String,
}

#[derive(Serialize)]
struct ReportSummary {
    status: String,
    score: String,
    error_count: usize,
    warning_count: usize,
    issues: Vec<ReportIssue>,
}

#[derive(Serialize)]
struct MappingCounts {
    unmapped: usize,
    suggested: usize,
    confirmed: usize,
    custom: usize,
}

/// Flat view of a BOQ; every key is present so templates never hit
/// undefined variables
#[derive(Serialize)]
struct BoqReportContext {
    id: String,
    number: String,
    version: u32,
    title: String,
    status: String,
    customer: String,
    rfp_id: Option<String>,
    project_id: Option<String>,
    currency: String,
    author: String,
    updated: String,
    previous_version_id: Option<String>,
    approved_by: Option<String>,
    approved_at: Option<String>,
    rejection_reason: Option<String>,
    notes: Option<String>,
    lines: Vec<ReportLine>,
    total_items: usize,
    total_quantity: String,
    total_value: String,
    mapping: MappingCounts,
    report: Option<ReportSummary>,
}

/// Format an amount with two decimals
pub fn format_money(value: f64) -> String {
    format!("{:.2}", value)
}

/// Format a quantity without trailing zeros
pub fn format_quantity(value: f64) -> String {
    let s = format!("{:.3}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn summarize(report: &ValidationReport) -> ReportSummary {
    ReportSummary {
        status: report.status.to_string(),
        score: format!("{:.1}", report.score),
        error_count: report.error_count,
        warning_count: report.warning_count,
        issues: report
            .issues
            .iter()
            .map(|i| ReportIssue {
                severity: i.severity.to_string(),
                code: i.code.to_string(),
                location: i.line.map(|l| format!("line {}: ", l)).unwrap_or_default(),
                message: i.message.clone(),
            })
            .collect(),
    }
}

impl BoqReportContext {
    fn from_boq(boq: &Boq) -> Self {
        let (unmapped, suggested, confirmed, custom) = boq.mapping_counts();
        let customer = boq
            .customer_name
            .clone()
            .or_else(|| boq.customer_id.clone())
            .unwrap_or_else(|| "-".to_string());

        Self {
            id: boq.id.to_string(),
            number: boq.boq_number.clone(),
            version: boq.version,
            title: boq.title.clone(),
            status: boq.status.to_string(),
            customer,
            rfp_id: boq.rfp_id.clone(),
            project_id: boq.project_id.clone(),
            currency: boq.currency.clone(),
            author: boq.author.clone(),
            updated: boq.updated.format("%Y-%m-%d %H:%M UTC").to_string(),
            previous_version_id: boq.previous_version_id.as_ref().map(|id| id.to_string()),
            approved_by: boq.approved_by.clone(),
            approved_at: boq
                .approved_at
                .map(|t| t.format("%Y-%m-%d").to_string()),
            rejection_reason: boq.rejection_reason.clone(),
            notes: boq.notes.clone(),
            lines: boq
                .items
                .iter()
                .map(|item| ReportLine {
                    item_no: item.item_no.clone().unwrap_or_default(),
                    description: item.description.replace('|', "\\|"),
                    quantity: format_quantity(item.quantity),
                    unit: item.unit.clone(),
                    rate: item
                        .estimated_unit_price
                        .map(format_money)
                        .unwrap_or_else(|| "-".to_string()),
                    amount: format_money(item.computed_amount()),
                    mapping: item.mapping_status.to_string(),
                })
                .collect(),
            total_items: boq.totals.total_items,
            total_quantity: format_quantity(boq.totals.total_quantity),
            total_value: format_money(boq.totals.estimated_total_value),
            mapping: MappingCounts {
                unmapped,
                suggested,
                confirmed,
                custom,
            },
            report: boq.validation.as_ref().map(summarize),
        }
    }
}

/// Renders reports from the embedded templates
pub struct ReportRenderer {
    tera: Tera,
}

impl ReportRenderer {
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                let source = std::str::from_utf8(&content.data)
                    .map_err(|e| TemplateError::RenderError(format!("{}: {}", filename, e)))?;
                tera.add_raw_template(filename, source)
                    .map_err(|e| TemplateError::RenderError(e.to_string()))?;
            }
        }

        Ok(Self { tera })
    }

    /// Markdown summary of a BOQ
    pub fn render_boq(&self, boq: &Boq) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == BOQ_REPORT) {
            return Err(TemplateError::NotFound(BOQ_REPORT.to_string()));
        }
        let context = tera::Context::from_serialize(BoqReportContext::from_boq(boq))
            .map_err(|e| TemplateError::RenderError(e.to_string()))?;
        self.tera
            .render(BOQ_REPORT, &context)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::{BoqValidator, ValidationRules};
    use crate::entities::boq::BoqItem;

    fn boq() -> Boq {
        let mut boq = Boq::new("BOQ-2025-007", "Hospital Kitchen", "estimator".to_string());
        boq.customer_id = Some("CUST-42".to_string());
        boq.add_item(BoqItem::new("Exhaust Hood", 2.0, "nos").with_price(90000.0));
        boq.add_item(BoqItem::new("Plumbing Works", 1.5, "lot"));
        boq
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_money(1875000.0), "1875000.00");
        assert_eq!(format_quantity(2.0), "2");
        assert_eq!(format_quantity(1.25), "1.25");
    }

    #[test]
    fn test_render_unvalidated_boq() {
        let out = ReportRenderer::new().unwrap().render_boq(&boq()).unwrap();
        assert!(out.starts_with("# BOQ-2025-007 v1: Hospital Kitchen"));
        assert!(out.contains("| Customer | CUST-42 |"));
        assert!(out.contains("| 1.0 | Exhaust Hood | 2 | nos | 90000.00 | 180000.00 | unmapped |"));
        assert!(out.contains("| 2.0 | Plumbing Works | 1.5 | lot | - | 0.00 | unmapped |"));
        assert!(out.contains("estimated value INR 180000.00"));
        assert!(out.contains("Not validated since the last change."));
        assert!(!out.contains("| RFP |"));
    }

    #[test]
    fn test_render_with_report() {
        let mut boq = boq();
        boq.validation = Some(BoqValidator::new(&ValidationRules::default()).validate(&boq));
        let out = ReportRenderer::new().unwrap().render_boq(&boq).unwrap();
        assert!(out.contains("**WARNINGS**"));
        assert!(out.contains("line 2: no estimated unit price (`missing_price`)"));
    }
}
