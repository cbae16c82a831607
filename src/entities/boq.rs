//! BOQ entity type - Bills of quantities with line items, totals and mapping state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::core::entity::{Entity, Status};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::validation::ValidationReport;
use crate::entities::catalog::CatalogItem;

/// Association state between a free-text line item and the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    #[default]
    Unmapped,
    Suggested,
    Confirmed,
    Custom,
}

impl MappingStatus {
    /// Whether a suggestion run may change an item in this state.
    /// Confirmed and custom mappings are only changed by hand.
    pub fn accepts_suggestions(&self) -> bool {
        matches!(self, MappingStatus::Unmapped | MappingStatus::Suggested)
    }
}

impl std::fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingStatus::Unmapped => write!(f, "unmapped"),
            MappingStatus::Suggested => write!(f, "suggested"),
            MappingStatus::Confirmed => write!(f, "confirmed"),
            MappingStatus::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for MappingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unmapped" => Ok(MappingStatus::Unmapped),
            "suggested" => Ok(MappingStatus::Suggested),
            "confirmed" => Ok(MappingStatus::Confirmed),
            "custom" => Ok(MappingStatus::Custom),
            _ => Err(format!(
                "Invalid mapping status: {}. Use unmapped, suggested, confirmed, or custom",
                s
            )),
        }
    }
}

/// Clamp a confidence value into 0..=100 (non-finite values become 0)
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// A candidate catalog item for a line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestion {
    pub catalog_item_id: EntityId,
    pub catalog_code: String,
    pub name: String,
    /// Match confidence, 0..=100
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl MappingSuggestion {
    pub fn new(catalog: &CatalogItem, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            catalog_item_id: catalog.id.clone(),
            catalog_code: catalog.code.clone(),
            name: catalog.name.clone(),
            confidence: clamp_confidence(confidence),
            reason: reason.into(),
        }
    }
}

/// A single BOQ line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoqItem {
    /// Line identifier, stable across versions
    pub id: String,

    /// Human item number from the source sheet (e.g. "1.0", "2.3")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_no: Option<String>,

    pub description: String,

    pub quantity: f64,

    pub unit: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_unit_price: Option<f64>,

    /// quantity x estimated_unit_price, kept in sync by the owning BOQ
    #[serde(default)]
    pub estimated_amount: f64,

    /// Amount as stated in an imported sheet, checked against the computed amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifications: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default)]
    pub mapping_status: MappingStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_item_id: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_confidence: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<MappingSuggestion>,
}

impl BoqItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            item_no: None,
            description: description.into(),
            quantity,
            unit: unit.into(),
            estimated_unit_price: None,
            estimated_amount: 0.0,
            declared_amount: None,
            category: None,
            specifications: None,
            notes: None,
            mapping_status: MappingStatus::Unmapped,
            catalog_item_id: None,
            mapping_confidence: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.estimated_unit_price = Some(price);
        self.refresh_amount();
        self
    }

    /// Computed amount; a missing price counts as zero
    pub fn computed_amount(&self) -> f64 {
        let amount = self.quantity * self.estimated_unit_price.unwrap_or(0.0);
        if amount.is_finite() {
            amount
        } else {
            0.0
        }
    }

    fn refresh_amount(&mut self) {
        self.estimated_amount = self.computed_amount();
    }

    /// Record suggestions from an automatic run.
    ///
    /// Returns `true` when the item changed. Confirmed and custom items are
    /// left alone, and an empty run never downgrades a suggested item.
    pub fn apply_suggestions(&mut self, suggestions: Vec<MappingSuggestion>) -> bool {
        if !self.mapping_status.accepts_suggestions() {
            return false;
        }
        let Some(best) = suggestions.first().cloned() else {
            return false;
        };

        self.mapping_status = MappingStatus::Suggested;
        self.catalog_item_id = Some(best.catalog_item_id);
        self.mapping_confidence = Some(clamp_confidence(best.confidence));
        self.suggestions = suggestions;
        true
    }

    /// Manually confirm a catalog item for this line
    pub fn confirm_mapping(&mut self, catalog: &CatalogItem) {
        let confidence = self
            .suggestions
            .iter()
            .find(|s| s.catalog_item_id == catalog.id)
            .map(|s| s.confidence)
            .unwrap_or(100.0);

        self.mapping_status = MappingStatus::Confirmed;
        self.catalog_item_id = Some(catalog.id.clone());
        self.mapping_confidence = Some(clamp_confidence(confidence));
        if self.estimated_unit_price.is_none() {
            self.estimated_unit_price = catalog.unit_price;
        }
        self.refresh_amount();
    }

    /// Manually mark the line as a custom (non-catalog) item
    pub fn mark_custom(&mut self) {
        self.mapping_status = MappingStatus::Custom;
        self.catalog_item_id = None;
        self.mapping_confidence = None;
    }

    /// Manually clear any mapping
    pub fn reset_mapping(&mut self) {
        self.mapping_status = MappingStatus::Unmapped;
        self.catalog_item_id = None;
        self.mapping_confidence = None;
        self.suggestions.clear();
    }
}

/// Field changes for an existing line; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub item_no: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub estimated_unit_price: Option<f64>,
    pub category: Option<String>,
    pub specifications: Option<String>,
    pub notes: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.item_no.is_none()
            && self.description.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
            && self.estimated_unit_price.is_none()
            && self.category.is_none()
            && self.specifications.is_none()
            && self.notes.is_none()
    }
}

/// Aggregates over the item list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoqTotals {
    pub total_items: usize,
    pub total_quantity: f64,
    pub estimated_total_value: f64,
}

impl BoqTotals {
    pub fn from_items(items: &[BoqItem]) -> Self {
        Self {
            total_items: items.len(),
            total_quantity: items
                .iter()
                .map(|i| i.quantity)
                .filter(|q| q.is_finite())
                .sum(),
            estimated_total_value: items.iter().map(BoqItem::computed_amount).sum(),
        }
    }
}

/// A bill of quantities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boq {
    pub id: EntityId,

    /// Human number shared by every version, e.g. "BOQ-2025-001"
    pub boq_number: String,

    pub title: String,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version_id: Option<EntityId>,

    #[serde(default)]
    pub status: Status,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rfp_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub items: Vec<BoqItem>,

    #[serde(default)]
    pub totals: BoqTotals,

    /// Report from the most recent validation; cleared by any edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub created: DateTime<Utc>,

    pub updated: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

fn default_version() -> u32 {
    1
}

fn default_revision() -> u32 {
    1
}

pub(crate) fn default_currency() -> String {
    "INR".to_string()
}

impl Entity for Boq {
    const PREFIX: &'static str = "BOQ";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> &str {
        match self.status {
            Status::Draft => "draft",
            Status::Validated => "validated",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Boq {
    pub fn new(boq_number: impl Into<String>, title: impl Into<String>, author: String) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Boq),
            boq_number: boq_number.into(),
            title: title.into(),
            version: 1,
            previous_version_id: None,
            status: Status::Draft,
            customer_id: None,
            customer_name: None,
            rfp_id: None,
            project_id: None,
            currency: default_currency(),
            items: Vec::new(),
            totals: BoqTotals::default(),
            validation: None,
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            notes: None,
            tags: Vec::new(),
            created: now,
            updated: now,
            author,
            entity_revision: 1,
        }
    }

    /// Recompute derived amounts and header totals from the item list
    pub fn recalculate_totals(&mut self) {
        for item in &mut self.items {
            item.refresh_amount();
        }
        self.totals = BoqTotals::from_items(&self.items);
    }

    /// Bookkeeping after any mutation: totals, timestamp, stale validation
    pub fn touch(&mut self) {
        self.recalculate_totals();
        self.updated = Utc::now();
        self.validation = None;
        if self.status == Status::Validated {
            self.status = Status::Draft;
        }
    }

    /// Append a line, numbering it when the caller gave no item number
    pub fn add_item(&mut self, mut item: BoqItem) -> &BoqItem {
        if item.item_no.is_none() {
            item.item_no = Some(format!("{}.0", self.items.len() + 1));
        }
        self.items.push(item);
        self.touch();
        let last = self.items.len() - 1;
        &self.items[last]
    }

    pub fn update_item(&mut self, index: usize, patch: ItemPatch) -> Option<&BoqItem> {
        let item = self.items.get_mut(index)?;
        if let Some(item_no) = patch.item_no {
            item.item_no = Some(item_no);
        }
        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(quantity) = patch.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            item.unit = unit;
        }
        if let Some(price) = patch.estimated_unit_price {
            item.estimated_unit_price = Some(price);
        }
        if let Some(category) = patch.category {
            item.category = Some(category);
        }
        if let Some(specifications) = patch.specifications {
            item.specifications = Some(specifications);
        }
        if let Some(notes) = patch.notes {
            item.notes = Some(notes);
        }
        self.touch();
        self.items.get(index)
    }

    pub fn remove_item(&mut self, index: usize) -> Option<BoqItem> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.touch();
        Some(removed)
    }

    /// Locate a line by 1-based line number, exact id, or unique id prefix
    pub fn find_item_index(&self, reference: &str) -> Option<usize> {
        let reference = reference.trim();
        if !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit()) {
            let line: usize = reference.parse().ok()?;
            return (line >= 1 && line <= self.items.len()).then(|| line - 1);
        }

        if let Some(pos) = self
            .items
            .iter()
            .position(|i| i.id.eq_ignore_ascii_case(reference))
        {
            return Some(pos);
        }

        let upper = reference.to_uppercase();
        let matches: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.id.starts_with(&upper))
            .map(|(pos, _)| pos)
            .collect();
        match matches.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Clone into the next version of the chain.
    ///
    /// The copy gets a fresh id, `version + 1`, a back-reference to this BOQ
    /// and starts as a draft with no validation or approval.
    pub fn create_new_version(&self, author: String) -> Boq {
        let now = Utc::now();
        let mut next = self.clone();
        next.id = EntityId::new(EntityPrefix::Boq);
        next.version = self.version + 1;
        next.previous_version_id = Some(self.id.clone());
        next.status = Status::Draft;
        next.validation = None;
        next.rejection_reason = None;
        next.approved_by = None;
        next.approved_at = None;
        next.created = now;
        next.updated = now;
        next.author = author;
        next.entity_revision = 1;
        next.recalculate_totals();
        next
    }

    /// Count of lines per mapping status: (unmapped, suggested, confirmed, custom)
    pub fn mapping_counts(&self) -> (usize, usize, usize, usize) {
        self.items.iter().fold((0, 0, 0, 0), |mut acc, item| {
            match item.mapping_status {
                MappingStatus::Unmapped => acc.0 += 1,
                MappingStatus::Suggested => acc.1 += 1,
                MappingStatus::Confirmed => acc.2 += 1,
                MappingStatus::Custom => acc.3 += 1,
            }
            acc
        })
    }
}
