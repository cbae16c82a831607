//! BOQ service layer
//!
//! `BoqStore` owns every read-modify-write cycle over the project
//! directory: each operation loads the entity files it needs, applies the
//! entity/workflow rules and writes the result back.

use chrono::{Datelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Write};
use std::path::PathBuf;
use thiserror::Error;

use crate::core::config::Config;
use crate::core::entity::Status;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::import::{self, ImportError, ImportStats};
use crate::core::loader::{self, LoadError};
use crate::core::mapping::{CatalogMatcher, MappingConfig};
use crate::core::project::Project;
use crate::core::shortid::parse_entity_reference;
use crate::core::validation::{BoqValidator, ValidationReport, ValidationRules};
use crate::core::workflow::{BoqWorkflow, WorkflowError};
use crate::entities::boq::{Boq, BoqItem, ItemPatch};
use crate::entities::catalog::CatalogItem;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("BOQ with ID {0} not found")]
    NotFound(String),

    #[error("Catalog item {0} not found")]
    CatalogNotFound(String),

    #[error("Line item '{item}' not found in BOQ {boq}")]
    ItemNotFound { boq: String, item: String },

    #[error("Reference '{reference}' is ambiguous ({count} matches); use more characters")]
    Ambiguous { reference: String, count: usize },

    #[error("Catalog code {0} already exists")]
    DuplicateCode(String),

    #[error("BOQ {id} has already been superseded by {successor}")]
    Superseded { id: String, successor: String },

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Header fields for a new BOQ
#[derive(Debug, Clone, Default)]
pub struct NewBoq {
    pub title: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub rfp_id: Option<String>,
    pub project_id: Option<String>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub items: Vec<BoqItem>,
}

/// Header changes; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct BoqUpdate {
    pub title: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub rfp_id: Option<String>,
    pub project_id: Option<String>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl BoqUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.customer_id.is_none()
            && self.customer_name.is_none()
            && self.rfp_id.is_none()
            && self.project_id.is_none()
            && self.currency.is_none()
            && self.notes.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoqFilter {
    pub status: Option<Status>,
    /// Case-insensitive substring of customer name or id
    pub customer: Option<String>,
    /// Case-insensitive substring of title or BOQ number
    pub search: Option<String>,
    /// Hide BOQs that have a newer version
    pub latest_only: bool,
}

impl BoqFilter {
    fn matches(&self, boq: &Boq) -> bool {
        if self.status.is_some_and(|s| s != boq.status) {
            return false;
        }
        if let Some(ref customer) = self.customer {
            let needle = customer.to_lowercase();
            let hit = [&boq.customer_name, &boq.customer_id]
                .iter()
                .any(|c| c.as_deref().is_some_and(|c| c.to_lowercase().contains(&needle)));
            if !hit {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            if !boq.title.to_lowercase().contains(&needle)
                && !boq.boq_number.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Line counts per mapping status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingSummary {
    pub unmapped: usize,
    pub suggested: usize,
    pub confirmed: usize,
    pub custom: usize,
}

/// Aggregates over the current (latest) version of every BOQ
#[derive(Debug, Clone, Default, Serialize)]
pub struct BoqStatistics {
    /// Every BOQ file, superseded versions included
    pub total_versions: usize,
    pub total_boqs: usize,
    pub by_status: BTreeMap<String, usize>,
    pub total_items: usize,
    pub total_value: f64,
    /// Mean score of validated BOQs, if any
    pub average_score: Option<f64>,
    pub mapping: MappingSummary,
}

/// Service over the BOQ and catalog files of a project
pub struct BoqStore {
    project: Project,
    rules: ValidationRules,
    mapping: MappingConfig,
    author: String,
    currency: String,
}

impl BoqStore {
    pub fn new(project: Project, config: &Config) -> Self {
        Self {
            project,
            rules: config.validation_rules(),
            mapping: config.mapping_config(),
            author: config.author(),
            currency: config.currency(),
        }
    }

    /// Override the author recorded on new entities and versions
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub fn path_of(&self, id: &EntityId) -> PathBuf {
        self.project.entity_path(id)
    }

    // ----- persistence -----

    fn load_boqs(&self) -> Vec<Boq> {
        loader::load_all::<Boq>(&self.project, EntityPrefix::Boq)
            .into_iter()
            .map(|(_, boq)| boq)
            .collect()
    }

    fn write_new(&self, boq: &mut Boq) -> Result<(), StoreError> {
        boq.recalculate_totals();
        loader::write_file(&self.project.entity_path(&boq.id), boq)?;
        Ok(())
    }

    fn save(&self, boq: &mut Boq) -> Result<(), StoreError> {
        boq.recalculate_totals();
        boq.entity_revision += 1;
        loader::write_file(&self.project.entity_path(&boq.id), boq)?;
        Ok(())
    }

    fn successor_of<'a>(id: &EntityId, all: &'a [Boq]) -> Option<&'a Boq> {
        all.iter()
            .find(|b| b.previous_version_id.as_ref() == Some(id))
    }

    /// Only the head of a version chain may change
    fn ensure_head(&self, boq: &Boq) -> Result<(), StoreError> {
        let all = self.load_boqs();
        match Self::successor_of(&boq.id, &all) {
            Some(next) => Err(StoreError::Superseded {
                id: boq.id.to_string(),
                successor: next.id.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Unlocked and at the head of its chain
    pub fn ensure_modifiable(&self, boq: &Boq) -> Result<(), StoreError> {
        BoqWorkflow::ensure_editable(boq)?;
        self.ensure_head(boq)
    }

    fn is_superseded(&self, boq: &Boq) -> bool {
        matches!(self.ensure_head(boq), Err(StoreError::Superseded { .. }))
    }

    /// Next free number for the given year, e.g. "BOQ-2025-004"
    pub fn next_boq_number(&self, year: i32) -> String {
        let prefix = format!("BOQ-{}-", year);
        let max = self
            .load_boqs()
            .iter()
            .filter_map(|b| b.boq_number.strip_prefix(&prefix))
            .filter_map(|seq| seq.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{:03}", prefix, max + 1)
    }

    // ----- BOQ header operations -----

    pub fn create_boq(&self, new: NewBoq) -> Result<Boq, StoreError> {
        let number = self.next_boq_number(Utc::now().year());
        let mut boq = Boq::new(number, new.title, self.author.clone());
        boq.customer_id = new.customer_id;
        boq.customer_name = new.customer_name;
        boq.rfp_id = new.rfp_id;
        boq.project_id = new.project_id;
        boq.currency = new.currency.unwrap_or_else(|| self.currency.clone());
        boq.notes = new.notes;
        boq.tags = new.tags;
        for item in new.items {
            boq.add_item(item);
        }

        self.write_new(&mut boq)?;
        tracing::info!(id = %boq.id, number = %boq.boq_number, "created BOQ");
        Ok(boq)
    }

    pub fn find_all(&self, filter: &BoqFilter) -> Vec<Boq> {
        let all = self.load_boqs();
        let superseded: HashSet<&EntityId> = all
            .iter()
            .filter_map(|b| b.previous_version_id.as_ref())
            .collect();

        let mut found: Vec<Boq> = all
            .iter()
            .filter(|b| !filter.latest_only || !superseded.contains(&b.id))
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.boq_number
                .cmp(&b.boq_number)
                .then(a.version.cmp(&b.version))
        });
        found
    }

    /// Resolve a full id, short id (`@N`), partial id or BOQ number.
    /// A BOQ number resolves to its latest version.
    pub fn find_one(&self, reference: &str) -> Result<Boq, StoreError> {
        let reference = parse_entity_reference(reference.trim(), &self.project);

        if let Ok(id) = EntityId::parse(&reference) {
            if id.prefix() == EntityPrefix::Boq {
                let path = self.project.entity_path(&id);
                if path.exists() {
                    return Ok(loader::load_file(&path)?);
                }
                return Err(StoreError::NotFound(reference));
            }
        }

        let by_number = self
            .load_boqs()
            .into_iter()
            .filter(|b| b.boq_number.eq_ignore_ascii_case(&reference))
            .max_by_key(|b| b.version);
        if let Some(boq) = by_number {
            return Ok(boq);
        }

        let partial = if reference.to_uppercase().starts_with("BOQ-") {
            reference.clone()
        } else {
            format!("BOQ-{}", reference)
        };
        let matches = loader::find_entity_files(&self.project, EntityPrefix::Boq, &partial);
        match matches.as_slice() {
            [] => Err(StoreError::NotFound(reference)),
            [path] => Ok(loader::load_file(path)?),
            _ => Err(StoreError::Ambiguous {
                reference,
                count: matches.len(),
            }),
        }
    }

    pub fn update_header(&self, reference: &str, update: BoqUpdate) -> Result<Boq, StoreError> {
        if update.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        let mut boq = self.find_one(reference)?;
        self.ensure_modifiable(&boq)?;

        if let Some(title) = update.title {
            boq.title = title;
        }
        if let Some(customer_id) = update.customer_id {
            boq.customer_id = Some(customer_id);
        }
        if let Some(customer_name) = update.customer_name {
            boq.customer_name = Some(customer_name);
        }
        if let Some(rfp_id) = update.rfp_id {
            boq.rfp_id = Some(rfp_id);
        }
        if let Some(project_id) = update.project_id {
            boq.project_id = Some(project_id);
        }
        if let Some(currency) = update.currency {
            boq.currency = currency;
        }
        if let Some(notes) = update.notes {
            boq.notes = Some(notes);
        }
        if let Some(tags) = update.tags {
            boq.tags = tags;
        }
        boq.touch();

        self.save(&mut boq)?;
        Ok(boq)
    }

    /// Delete a BOQ file. Versions with a successor stay, so chains never
    /// point at a missing file.
    pub fn delete_boq(&self, reference: &str) -> Result<Boq, StoreError> {
        let boq = self.find_one(reference)?;
        self.ensure_head(&boq)?;
        std::fs::remove_file(self.project.entity_path(&boq.id))?;
        tracing::info!(id = %boq.id, "deleted BOQ");
        Ok(boq)
    }

    // ----- line items -----

    fn item_index(boq: &Boq, item_ref: &str) -> Result<usize, StoreError> {
        boq.find_item_index(item_ref)
            .ok_or_else(|| StoreError::ItemNotFound {
                boq: boq.id.to_string(),
                item: item_ref.to_string(),
            })
    }

    fn edit<F, T>(&self, reference: &str, f: F) -> Result<(Boq, T), StoreError>
    where
        F: FnOnce(&mut Boq) -> Result<T, StoreError>,
    {
        let mut boq = self.find_one(reference)?;
        self.ensure_modifiable(&boq)?;
        let out = f(&mut boq)?;
        self.save(&mut boq)?;
        Ok((boq, out))
    }

    /// Append a line; returns the BOQ and the new line's index
    pub fn add_item(&self, reference: &str, item: BoqItem) -> Result<(Boq, usize), StoreError> {
        self.edit(reference, |boq| {
            boq.add_item(item);
            Ok(boq.items.len() - 1)
        })
    }

    pub fn update_item(
        &self,
        reference: &str,
        item_ref: &str,
        patch: ItemPatch,
    ) -> Result<Boq, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        self.edit(reference, |boq| {
            let index = Self::item_index(boq, item_ref)?;
            boq.update_item(index, patch);
            Ok(())
        })
        .map(|(boq, _)| boq)
    }

    pub fn remove_item(&self, reference: &str, item_ref: &str) -> Result<(Boq, BoqItem), StoreError> {
        self.edit(reference, |boq| {
            let index = Self::item_index(boq, item_ref)?;
            boq.remove_item(index)
                .ok_or_else(|| StoreError::ItemNotFound {
                    boq: boq.id.to_string(),
                    item: item_ref.to_string(),
                })
        })
    }

    // ----- validation and workflow -----

    pub fn run_validation(&self, boq: &Boq) -> ValidationReport {
        BoqValidator::new(&self.rules).validate(boq)
    }

    /// Validate and store the report. Locked and superseded BOQs are checked
    /// but not rewritten.
    pub fn validate(&self, reference: &str) -> Result<(Boq, ValidationReport), StoreError> {
        let mut boq = self.find_one(reference)?;
        let report = self.run_validation(&boq);
        if boq.status.is_locked() {
            tracing::debug!(id = %boq.id, status = %boq.status, "validated locked BOQ without saving");
            return Ok((boq, report));
        }
        if self.is_superseded(&boq) {
            tracing::debug!(id = %boq.id, "validated superseded BOQ without saving");
            return Ok((boq, report));
        }
        BoqWorkflow::record_validation(&mut boq, report.clone())?;
        self.save(&mut boq)?;
        Ok((boq, report))
    }

    /// Approve after a fresh validation run. A failing report is still saved.
    pub fn approve(&self, reference: &str, approver: &str) -> Result<Boq, StoreError> {
        let mut boq = self.find_one(reference)?;
        self.ensure_head(&boq)?;
        let report = self.run_validation(&boq);
        match BoqWorkflow::approve(&mut boq, report, approver) {
            Ok(()) => {
                self.save(&mut boq)?;
                Ok(boq)
            }
            Err(e @ WorkflowError::ValidationErrors { .. }) => {
                self.save(&mut boq)?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn reject(&self, reference: &str, reason: &str) -> Result<Boq, StoreError> {
        let mut boq = self.find_one(reference)?;
        self.ensure_head(&boq)?;
        BoqWorkflow::reject(&mut boq, reason)?;
        self.save(&mut boq)?;
        Ok(boq)
    }

    // ----- versioning -----

    /// Start the next version of a BOQ. Only the head of a chain qualifies.
    pub fn create_new_version(&self, reference: &str) -> Result<Boq, StoreError> {
        let boq = self.find_one(reference)?;
        self.ensure_head(&boq)?;

        let mut next = boq.create_new_version(self.author.clone());
        self.write_new(&mut next)?;
        tracing::info!(
            from = %boq.id,
            to = %next.id,
            version = next.version,
            "created new BOQ version"
        );
        Ok(next)
    }

    /// Every version in the chain containing the reference, oldest first
    pub fn version_history(&self, reference: &str) -> Result<Vec<Boq>, StoreError> {
        let target = self.find_one(reference)?;
        let all = self.load_boqs();
        let by_id: HashMap<&EntityId, &Boq> = all.iter().map(|b| (&b.id, b)).collect();

        let mut seen: HashSet<EntityId> = HashSet::new();
        let mut older = Vec::new();
        let mut cursor = target.previous_version_id.clone();
        while let Some(id) = cursor {
            if !seen.insert(id.clone()) {
                break;
            }
            match by_id.get(&id) {
                Some(prev) => {
                    cursor = prev.previous_version_id.clone();
                    older.push((*prev).clone());
                }
                None => {
                    tracing::warn!(%id, "version chain refers to a missing BOQ");
                    break;
                }
            }
        }
        older.reverse();

        let mut chain = older;
        seen.insert(target.id.clone());
        let mut head_id = target.id.clone();
        chain.push(target);
        while let Some(next) = Self::successor_of(&head_id, &all) {
            if !seen.insert(next.id.clone()) {
                break;
            }
            head_id = next.id.clone();
            chain.push(next.clone());
        }
        Ok(chain)
    }

    pub fn statistics(&self) -> BoqStatistics {
        let all = self.load_boqs();
        let latest = self.find_all(&BoqFilter {
            latest_only: true,
            ..Default::default()
        });

        let mut stats = BoqStatistics {
            total_versions: all.len(),
            total_boqs: latest.len(),
            ..Default::default()
        };
        for status in Status::all() {
            stats.by_status.insert(status.to_string(), 0);
        }

        let mut scores = Vec::new();
        for boq in &latest {
            *stats.by_status.entry(boq.status.to_string()).or_insert(0) += 1;
            stats.total_items += boq.totals.total_items;
            stats.total_value += boq.totals.estimated_total_value;
            if let Some(ref report) = boq.validation {
                scores.push(report.score);
            }
            let (unmapped, suggested, confirmed, custom) = boq.mapping_counts();
            stats.mapping.unmapped += unmapped;
            stats.mapping.suggested += suggested;
            stats.mapping.confirmed += confirmed;
            stats.mapping.custom += custom;
        }
        if !scores.is_empty() {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            stats.average_score = Some((mean * 10.0).round() / 10.0);
        }
        stats
    }

    // ----- catalog mapping -----

    /// Run the matcher over every line that still accepts suggestions.
    /// Returns the BOQ and the number of lines that changed.
    pub fn suggest_mappings(&self, reference: &str) -> Result<(Boq, usize), StoreError> {
        let catalog = self.list_catalog();
        let mut boq = self.find_one(reference)?;
        self.ensure_modifiable(&boq)?;

        let matcher = CatalogMatcher::new(&catalog, &self.mapping);
        let mut changed = 0;
        for item in boq.items.iter_mut() {
            if !item.mapping_status.accepts_suggestions() {
                continue;
            }
            if item.apply_suggestions(matcher.suggest(item)) {
                changed += 1;
            }
        }

        if changed > 0 {
            boq.touch();
            self.save(&mut boq)?;
        }
        tracing::info!(id = %boq.id, changed, "suggested catalog mappings");
        Ok((boq, changed))
    }

    pub fn confirm_mapping(
        &self,
        reference: &str,
        item_ref: &str,
        catalog_ref: &str,
    ) -> Result<Boq, StoreError> {
        let catalog = self.find_catalog_item(catalog_ref)?;
        self.edit(reference, |boq| {
            let index = Self::item_index(boq, item_ref)?;
            boq.items[index].confirm_mapping(&catalog);
            boq.touch();
            Ok(())
        })
        .map(|(boq, _)| boq)
    }

    pub fn mark_custom(&self, reference: &str, item_ref: &str) -> Result<Boq, StoreError> {
        self.edit(reference, |boq| {
            let index = Self::item_index(boq, item_ref)?;
            boq.items[index].mark_custom();
            boq.touch();
            Ok(())
        })
        .map(|(boq, _)| boq)
    }

    pub fn reset_mapping(&self, reference: &str, item_ref: &str) -> Result<Boq, StoreError> {
        self.edit(reference, |boq| {
            let index = Self::item_index(boq, item_ref)?;
            boq.items[index].reset_mapping();
            boq.touch();
            Ok(())
        })
        .map(|(boq, _)| boq)
    }

    // ----- catalog -----

    pub fn create_catalog_item(&self, mut item: CatalogItem) -> Result<CatalogItem, StoreError> {
        let code = item.code.trim().to_string();
        if self
            .list_catalog()
            .iter()
            .any(|c| c.code.eq_ignore_ascii_case(&code))
        {
            return Err(StoreError::DuplicateCode(code));
        }
        item.code = code;
        loader::write_file(&self.project.entity_path(&item.id), &item)?;
        tracing::info!(id = %item.id, code = %item.code, "created catalog item");
        Ok(item)
    }

    /// All catalog items ordered by code
    pub fn list_catalog(&self) -> Vec<CatalogItem> {
        let mut items: Vec<CatalogItem> =
            loader::load_all::<CatalogItem>(&self.project, EntityPrefix::Cat)
                .into_iter()
                .map(|(_, item)| item)
                .collect();
        items.sort_by(|a, b| a.code.cmp(&b.code));
        items
    }

    /// Resolve a full id, short id, catalog code or partial id
    pub fn find_catalog_item(&self, reference: &str) -> Result<CatalogItem, StoreError> {
        let reference = parse_entity_reference(reference.trim(), &self.project);
        let catalog = self.list_catalog();

        if let Some(item) = catalog.iter().find(|c| {
            c.id.to_string().eq_ignore_ascii_case(&reference)
                || c.code.eq_ignore_ascii_case(&reference)
        }) {
            return Ok(item.clone());
        }

        let upper = reference.to_uppercase();
        let partial = if upper.starts_with("CAT-") {
            upper
        } else {
            format!("CAT-{}", upper)
        };
        let matches: Vec<&CatalogItem> = catalog
            .iter()
            .filter(|c| c.id.to_string().starts_with(&partial))
            .collect();
        match matches.as_slice() {
            [] => Err(StoreError::CatalogNotFound(reference)),
            [item] => Ok((*item).clone()),
            _ => Err(StoreError::Ambiguous {
                reference,
                count: matches.len(),
            }),
        }
    }

    // ----- import / export -----

    /// Append CSV line items to an editable BOQ
    pub fn import_items<R: Read>(
        &self,
        reference: &str,
        input: R,
        skip_errors: bool,
    ) -> Result<(Boq, ImportStats), StoreError> {
        let (items, stats) = import::parse_items(input, skip_errors)?;
        let (boq, _) = self.edit(reference, |boq| {
            for item in items {
                boq.add_item(item);
            }
            Ok(())
        })?;
        tracing::info!(id = %boq.id, imported = stats.imported, "imported line items");
        Ok((boq, stats))
    }

    /// Create catalog items from CSV; codes that already exist are skipped
    pub fn import_catalog<R: Read>(
        &self,
        input: R,
        skip_errors: bool,
    ) -> Result<(Vec<CatalogItem>, ImportStats), StoreError> {
        let (parsed, mut stats) = import::parse_catalog(input, &self.author, skip_errors)?;
        let mut created = Vec::new();
        for item in parsed {
            match self.create_catalog_item(item) {
                Ok(item) => created.push(item),
                Err(StoreError::DuplicateCode(code)) => {
                    tracing::warn!(%code, "catalog code exists, skipping");
                    stats.imported -= 1;
                    stats.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok((created, stats))
    }

    pub fn export_items<W: Write>(&self, reference: &str, output: W) -> Result<Boq, StoreError> {
        let boq = self.find_one(reference)?;
        import::write_items(output, &boq)?;
        Ok(boq)
    }
}
