//! Catalog entity type - Canonical materials and equipment that BOQ lines map to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::entity::Entity;

/// A canonical catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: EntityId,

    /// Catalog code (e.g. "RCC-M25")
    pub code: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unit of measure the catalog prices in
    pub unit: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Extra words that identify this item in free text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

fn default_revision() -> u32 {
    1
}

impl Entity for CatalogItem {
    const PREFIX: &'static str = "CAT";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn status(&self) -> &str {
        "active"
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl CatalogItem {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        author: String,
    ) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Cat),
            code: code.into(),
            name: name.into(),
            description: None,
            unit: unit.into(),
            unit_price: None,
            category: None,
            keywords: Vec::new(),
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }
}
