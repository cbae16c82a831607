//! Short ID system for easier entity selection
//!
//! Numeric aliases like `@1`, `@2` map to full entity IDs. They are
//! reassigned each time entities are listed and stored in
//! `.boq/shortids.json` so the next command can resolve them.

use std::collections::{BTreeMap, HashMap};
use std::fs;

use crate::core::project::{Project, PROJECT_DIR};

const INDEX_FILE: &str = "shortids.json";

/// A mapping of short IDs (@N) to full entity IDs
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShortIdIndex {
    entries: BTreeMap<u32, String>,
    #[serde(skip)]
    reverse: HashMap<String, u32>,
    next_id: u32,
}

impl ShortIdIndex {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            reverse: HashMap::new(),
            next_id: 1,
        }
    }

    /// Load the index from a project, or start empty if missing or unreadable
    pub fn load(project: &Project) -> Self {
        let path = project.root().join(PROJECT_DIR).join(INDEX_FILE);
        let Ok(content) = fs::read_to_string(&path) else {
            return Self::new();
        };
        match serde_json::from_str::<ShortIdIndex>(&content) {
            Ok(mut index) => {
                index.reverse = index.entries.iter().map(|(k, v)| (v.clone(), *k)).collect();
                index
            }
            Err(e) => {
                tracing::warn!("discarding short id index: {}", e);
                Self::new()
            }
        }
    }

    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        let path = project.root().join(PROJECT_DIR).join(INDEX_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Assign aliases to ids that have none, keeping existing ones stable
    pub fn ensure_all(&mut self, entity_ids: impl IntoIterator<Item = String>) {
        for id in entity_ids {
            self.add(id);
        }
    }

    /// Add an entity ID and return its short ID
    pub fn add(&mut self, entity_id: String) -> u32 {
        if let Some(&short_id) = self.reverse.get(&entity_id) {
            return short_id;
        }
        let short_id = self.next_id.max(1);
        self.next_id = short_id + 1;
        self.entries.insert(short_id, entity_id.clone());
        self.reverse.insert(entity_id, short_id);
        short_id
    }

    /// Resolve `@N` to a full entity ID; anything else passes through unchanged
    pub fn resolve(&self, reference: &str) -> Option<String> {
        match reference.strip_prefix('@') {
            Some(num) => num
                .parse::<u32>()
                .ok()
                .and_then(|n| self.entries.get(&n).cloned()),
            None => Some(reference.to_string()),
        }
    }

    pub fn get_short_id(&self, entity_id: &str) -> Option<u32> {
        self.reverse.get(entity_id).copied()
    }

    /// `@N` for a known id, empty otherwise
    pub fn format_short(&self, entity_id: &str) -> String {
        self.get_short_id(entity_id)
            .map(|n| format!("@{}", n))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve a reference that might be a short ID
pub fn parse_entity_reference(reference: &str, project: &Project) -> String {
    let index = ShortIdIndex::load(project);
    index
        .resolve(reference)
        .unwrap_or_else(|| reference.to_string())
}
