//! Embedded JSON schemas for entity files

use rust_embed::Embed;

use crate::core::identity::EntityPrefix;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// Lookup of the JSON schema for each entity type
#[derive(Debug, Default)]
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn file_name(prefix: EntityPrefix) -> &'static str {
        match prefix {
            EntityPrefix::Boq => "boq.schema.json",
            EntityPrefix::Cat => "catalog.schema.json",
        }
    }

    /// Schema source for an entity type
    pub fn get(&self, prefix: EntityPrefix) -> Option<String> {
        let file = EmbeddedSchemas::get(Self::file_name(prefix))?;
        match std::str::from_utf8(&file.data) {
            Ok(s) => Some(s.to_string()),
            Err(e) => {
                tracing::warn!(%prefix, "embedded schema is not UTF-8: {}", e);
                None
            }
        }
    }
}
