//! Entity loading utilities
//!
//! Reads and writes entity YAML files. Directory scans skip files that fail
//! to parse and log them, so one broken file never hides the rest.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::EntityPrefix;
use crate::core::project::{Project, ENTITY_SUFFIX};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
}

/// Load one entity file
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    tracing::debug!(path = %path.display(), "loading entity");
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yml::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize an entity and write it, creating the parent directory
pub fn write_file<T: Serialize>(path: &Path, entity: &T) -> Result<(), LoadError> {
    tracing::debug!(path = %path.display(), "writing entity");
    let yaml = serde_yml::to_string(entity).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| LoadError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, yaml).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every entity of one kind, paired with its file path
pub fn load_all<T: DeserializeOwned>(project: &Project, prefix: EntityPrefix) -> Vec<(PathBuf, T)> {
    let mut entities = Vec::new();
    for path in project.iter_entity_files(prefix) {
        match load_file::<T>(&path) {
            Ok(entity) => entities.push((path, entity)),
            Err(e) => tracing::warn!("skipping {}", e),
        }
    }
    entities
}

/// Find entity files whose id starts with the given (case-insensitive) prefix
pub fn find_entity_files(project: &Project, prefix: EntityPrefix, partial: &str) -> Vec<PathBuf> {
    let needle = partial.trim().to_uppercase();
    if needle.is_empty() {
        return Vec::new();
    }
    project
        .iter_entity_files(prefix)
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(ENTITY_SUFFIX))
                .is_some_and(|stem| stem.to_uppercase().starts_with(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityId;
    use crate::entities::catalog::CatalogItem;
    use tempfile::tempdir;

    #[test]
    fn test_load_all_empty_project() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let all: Vec<(PathBuf, CatalogItem)> = load_all(&project, EntityPrefix::Cat);
        assert!(all.is_empty());
    }

    #[test]
    fn test_write_then_find_by_prefix() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let item = CatalogItem::new("RCC-M25", "RCC M25 Grade Concrete", "m3", "test".into());
        let path = project.entity_path(&item.id);
        write_file(&path, &item).unwrap();

        let id = item.id.to_string();
        let found = find_entity_files(&project, EntityPrefix::Cat, &id[..12].to_lowercase());
        assert_eq!(found, vec![path.clone()]);

        let loaded: CatalogItem = load_file(&path).unwrap();
        assert_eq!(loaded.code, "RCC-M25");
    }

    #[test]
    fn test_broken_files_are_skipped() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let good = CatalogItem::new("A", "Alpha", "nos", "test".into());
        write_file(&project.entity_path(&good.id), &good).unwrap();

        let broken = project.entity_path(&EntityId::new(EntityPrefix::Cat));
        fs::write(&broken, "code: [unterminated").unwrap();

        let all: Vec<(PathBuf, CatalogItem)> = load_all(&project, EntityPrefix::Cat);
        assert_eq!(all.len(), 1);
        assert!(matches!(
            load_file::<CatalogItem>(&broken),
            Err(LoadError::Parse { .. })
        ));
    }
}
