//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::mapping::MappingConfig;
use crate::core::validation::ValidationRules;
use crate::core::Project;

/// Configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default author for new entities
    pub author: Option<String>,

    /// Editor command for `boq boq edit`
    pub editor: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Currency for new BOQs
    pub currency: Option<String>,

    /// Validation thresholds
    pub validation: Option<ValidationRules>,

    /// Catalog mapping tuning
    pub mapping: Option<MappingConfig>,
}

impl Config {
    /// Load configuration from all sources, discovering the project from the
    /// current directory
    pub fn load() -> Self {
        Self::load_with(Project::discover().ok().as_ref())
    }

    /// Load configuration from all sources, merging in priority order
    pub fn load_with(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/boq/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.boq/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_dir().join("config.yaml"))
            {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("BOQ_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(editor) = std::env::var("BOQ_EDITOR") {
            config.editor = Some(editor);
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), "could not read config: {}", e);
                return None;
            }
        };
        if contents.trim().is_empty() {
            return None;
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unparseable config: {}", e);
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "boq")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.editor.is_some() {
            self.editor = other.editor;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.currency.is_some() {
            self.currency = other.currency;
        }
        if other.validation.is_some() {
            self.validation = other.validation;
        }
        if other.mapping.is_some() {
            self.mapping = other.mapping;
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn currency(&self) -> String {
        self.currency
            .clone()
            .unwrap_or_else(crate::entities::boq::default_currency)
    }

    pub fn validation_rules(&self) -> ValidationRules {
        self.validation.clone().unwrap_or_default()
    }

    pub fn mapping_config(&self) -> MappingConfig {
        self.mapping.clone().unwrap_or_default()
    }

    /// Get the editor command
    pub fn editor(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
            .or_else(|| std::env::var("VISUAL").ok())
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Run the editor on a file, properly handling commands with arguments
    /// (e.g., "emacsclient -nw" or "code --wait")
    pub fn run_editor(&self, file_path: &Path) -> std::io::Result<std::process::ExitStatus> {
        let editor = self.editor();
        let mut parts = editor.split_whitespace();

        match parts.next() {
            Some(cmd) => std::process::Command::new(cmd)
                .args(parts)
                .arg(file_path)
                .status(),
            None => std::process::Command::new("vi").arg(file_path).status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_config_overrides_defaults() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(
            project.config_dir().join("config.yaml"),
            "currency: USD\nvalidation:\n  max_quantity: 50\n  require_price: true\nmapping:\n  max_suggestions: 5\n",
        )
        .unwrap();

        let config = Config::load_with(Some(&project));
        assert_eq!(config.currency(), "USD");

        let rules = config.validation_rules();
        assert_eq!(rules.max_quantity, 50.0);
        assert!(rules.require_price);
        // unspecified keys keep their defaults
        assert!(rules.is_allowed_unit("kg"));

        let mapping = config.mapping_config();
        assert_eq!(mapping.max_suggestions, 5);
        assert_eq!(mapping.min_confidence, 40.0);
    }

    #[test]
    fn test_broken_project_config_is_ignored() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(project.config_dir().join("config.yaml"), "currency: [oops").unwrap();

        let config = Config::load_with(Some(&project));
        assert_eq!(config.validation_rules(), ValidationRules::default());
    }

    #[test]
    fn test_commented_default_config_loads() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let config = Config::load_with(Some(&project));
        assert_eq!(config.mapping_config(), MappingConfig::default());
    }
}
