//! ctxkg Configuration Management
//!
//! Handles configuration from environment variables and TOML files,
//! with defaults matching the Penn Treebank tag set used by the
//! annotation pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Entity cleaning rules
    pub cleaning: CleaningConfig,

    /// Batch processing configuration
    pub processing: ProcessingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Extra relation connectors, layered over the standard table
    pub relations: Vec<RelationRule>,
}

impl AppConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(jobs) = lookup("CTXKG_JOBS") {
            self.processing.jobs = jobs.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CTXKG_JOBS".to_string(),
                value: jobs,
            })?;
        }

        if let Some(overwrite) = lookup("CTXKG_OVERWRITE") {
            self.processing.overwrite = match overwrite.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "CTXKG_OVERWRITE".to_string(),
                        value: overwrite,
                    })
                }
            };
        }

        if let Some(level) = lookup("CTXKG_LOG_LEVEL") {
            self.logging.level = level;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.jobs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "processing.jobs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Tag sets used when cleaning entities for output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Tags removed from every entity (possessive markers, punctuation)
    pub droppable_tags: Vec<String>,

    /// Tags trimmed from either end of an entity (prepositions, bare verbs)
    pub trimmable_tags: Vec<String>,

    /// Named-entity types that never become entities
    pub skipped_mention_types: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            droppable_tags: to_strings(&[
                "POS", ".", ",", ":", "``", "''", "-LRB-", "-RRB-", "HYPH", "NFP",
            ]),
            trimmable_tags: to_strings(&["IN", "VB", "VBD", "VBG", "VBN", "VBP", "VBZ"]),
            skipped_mention_types: to_strings(&["NUMBER"]),
        }
    }
}

impl CleaningConfig {
    /// Whether a tag is dropped from entities
    pub fn is_droppable(&self, tag: &str) -> bool {
        self.droppable_tags.iter().any(|t| t == tag)
    }

    /// Whether a tag is trimmed from entity boundaries
    pub fn is_trimmable(&self, tag: &str) -> bool {
        self.trimmable_tags.iter().any(|t| t == tag)
    }

    /// Whether mentions of this type are ignored
    pub fn skips_mention_type(&self, entity_type: &str) -> bool {
        self.skipped_mention_types.iter().any(|t| t == entity_type)
    }
}

/// A dependency label mapped to an output connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRule {
    /// Dependency relation label (e.g. "amod")
    pub label: String,

    /// Phrase written in place of the label
    pub phrase: String,

    /// Put the head part in subject position
    #[serde(default)]
    pub swap: bool,
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of documents processed concurrently
    pub jobs: usize,

    /// Rewrite outputs that already exist
    pub overwrite: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            overwrite: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
