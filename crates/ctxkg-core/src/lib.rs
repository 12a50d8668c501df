//! ctxkg Core - Annotation model, errors and configuration
//!
//! This crate defines the shared abstractions used across ctxkg:
//! - Annotation model (tokens, dependency graphs, mentions, raw triples)
//! - Common error types
//! - The seam to the external annotation pipeline
//! - Configuration management

pub mod annotation;
pub mod config;

pub use annotation::{
    render_tokens, DependencyEdge, DependencyGraph, Document, DocumentRecord,
    JsonAnnotationSource, NamedEntityMention, RawTriple, Sentence, Token,
};
pub use config::{
    AppConfig, CleaningConfig, ConfigError, LoggingConfig, ProcessingConfig, RelationRule,
};

use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for ctxkg operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("IO error on {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse annotations in {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================================================
// Traits
// ============================================================================

/// Source of annotated documents
///
/// The annotation pipeline itself (tokenizer, tagger, parser, NER, coref,
/// OpenIE) is external; implementations only hand over its output.
pub trait AnnotationSource: Send + Sync {
    /// Load the annotations for one document
    fn load(&self, path: &Path) -> Result<Document>;
}
