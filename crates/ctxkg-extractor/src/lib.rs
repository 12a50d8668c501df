//! ctxkg Extractor - Entity resolution and derivative triples
//!
//! Turns OpenIE triples over annotated sentences into a deduplicated
//! edge list. Composite entities are split along their dependency
//! structure into finer-grained facts, and every entity is resolved to a
//! canonical leaf before it is written out.

pub mod assembler;
pub mod catalog;
pub mod entity;
pub mod loader;
pub mod relation;
pub mod splitter;
pub mod subset;
pub mod triple;

#[cfg(test)]
mod test_support;

pub use assembler::{TripleAssembler, TripleDocument};
pub use entity::Entity;
pub use loader::{EdgeListGraph, LoaderError, TripleFile, TripleRow};
pub use relation::{Connector, Orientation, RelationTable};
pub use triple::{escape_field, format_confidence, ResolvedTriple, Triple, HEADER, SEPARATOR};

use ctxkg_core::CoreError;
use thiserror::Error;

/// Extractor errors
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("Raw triple span {span:?} (relation '{relation}') is missing from the entity catalog")]
    UnknownSpan { span: Vec<usize>, relation: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Loader(#[from] LoaderError),
}

pub type Result<T> = std::result::Result<T, ExtractorError>;
