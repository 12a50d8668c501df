//! Triple assembly
//!
//! Drives the per-sentence pipeline: catalog the entities, resolve and
//! bind their direct subsets, turn every raw triple into a triple over
//! those entities, expand it with derivative triples, and serialize the
//! survivors. Sentences of a document are processed in order and share
//! one group id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ctxkg_core::{AppConfig, CleaningConfig, Document, Sentence, Token};
use uuid::Uuid;

use crate::catalog::build_entities;
use crate::entity::Entity;
use crate::relation::RelationTable;
use crate::subset::{bind_subsets, compute_direct_subsets};
use crate::triple::Triple;
use crate::{ExtractorError, Result};

// ============================================================================
// Triple Document
// ============================================================================

/// Serialized triples of one document, deduplicated in first-seen order
#[derive(Debug, Clone)]
pub struct TripleDocument {
    pub source: String,
    pub group_id: Uuid,
    rows: Vec<String>,
    seen: HashSet<String>,
}

impl TripleDocument {
    pub fn new(source: impl Into<String>, group_id: Uuid) -> Self {
        Self {
            source: source.into(),
            group_id,
            rows: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Append rows, skipping any already present
    pub fn extend<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = String>,
    {
        for row in rows {
            if self.seen.insert(row.clone()) {
                self.rows.push(row);
            }
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// File contents: source comment, header, then one line per row
    pub fn render(&self) -> String {
        let mut out = Triple::header(&self.source);
        out.push('\n');
        for row in &self.rows {
            out.push_str(row);
            out.push('\n');
        }
        out
    }
}

// ============================================================================
// Assembler
// ============================================================================

/// Turns annotated sentences into triple rows
#[derive(Debug, Clone, Default)]
pub struct TripleAssembler {
    cleaning: CleaningConfig,
    relations: RelationTable,
}

impl TripleAssembler {
    pub fn new(cleaning: CleaningConfig, relations: RelationTable) -> Self {
        Self {
            cleaning,
            relations,
        }
    }

    /// Cleaning rules and relation table from application config
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.cleaning.clone(),
            RelationTable::with_rules(&config.relations),
        )
    }

    pub fn cleaning(&self) -> &CleaningConfig {
        &self.cleaning
    }

    pub fn relations(&self) -> &RelationTable {
        &self.relations
    }

    /// Process a document under a fresh group id
    pub fn process_document(&self, document: &Document) -> Result<TripleDocument> {
        self.process_document_with_group(document, Uuid::new_v4())
    }

    /// Process a document under the given group id
    ///
    /// Fails as a whole if any sentence fails; no partial output is returned.
    pub fn process_document_with_group(
        &self,
        document: &Document,
        group_id: Uuid,
    ) -> Result<TripleDocument> {
        let mut output = TripleDocument::new(document.source.clone(), group_id);
        for (position, sentence) in document.sentences.iter().enumerate() {
            let rows = self.process_sentence(sentence, group_id)?;
            tracing::debug!(
                source = %document.source,
                sentence = position,
                rows = rows.len(),
                "Sentence processed"
            );
            output.extend(rows);
        }
        Ok(output)
    }

    /// Serialized rows of every surviving triple of one sentence, in order
    pub fn process_sentence(&self, sentence: &Sentence, group_id: Uuid) -> Result<Vec<String>> {
        let entities = build_entities(
            &sentence.graph,
            &sentence.triples,
            &sentence.mentions,
            group_id,
            &self.cleaning,
        );
        let table = compute_direct_subsets(&entities);
        let entities = bind_subsets(entities, &table);

        tracing::trace!(
            entities = entities.len(),
            triples = sentence.triples.len(),
            "Entities cataloged"
        );

        let by_span: HashMap<Vec<usize>, Arc<Entity>> = entities
            .iter()
            .map(|entity| (entity.span(), Arc::clone(entity)))
            .collect();

        let mut rows = Vec::new();
        for raw in &sentence.triples {
            let subject = resolve(&by_span, &raw.subject, &raw.relation)?;
            let object = resolve(&by_span, &raw.object, &raw.relation)?;
            let triple = Triple::new(raw.confidence, subject, raw.relation.as_str(), object);

            for candidate in triple.build_all_triples(&self.cleaning, &self.relations) {
                let resolved = candidate.resolve(&self.cleaning);
                if resolved.sides_differ() && resolved.not_empty() {
                    rows.push(resolved.to_row());
                }
            }
        }

        Ok(rows)
    }
}

/// Entity cataloged for exactly this token span
fn resolve(
    by_span: &HashMap<Vec<usize>, Arc<Entity>>,
    tokens: &[Token],
    relation: &str,
) -> Result<Arc<Entity>> {
    let span: Vec<usize> = tokens.iter().map(|t| t.index).collect();
    by_span
        .get(&span)
        .cloned()
        .ok_or_else(|| ExtractorError::UnknownSpan {
            span,
            relation: relation.to_string(),
        })
}

// ============================================================================
// Tests
// ============================================================================
