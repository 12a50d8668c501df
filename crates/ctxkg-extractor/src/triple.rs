//! Triples and their row serialization

use std::borrow::Cow;
use std::sync::Arc;

use ctxkg_core::CleaningConfig;

use crate::entity::Entity;
use crate::relation::RelationTable;
use crate::splitter::EntitySplitter;

/// Header row of a triple file
pub const HEADER: &str = "confidence;subject;relation;object;subject_id;object_id";

/// Column separator of a triple file
pub const SEPARATOR: char = ';';

/// A (subject, relation, object) fact over entities
#[derive(Debug, Clone)]
pub struct Triple {
    /// 1.0 for triples inferred by splitting
    pub confidence: f64,
    pub subject: Arc<Entity>,
    pub relation: String,
    pub object: Arc<Entity>,
}

impl Triple {
    /// Create an extracted triple
    pub fn new(
        confidence: f64,
        subject: Arc<Entity>,
        relation: impl Into<String>,
        object: Arc<Entity>,
    ) -> Self {
        Self {
            confidence,
            subject,
            relation: relation.into(),
            object,
        }
    }

    /// Create a triple inferred from an entity split
    pub fn derived(subject: Arc<Entity>, relation: impl Into<String>, object: Arc<Entity>) -> Self {
        Self::new(1.0, subject, relation, object)
    }

    /// File header: a comment naming the source, then the column row
    pub fn header(source: &str) -> String {
        format!("# {}\n{}", source, HEADER)
    }

    /// This triple followed by the derivative triples of both sides
    pub fn build_all_triples(
        &self,
        rules: &CleaningConfig,
        relations: &RelationTable,
    ) -> Vec<Triple> {
        let mut all = vec![self.clone()];
        all.extend(EntitySplitter::new(&self.subject, rules).build_derivative_triples(relations));
        all.extend(EntitySplitter::new(&self.object, rules).build_derivative_triples(relations));
        all
    }

    /// Cleaned final form of the subject
    pub fn final_subject(&self, rules: &CleaningConfig) -> Entity {
        self.subject.final_entity(rules).clean_form(rules)
    }

    /// Cleaned final form of the object
    pub fn final_object(&self, rules: &CleaningConfig) -> Entity {
        self.object.final_entity(rules).clean_form(rules)
    }

    /// Both sides resolved to their cleaned final entities
    pub fn resolve(&self, rules: &CleaningConfig) -> ResolvedTriple<'_> {
        ResolvedTriple {
            triple: self,
            subject: self.final_subject(rules),
            object: self.final_object(rules),
        }
    }

    /// Subject and object do not resolve to the same entity
    pub fn subject_and_object_are_different(&self, rules: &CleaningConfig) -> bool {
        self.resolve(rules).sides_differ()
    }

    /// Neither side is empty after cleaning
    pub fn not_empty(&self, rules: &CleaningConfig) -> bool {
        self.resolve(rules).not_empty()
    }

    /// `confidence;subject;relation;object;subject_id;object_id`
    pub fn to_row(&self, rules: &CleaningConfig) -> String {
        self.resolve(rules).to_row()
    }
}

/// A triple with its final sides computed once
#[derive(Debug)]
pub struct ResolvedTriple<'a> {
    triple: &'a Triple,
    subject: Entity,
    object: Entity,
}

impl ResolvedTriple<'_> {
    pub fn subject(&self) -> &Entity {
        &self.subject
    }

    pub fn object(&self) -> &Entity {
        &self.object
    }

    pub fn sides_differ(&self) -> bool {
        self.subject.id() != self.object.id()
    }

    pub fn not_empty(&self) -> bool {
        !self.subject.is_empty() && !self.object.is_empty()
    }

    /// Row with the separator replaced inside every text field
    pub fn to_row(&self) -> String {
        format!(
            "{};{};{};{};{};{}",
            format_confidence(self.triple.confidence),
            escape_field(self.subject.text()),
            escape_field(&self.triple.relation),
            escape_field(self.object.text()),
            escape_field(&self.subject.id()),
            escape_field(&self.object.id())
        )
    }
}

/// Replace the column separator so a field never splits a row
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains(SEPARATOR) {
        Cow::Owned(value.replace(SEPARATOR, ","))
    } else {
        Cow::Borrowed(value)
    }
}

/// Shortest round-trip decimal, always with a fractional part
pub fn format_confidence(confidence: f64) -> String {
    let formatted = confidence.to_string();
    if confidence.is_finite() && !formatted.contains('.') {
        format!("{}.0", formatted)
    } else {
        formatted
    }
}

// ============================================================================
// Tests
// ============================================================================
