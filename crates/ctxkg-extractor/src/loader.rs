//! Triple file loader
//!
//! Reads triple files back and builds the per-document edge-list graph
//! consumed downstream: entities keyed by ID, plus one edge per row.

use std::collections::{HashMap, HashSet};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use thiserror::Error;

use crate::triple::{HEADER, SEPARATOR};

/// Triple file errors
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Malformed row {row:?}: {reason}")]
    MalformedRow { row: String, reason: String },

    #[error("Missing header row")]
    MissingHeader,

    #[error("Failed to serialize graph: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// Rows and Files
// ============================================================================

/// One parsed row of a triple file
#[derive(Debug, Clone, PartialEq)]
pub struct TripleRow {
    pub confidence: f64,
    pub subject: String,
    pub relation: String,
    pub object: String,
    pub subject_id: String,
    pub object_id: String,
}

impl TripleRow {
    /// Parse a `confidence;subject;relation;object;subject_id;object_id` row
    pub fn parse(line: &str) -> Result<Self, LoaderError> {
        let malformed = |reason: String| LoaderError::MalformedRow {
            row: line.to_string(),
            reason,
        };

        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        let [confidence, subject, relation, object, subject_id, object_id] = fields.as_slice()
        else {
            return Err(malformed(format!("expected 6 fields, found {}", fields.len())));
        };

        let confidence = confidence
            .trim()
            .parse::<f64>()
            .map_err(|e| malformed(format!("invalid confidence: {}", e)))?;

        Ok(Self {
            confidence,
            subject: subject.to_string(),
            relation: relation.to_string(),
            object: object.to_string(),
            subject_id: subject_id.to_string(),
            object_id: object_id.to_string(),
        })
    }
}

/// Contents of a triple file
#[derive(Debug, Clone, Default)]
pub struct TripleFile {
    /// Source path named by the leading comment, if any
    pub source: Option<String>,
    pub rows: Vec<TripleRow>,
}

impl TripleFile {
    /// Parse a whole file; the header must precede the first row
    pub fn parse(text: &str) -> Result<Self, LoaderError> {
        let mut file = Self::default();
        let mut header_seen = false;

        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if file.source.is_none() {
                    file.source = Some(comment.trim().to_string());
                }
                continue;
            }
            if !header_seen {
                if line != HEADER {
                    return Err(LoaderError::MissingHeader);
                }
                header_seen = true;
                continue;
            }
            file.rows.push(TripleRow::parse(line)?);
        }

        if !header_seen {
            return Err(LoaderError::MissingHeader);
        }
        Ok(file)
    }
}

// ============================================================================
// Edge List Graph
// ============================================================================

/// A directed, labelled edge between two entity IDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub subject_id: String,
    pub relation: String,
    pub object_id: String,
}

/// Counts of what [`EdgeListGraph::clean`] removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub duplicate_edges: usize,
    pub self_loops: usize,
    pub orphan_entities: usize,
}

impl CleanReport {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.duplicate_edges + self.self_loops + self.orphan_entities
    }
}

/// Entities and edges of one document
#[derive(Debug, Clone, Default)]
pub struct EdgeListGraph {
    document: String,
    /// (id, text) in first-seen order
    entities: Vec<(String, String)>,
    entity_index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl EdgeListGraph {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            ..Self::default()
        }
    }

    /// Build from rows; the first text seen for an ID is kept
    pub fn from_rows(document: impl Into<String>, rows: &[TripleRow]) -> Self {
        let mut graph = Self::new(document);
        for row in rows {
            graph.add_row(row);
        }
        graph
    }

    /// Add both entities of a row and its edge
    pub fn add_row(&mut self, row: &TripleRow) {
        self.add_entity(&row.subject_id, &row.subject);
        self.add_entity(&row.object_id, &row.object);
        self.edges.push(Edge {
            subject_id: row.subject_id.clone(),
            relation: row.relation.clone(),
            object_id: row.object_id.clone(),
        });
    }

    fn add_entity(&mut self, id: &str, text: &str) {
        if !self.entity_index.contains_key(id) {
            self.entity_index.insert(id.to_string(), self.entities.len());
            self.entities.push((id.to_string(), text.to_string()));
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn entities(&self) -> &[(String, String)] {
        &self.entities
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Text of an entity by ID
    pub fn entity_text(&self, id: &str) -> Option<&str> {
        self.entity_index
            .get(id)
            .map(|&position| self.entities[position].1.as_str())
    }

    /// Remove duplicate edges, self-loops and entities left without edges
    pub fn clean(&mut self) -> CleanReport {
        let mut report = CleanReport::default();

        let mut seen: HashSet<Edge> = HashSet::new();
        self.edges.retain(|edge| {
            if edge.subject_id == edge.object_id {
                report.self_loops += 1;
                return false;
            }
            if !seen.insert(edge.clone()) {
                report.duplicate_edges += 1;
                return false;
            }
            true
        });

        let connected: HashSet<&str> = self
            .edges
            .iter()
            .flat_map(|e| [e.subject_id.as_str(), e.object_id.as_str()])
            .collect();
        let before = self.entities.len();
        let entities: Vec<(String, String)> = self
            .entities
            .iter()
            .filter(|(id, _)| connected.contains(id.as_str()))
            .cloned()
            .collect();
        report.orphan_entities = before - entities.len();

        self.entity_index = entities
            .iter()
            .enumerate()
            .map(|(position, (id, _))| (id.clone(), position))
            .collect();
        self.entities = entities;

        tracing::debug!(
            document = %self.document,
            duplicate_edges = report.duplicate_edges,
            self_loops = report.self_loops,
            orphan_entities = report.orphan_entities,
            "Graph cleaned"
        );
        report
    }

    /// `{"document": ..., "entities": {id: text}, "graph": [edge]}`
    pub fn to_json(&self) -> Result<String, LoaderError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

struct OrderedEntities<'a>(&'a [(String, String)]);

impl Serialize for OrderedEntities<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, text) in self.0 {
            map.serialize_entry(id, text)?;
        }
        map.end()
    }
}

impl Serialize for EdgeListGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("document", &self.document)?;
        map.serialize_entry("entities", &OrderedEntities(&self.entities))?;
        map.serialize_entry("graph", &self.edges)?;
        map.end()
    }
}

// ============================================================================
// Tests
// ============================================================================
