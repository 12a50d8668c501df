//! Relation classification
//!
//! Translates the grammatical relation linking two parts of a split
//! entity into a pseudo-natural-language connector. The mapping is plain
//! data: a table from Universal Dependencies labels to a phrase and an
//! orientation, with unlisted labels passed through unchanged.

use std::collections::HashMap;

use ctxkg_core::config::RelationRule;
use serde::{Deserialize, Serialize};

// ============================================================================
// Orientation
// ============================================================================

/// How the parts of a derivative triple are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// The dependent part is the subject
    Unchanged,
    /// The head part is the subject
    Swapped,
}

impl Orientation {
    pub fn from_swap(swap: bool) -> Self {
        if swap {
            Self::Swapped
        } else {
            Self::Unchanged
        }
    }

    /// Whether the dependent part stays in subject position
    pub fn subject_is_first(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Swapped => write!(f, "swapped"),
        }
    }
}

/// Output phrase and orientation for a relation label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    pub phrase: String,
    pub orientation: Orientation,
}

// ============================================================================
// Standard Table
// ============================================================================

use Orientation::{Swapped, Unchanged};

/// Default label -> (phrase, orientation) entries
pub const STANDARD_CONNECTORS: &[(&str, &str, Orientation)] = &[
    // Subject, object, oblique and clausal arguments
    ("advmod", "at", Unchanged),
    ("advmod:emph", "at", Unchanged),
    ("advmod:lmod", "at", Unchanged),
    ("csubj", "at", Unchanged),
    ("csubj:pass", "at", Unchanged),
    ("goeswith", "at", Unchanged),
    ("nsubj", "at", Unchanged),
    ("nsubj:pass", "at", Unchanged),
    ("obj", "at", Unchanged),
    ("obl", "at", Unchanged),
    ("obl:agent", "at", Unchanged),
    ("obl:arg", "at", Unchanged),
    ("obl:lmod", "at", Unchanged),
    ("obl:tmod", "at", Unchanged),
    ("xcomp", "at", Unchanged),
    // Modifiers that describe the head
    ("amod", "is", Unchanged),
    ("appos", "is", Unchanged),
    ("compound", "of", Unchanged),
    ("nmod", "of", Unchanged),
    ("conj", "and", Unchanged),
    // Possession
    ("nmod:poss", "has", Swapped),
    ("nmod:tmod", "has", Swapped),
    // Quantities
    ("nummod", "amount to", Unchanged),
    ("nummod:gov", "amount to", Unchanged),
    ("vocative", "referenced by", Swapped),
];

// ============================================================================
// Relation Table
// ============================================================================

/// Lookup table from dependency labels to connectors
#[derive(Debug, Clone)]
pub struct RelationTable {
    entries: HashMap<String, Connector>,
}

impl RelationTable {
    /// Table with no entries: every label passes through
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The standard table
    pub fn standard() -> Self {
        STANDARD_CONNECTORS
            .iter()
            .fold(Self::empty(), |table, &(label, phrase, orientation)| {
                table.with_entry(label, phrase, orientation)
            })
    }

    /// Standard table with configured rules layered on top
    pub fn with_rules(rules: &[RelationRule]) -> Self {
        rules.iter().fold(Self::standard(), |table, rule| {
            table.with_entry(&rule.label, &rule.phrase, Orientation::from_swap(rule.swap))
        })
    }

    /// Add or replace an entry
    pub fn with_entry(
        mut self,
        label: impl Into<String>,
        phrase: impl Into<String>,
        orientation: Orientation,
    ) -> Self {
        self.entries.insert(
            label.into(),
            Connector {
                phrase: phrase.into(),
                orientation,
            },
        );
        self
    }

    /// Connector for a label; unlisted labels become their own phrase
    pub fn classify(&self, label: &str) -> Connector {
        self.entries.get(label).cloned().unwrap_or_else(|| Connector {
            phrase: label.to_string(),
            orientation: Orientation::Unchanged,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RelationTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Tests
// ============================================================================
