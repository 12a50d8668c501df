//! Annotation model
//!
//! Value types for the output of the external annotation pipeline
//! (tokens, dependency graphs, named-entity mentions and raw OpenIE
//! triples), plus the JSON records they are loaded from.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::{AnnotationSource, CoreError, Result};

// ============================================================================
// Tokens
// ============================================================================

/// A token of a sentence
///
/// Equality includes the sentence-relative `index`, so two tokens with the
/// same surface text at different positions are different tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Original surface text
    pub text: String,

    /// Lemma
    pub lemma: String,

    /// Part-of-speech tag (Penn Treebank)
    pub tag: String,

    /// Position in the sentence
    pub index: usize,
}

impl Token {
    /// Create a new token
    pub fn new(
        text: impl Into<String>,
        lemma: impl Into<String>,
        tag: impl Into<String>,
        index: usize,
    ) -> Self {
        Self {
            text: text.into(),
            lemma: lemma.into(),
            tag: tag.into(),
            index,
        }
    }

    /// Fingerprint used to build entity IDs: lemma, position and tag
    pub fn fingerprint(&self) -> String {
        format!("{}_{}_{}", self.lemma, self.index, self.tag)
    }
}

/// Join the surface forms of tokens with single spaces
pub fn render_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

// ============================================================================
// Dependency Graph
// ============================================================================

/// A labelled dependency edge, borrowed from a [`DependencyGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge<'a> {
    pub source: &'a Token,
    pub target: &'a Token,
    pub relation: &'a str,
}

/// Directed graph over the tokens of a sentence
///
/// Edges point from head to dependent and carry the grammatical relation
/// label. Edge iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<Token, String>,
    roots: Vec<NodeIndex>,
    nodes: HashMap<usize, NodeIndex>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token, returning the existing node if its index is already present
    pub fn add_token(&mut self, token: Token) -> NodeIndex {
        if let Some(&node) = self.nodes.get(&token.index) {
            return node;
        }
        let index = token.index;
        let node = self.graph.add_node(token);
        self.nodes.insert(index, node);
        node
    }

    /// Mark a token as a root of the graph
    pub fn add_root(&mut self, token: Token) {
        let node = self.add_token(token);
        if !self.roots.contains(&node) {
            self.roots.push(node);
        }
    }

    /// Add a head -> dependent edge
    pub fn add_edge(&mut self, head: Token, dependent: Token, relation: impl Into<String>) {
        let source = self.add_token(head);
        let target = self.add_token(dependent);
        self.graph.add_edge(source, target, relation.into());
    }

    /// Build a graph from a dependency record over the sentence tokens
    pub fn from_record(tokens: &[Token], record: &DependencyRecord) -> Result<Self> {
        let lookup = |index: usize| -> Result<Token> {
            tokens.get(index).cloned().ok_or_else(|| {
                CoreError::InvalidAnnotation(format!(
                    "dependency token index {} out of range ({} tokens)",
                    index,
                    tokens.len()
                ))
            })
        };

        let mut graph = Self::new();
        for &root in &record.roots {
            graph.add_root(lookup(root)?);
        }
        for edge in &record.edges {
            graph.add_edge(lookup(edge.source)?, lookup(edge.target)?, &edge.relation);
        }
        Ok(graph)
    }

    /// Root tokens
    pub fn roots(&self) -> impl Iterator<Item = &Token> + '_ {
        self.roots.iter().map(move |&n| &self.graph[n])
    }

    /// Dependents of a token (by sentence index)
    pub fn children(&self, index: usize) -> impl Iterator<Item = &Token> + '_ {
        self.nodes
            .get(&index)
            .into_iter()
            .flat_map(move |&n| self.graph.neighbors_directed(n, Direction::Outgoing))
            .map(move |n| &self.graph[n])
    }

    /// All edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = DependencyEdge<'_>> + '_ {
        self.graph.edge_references().map(move |e| DependencyEdge {
            source: &self.graph[e.source()],
            target: &self.graph[e.target()],
            relation: e.weight().as_str(),
        })
    }

    /// Number of tokens in the graph
    pub fn token_count(&self) -> usize {
        self.graph.node_count()
    }
}

// ============================================================================
// Mentions and Raw Triples
// ============================================================================

/// A named-entity mention produced by the NER stage
#[derive(Debug, Clone, PartialEq)]
pub struct NamedEntityMention {
    pub tokens: Vec<Token>,
    pub entity_type: String,
    pub text: String,
}

/// An OpenIE extraction before any splitting
#[derive(Debug, Clone)]
pub struct RawTriple {
    /// Extractor confidence (0.0 - 1.0)
    pub confidence: f64,
    pub subject: Vec<Token>,
    pub relation: String,
    pub object: Vec<Token>,
    /// Triple-local dependency subtree, preferred over the sentence graph
    pub tree: Option<Arc<DependencyGraph>>,
}

/// One annotated sentence
#[derive(Debug, Clone)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    pub graph: Arc<DependencyGraph>,
    pub triples: Vec<RawTriple>,
    pub mentions: Vec<NamedEntityMention>,
}

/// One annotated document
#[derive(Debug, Clone)]
pub struct Document {
    /// Path of the original text the annotations came from
    pub source: String,
    pub sentences: Vec<Sentence>,
}

// ============================================================================
// JSON Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub text: String,
    #[serde(default)]
    pub lemma: Option<String>,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: usize,
    pub target: usize,
    pub relation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyRecord {
    #[serde(default)]
    pub roots: Vec<usize>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripleRecord {
    pub confidence: f64,
    pub subject: Vec<usize>,
    pub relation: String,
    pub object: Vec<usize>,
    #[serde(default)]
    pub tree: Option<DependencyRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionRecord {
    pub tokens: Vec<usize>,
    pub entity_type: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub tokens: Vec<TokenRecord>,
    #[serde(default)]
    pub dependencies: DependencyRecord,
    #[serde(default)]
    pub triples: Vec<TripleRecord>,
    #[serde(default)]
    pub mentions: Vec<MentionRecord>,
}

/// Serialized form of an annotated document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub source: Option<String>,
    pub sentences: Vec<SentenceRecord>,
}

impl SentenceRecord {
    /// Resolve token indices into a [`Sentence`]
    pub fn into_sentence(self) -> Result<Sentence> {
        let tokens: Vec<Token> = self
            .tokens
            .into_iter()
            .enumerate()
            .map(|(index, t)| {
                let lemma = t.lemma.unwrap_or_else(|| t.text.to_lowercase());
                Token::new(t.text, lemma, t.tag, index)
            })
            .collect();

        let graph = Arc::new(DependencyGraph::from_record(&tokens, &self.dependencies)?);

        let triples = self
            .triples
            .into_iter()
            .map(|t| {
                let tree = t
                    .tree
                    .as_ref()
                    .map(|record| DependencyGraph::from_record(&tokens, record).map(Arc::new))
                    .transpose()?;
                Ok(RawTriple {
                    confidence: t.confidence,
                    subject: span(&tokens, &t.subject, "triple subject")?,
                    relation: t.relation,
                    object: span(&tokens, &t.object, "triple object")?,
                    tree,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mentions = self
            .mentions
            .into_iter()
            .map(|m| {
                Ok(NamedEntityMention {
                    tokens: span(&tokens, &m.tokens, "mention")?,
                    entity_type: m.entity_type,
                    text: m.text,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Sentence {
            tokens,
            graph,
            triples,
            mentions,
        })
    }
}

impl DocumentRecord {
    /// Resolve all sentences, using `fallback_source` when the record names none
    pub fn into_document(self, fallback_source: impl Into<String>) -> Result<Document> {
        let source = self.source.unwrap_or_else(|| fallback_source.into());
        let sentences = self
            .sentences
            .into_iter()
            .map(SentenceRecord::into_sentence)
            .collect::<Result<Vec<_>>>()?;
        Ok(Document { source, sentences })
    }
}

fn span(tokens: &[Token], indices: &[usize], what: &str) -> Result<Vec<Token>> {
    if indices.is_empty() {
        return Err(CoreError::InvalidAnnotation(format!("{} span is empty", what)));
    }
    indices
        .iter()
        .map(|&i| {
            tokens.get(i).cloned().ok_or_else(|| {
                CoreError::InvalidAnnotation(format!(
                    "{} token index {} out of range ({} tokens)",
                    what,
                    i,
                    tokens.len()
                ))
            })
        })
        .collect()
}

// ============================================================================
// JSON Annotation Source
// ============================================================================

/// Loads annotated documents from JSON files
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAnnotationSource;

impl JsonAnnotationSource {
    /// Parse a document from a JSON string
    pub fn parse(&self, json: &str, fallback_source: &str) -> Result<Document> {
        let record: DocumentRecord =
            serde_json::from_str(json).map_err(|e| CoreError::ParseError {
                path: fallback_source.into(),
                source: e,
            })?;
        record.into_document(fallback_source)
    }
}

impl AnnotationSource for JsonAnnotationSource {
    fn load(&self, path: &Path) -> Result<Document> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse(&content, &path.to_string_lossy())
    }
}

// ============================================================================
// Tests
// ============================================================================
