//! Entity module
//!
//! An entity is a span of tokens that may become a node of the output
//! graph. Entities are immutable once their direct subset is bound; the
//! subset is attached exactly once, smallest spans first, so every
//! subset member is itself fully bound.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, OnceLock};

use ctxkg_core::{render_tokens, CleaningConfig, DependencyGraph, NamedEntityMention, Token};
use uuid::Uuid;

use crate::splitter::EntitySplitter;

/// A candidate node of the knowledge graph
#[derive(Debug, Clone)]
pub struct Entity {
    tokens: Vec<Token>,
    text: String,
    mention: Option<NamedEntityMention>,
    graph: Arc<DependencyGraph>,
    group_id: Uuid,
    subset: Vec<Arc<Entity>>,
    tree_level: OnceLock<Option<usize>>,
    remainder: OnceLock<Vec<Arc<Entity>>>,
}

impl Entity {
    /// Create an entity from tokens and their rendered text
    pub fn new(
        tokens: Vec<Token>,
        text: impl Into<String>,
        graph: Arc<DependencyGraph>,
        group_id: Uuid,
    ) -> Self {
        Self {
            tokens,
            text: text.into(),
            mention: None,
            graph,
            group_id,
            subset: Vec::new(),
            tree_level: OnceLock::new(),
            remainder: OnceLock::new(),
        }
    }

    /// Create an entity whose text is rendered from its tokens
    pub fn from_tokens(tokens: Vec<Token>, graph: Arc<DependencyGraph>, group_id: Uuid) -> Self {
        let text = render_tokens(&tokens);
        Self::new(tokens, text, graph, group_id)
    }

    /// Create an entity backed by a named-entity mention
    pub fn from_mention(
        mention: NamedEntityMention,
        graph: Arc<DependencyGraph>,
        group_id: Uuid,
    ) -> Self {
        Self::new(mention.tokens.clone(), mention.text.clone(), graph, group_id)
            .with_named_entity(mention)
    }

    /// Attach a named-entity mention
    pub fn with_named_entity(mut self, mention: NamedEntityMention) -> Self {
        self.mention = Some(mention);
        self
    }

    /// Bind the direct subset
    pub fn with_subset(mut self, subset: Vec<Arc<Entity>>) -> Self {
        self.subset = subset;
        self.remainder = OnceLock::new();
        self
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mention(&self) -> Option<&NamedEntityMention> {
        self.mention.as_ref()
    }

    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn subset(&self) -> &[Arc<Entity>] {
        &self.subset
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Sentence positions of the tokens, in entity order
    pub fn span(&self) -> Vec<usize> {
        self.tokens.iter().map(|t| t.index).collect()
    }

    /// Whether the entity covers the token at this position
    pub fn contains_index(&self, index: usize) -> bool {
        self.tokens.iter().any(|t| t.index == index)
    }

    /// Stable identifier used as the join key of output rows
    ///
    /// Mention-backed entities are identified by type and text, so the same
    /// mention yields the same ID regardless of its span. Other entities
    /// are identified by group id and token fingerprints.
    pub fn id(&self) -> String {
        let raw = match &self.mention {
            Some(mention) => format!("NE-{}-{}", mention.entity_type, mention.text),
            None => {
                let mut id = self.group_id.to_string();
                for token in &self.tokens {
                    id.push('-');
                    id.push_str(&token.fingerprint());
                }
                id
            }
        };
        collapse_whitespace(&raw)
    }

    /// Whether every token of the entity carries a droppable tag
    pub fn can_be_dropped(&self, rules: &CleaningConfig) -> bool {
        self.tokens.iter().all(|t| rules.is_droppable(&t.tag))
    }

    /// Output form: droppable tokens removed, trimmable tokens cut from both ends
    pub fn clean_form(&self, rules: &CleaningConfig) -> Entity {
        let mut tokens: Vec<Token> = self
            .tokens
            .iter()
            .filter(|t| !rules.is_droppable(&t.tag))
            .cloned()
            .collect();

        loop {
            let mut changed = false;
            if tokens.first().is_some_and(|t| rules.is_trimmable(&t.tag)) {
                tokens.remove(0);
                changed = true;
            }
            if tokens.last().is_some_and(|t| rules.is_trimmable(&t.tag)) {
                tokens.pop();
                changed = true;
            }
            if !changed {
                break;
            }
        }

        let mut clean = Entity::from_tokens(tokens, Arc::clone(&self.graph), self.group_id);
        clean.mention = self.mention.clone();
        clean
    }

    /// Shortest dependency distance from a root to any token of the entity
    ///
    /// `None` when no token of the entity is reachable from a root.
    pub fn tree_level(&self) -> Option<usize> {
        *self.tree_level.get_or_init(|| self.compute_tree_level())
    }

    fn compute_tree_level(&self) -> Option<usize> {
        let members: HashSet<usize> = self.tokens.iter().map(|t| t.index).collect();
        let mut visited: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

        for root in self.graph.roots() {
            if visited.insert(root.index) {
                queue.push_back((root.index, 0));
            }
        }

        while let Some((index, level)) = queue.pop_front() {
            if members.contains(&index) {
                return Some(level);
            }
            for child in self.graph.children(index) {
                if visited.insert(child.index) {
                    queue.push_back((child.index, level + 1));
                }
            }
        }

        None
    }

    /// Maximal contiguous runs of tokens not covered by any subset member
    ///
    /// Contiguity follows the entity's own token order: a subset token
    /// between two remaining tokens separates their runs. Computed once,
    /// so the runs keep their memoized tree levels across calls.
    pub fn remainder_runs(&self) -> &[Arc<Entity>] {
        self.remainder.get_or_init(|| self.compute_remainder_runs())
    }

    fn compute_remainder_runs(&self) -> Vec<Arc<Entity>> {
        let covered = |token: &Token| self.subset.iter().any(|s| s.contains_index(token.index));

        let mut runs: Vec<Vec<Token>> = Vec::new();
        let mut current: Vec<Token> = Vec::new();
        for token in &self.tokens {
            if covered(token) {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            } else {
                current.push(token.clone());
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }

        runs.into_iter()
            .map(|tokens| {
                Arc::new(Entity::from_tokens(tokens, Arc::clone(&self.graph), self.group_id))
            })
            .collect()
    }

    /// Canonical leaf this entity resolves to for output
    ///
    /// An entity without subset is its own final entity; otherwise the
    /// final entity of its main partial entity.
    pub fn final_entity(self: &Arc<Self>, rules: &CleaningConfig) -> Arc<Entity> {
        if self.subset.is_empty() {
            return Arc::clone(self);
        }
        match EntitySplitter::new(self, rules).main_partial_entity() {
            Some(main) => main.final_entity(rules),
            None => Arc::clone(self),
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Entity {}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mention {
            Some(_) => write!(f, "<Entity NER text=\"{}\" span={:?}>", self.text, self.span()),
            None => write!(f, "<Entity text=\"{}\" span={:?}>", self.text, self.span()),
        }
    }
}

/// Replace every run of whitespace with a single hyphen
fn collapse_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_whitespace = false;
    for c in value.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('-');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{car_sentence, token};

    fn entity(tokens: Vec<Token>) -> Entity {
        Entity::from_tokens(tokens, Arc::new(DependencyGraph::new()), Uuid::nil())
    }

    #[test]
    fn test_id_from_tokens() {
        let group = Uuid::nil();
        let e = Entity::from_tokens(
            vec![token("red", "JJ", 1), token("car", "NN", 2)],
            Arc::new(DependencyGraph::new()),
            group,
        );
        assert_eq!(e.id(), format!("{}-red_1_JJ-car_2_NN", group));
    }

    #[test]
    fn test_id_from_mention_ignores_span() {
        let mention = |index| NamedEntityMention {
            tokens: vec![token("Barack", "NNP", index), token("Obama", "NNP", index + 1)],
            entity_type: "PERSON".to_string(),
            text: "Barack Obama".to_string(),
        };
        let graph = Arc::new(DependencyGraph::new());
        let a = Entity::from_mention(mention(0), Arc::clone(&graph), Uuid::new_v4());
        let b = Entity::from_mention(mention(7), graph, Uuid::new_v4());

        assert_eq!(a.id(), "NE-PERSON-Barack-Obama");
        assert_eq!(a, b);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("New  York\tCity"), "New-York-City");
        assert_eq!(collapse_whitespace("plain"), "plain");
    }

    #[test]
    fn test_clean_form_drops_and_trims() {
        let rules = CleaningConfig::default();
        let e = entity(vec![
            token("in", "IN", 0),
            token("John", "NNP", 1),
            token("'s", "POS", 2),
            token("house", "NN", 3),
            token("built", "VBN", 4),
        ]);

        let clean = e.clean_form(&rules);
        assert_eq!(clean.text(), "John house");
        assert_eq!(clean.span(), vec![1, 3]);
    }

    #[test]
    fn test_clean_form_repeats_trimming() {
        let rules = CleaningConfig::default();
        let e = entity(vec![
            token("of", "IN", 0),
            token("is", "VBZ", 1),
            token("car", "NN", 2),
            token("go", "VB", 3),
            token("to", "IN", 4),
        ]);
        assert_eq!(e.clean_form(&rules).text(), "car");
    }

    #[test]
    fn test_clean_form_keeps_mention() {
        let rules = CleaningConfig::default();
        let mention = NamedEntityMention {
            tokens: vec![token("Paris", "NNP", 0), token(",", ",", 1)],
            entity_type: "CITY".to_string(),
            text: "Paris".to_string(),
        };
        let e = Entity::from_mention(mention, Arc::new(DependencyGraph::new()), Uuid::nil());
        let clean = e.clean_form(&rules);
        assert_eq!(clean.text(), "Paris");
        assert_eq!(clean.id(), "NE-CITY-Paris");
    }

    #[test]
    fn test_can_be_dropped() {
        let rules = CleaningConfig::default();
        assert!(entity(vec![token("'s", "POS", 3)]).can_be_dropped(&rules));
        assert!(!entity(vec![token("'s", "POS", 3), token("car", "NN", 4)]).can_be_dropped(&rules));
        assert!(entity(vec![]).can_be_dropped(&rules));
    }

    #[test]
    fn test_tree_level() {
        let sentence = car_sentence();
        let level = |indices: &[usize]| {
            let tokens = indices.iter().map(|&i| sentence.tokens[i].clone()).collect();
            Entity::from_tokens(tokens, Arc::clone(&sentence.graph), Uuid::nil()).tree_level()
        };

        assert_eq!(level(&[4]), Some(0)); // fast
        assert_eq!(level(&[2]), Some(1)); // car
        assert_eq!(level(&[0, 1]), Some(2)); // the red
        assert_eq!(level(&[0, 1, 2]), Some(1));
    }

    #[test]
    fn test_tree_level_unreachable() {
        let e = entity(vec![token("orphan", "NN", 9)]);
        assert_eq!(e.tree_level(), None);
    }

    #[test]
    fn test_final_entity_without_subset_is_self() {
        let rules = CleaningConfig::default();
        let e = Arc::new(entity(vec![token("car", "NN", 2)]));
        assert!(Arc::ptr_eq(&e.final_entity(&rules), &e));
    }

    #[test]
    fn test_remainder_runs_are_computed_once() {
        let sentence = car_sentence();
        let red = Arc::new(Entity::from_tokens(
            vec![sentence.tokens[1].clone()],
            Arc::clone(&sentence.graph),
            Uuid::nil(),
        ));
        let whole = Entity::from_tokens(
            sentence.tokens[..3].to_vec(),
            Arc::clone(&sentence.graph),
            Uuid::nil(),
        )
        .with_subset(vec![red]);

        let first = whole.remainder_runs();
        let second = whole.remainder_runs();
        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first[1], &second[1]));
        assert_eq!(first[1].tree_level(), Some(1));
    }

    #[test]
    fn test_final_entity_is_stable_across_calls() {
        let rules = CleaningConfig::default();
        let sentence = car_sentence();
        let red = Arc::new(Entity::from_tokens(
            vec![sentence.tokens[1].clone()],
            Arc::clone(&sentence.graph),
            Uuid::nil(),
        ));
        let whole = Arc::new(
            Entity::from_tokens(
                sentence.tokens[1..3].to_vec(),
                Arc::clone(&sentence.graph),
                Uuid::nil(),
            )
            .with_subset(vec![red]),
        );

        let first = whole.final_entity(&rules);
        let second = whole.final_entity(&rules);
        assert_eq!(first.text(), "car");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_display() {
        let e = entity(vec![token("car", "NN", 2)]);
        assert_eq!(e.to_string(), "<Entity text=\"car\" span=[2]>");
    }
}
