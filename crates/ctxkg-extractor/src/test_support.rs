//! Shared fixtures for unit tests

use std::sync::Arc;

use ctxkg_core::{DependencyGraph, NamedEntityMention, RawTriple, Sentence, Token};
use uuid::Uuid;

use crate::entity::Entity;

/// Token whose lemma is its lowercased text
pub fn token(text: &str, tag: &str, index: usize) -> Token {
    Token::new(text, text.to_lowercase(), tag, index)
}

/// "The red car is fast", rooted at "fast"
pub fn car_sentence() -> Sentence {
    let tokens = vec![
        token("The", "DT", 0),
        token("red", "JJ", 1),
        token("car", "NN", 2),
        Token::new("is", "be", "VBZ", 3),
        token("fast", "JJ", 4),
    ];

    let mut graph = DependencyGraph::new();
    graph.add_root(tokens[4].clone());
    graph.add_edge(tokens[4].clone(), tokens[2].clone(), "nsubj");
    graph.add_edge(tokens[4].clone(), tokens[3].clone(), "cop");
    graph.add_edge(tokens[2].clone(), tokens[0].clone(), "det");
    graph.add_edge(tokens[2].clone(), tokens[1].clone(), "amod");

    Sentence {
        tokens,
        graph: Arc::new(graph),
        triples: Vec::new(),
        mentions: Vec::new(),
    }
}

fn pick(sentence: &Sentence, indices: &[usize]) -> Vec<Token> {
    indices.iter().map(|&i| sentence.tokens[i].clone()).collect()
}

/// Entity over the given sentence positions, using the sentence graph
pub fn span_entity(sentence: &Sentence, indices: &[usize]) -> Entity {
    Entity::from_tokens(pick(sentence, indices), Arc::clone(&sentence.graph), Uuid::nil())
}

pub fn raw_triple(
    sentence: &Sentence,
    confidence: f64,
    subject: &[usize],
    relation: &str,
    object: &[usize],
) -> RawTriple {
    RawTriple {
        confidence,
        subject: pick(sentence, subject),
        relation: relation.to_string(),
        object: pick(sentence, object),
        tree: None,
    }
}

pub fn mention(
    sentence: &Sentence,
    indices: &[usize],
    entity_type: &str,
    text: &str,
) -> NamedEntityMention {
    NamedEntityMention {
        tokens: pick(sentence, indices),
        entity_type: entity_type.to_string(),
        text: text.to_string(),
    }
}
