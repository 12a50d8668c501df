//! Pipeline integration tests
//!
//! Drive the extractor from annotated-document JSON through to triple
//! files and edge-list graphs.

use ctxkg_core::{AppConfig, Document, JsonAnnotationSource};
use ctxkg_extractor::{EdgeListGraph, TripleAssembler, TripleFile, HEADER};
use serde_json::{json, Value};
use uuid::Uuid;

fn parse(document: Value) -> Document {
    JsonAnnotationSource
        .parse(&document.to_string(), "fixture.json")
        .unwrap()
}

fn tokens(entries: &[(&str, &str, &str)]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|(text, lemma, tag)| json!({"text": text, "lemma": lemma, "tag": tag}))
            .collect(),
    )
}

/// "The red car is fast" with "red" tagged as a COLOR mention
fn red_car() -> Value {
    json!({
        "source": "documents/car.txt",
        "sentences": [{
            "tokens": tokens(&[
                ("The", "the", "DT"),
                ("red", "red", "JJ"),
                ("car", "car", "NN"),
                ("is", "be", "VBZ"),
                ("fast", "fast", "JJ"),
            ]),
            "dependencies": {
                "roots": [4],
                "edges": [
                    {"source": 4, "target": 2, "relation": "nsubj"},
                    {"source": 4, "target": 3, "relation": "cop"},
                    {"source": 2, "target": 0, "relation": "det"},
                    {"source": 2, "target": 1, "relation": "amod"}
                ]
            },
            "triples": [
                {"confidence": 0.9, "subject": [0, 1, 2], "relation": "is", "object": [4]}
            ],
            "mentions": [
                {"tokens": [1], "entity_type": "COLOR", "text": "red"}
            ]
        }]
    })
}

/// "Obama 's dog chased a ball in Paris"
fn obama_dog() -> Value {
    json!({
        "source": "documents/dog.txt",
        "sentences": [{
            "tokens": tokens(&[
                ("Obama", "Obama", "NNP"),
                ("'s", "'s", "POS"),
                ("dog", "dog", "NN"),
                ("chased", "chase", "VBD"),
                ("a", "a", "DT"),
                ("ball", "ball", "NN"),
                ("in", "in", "IN"),
                ("Paris", "Paris", "NNP"),
            ]),
            "dependencies": {
                "roots": [3],
                "edges": [
                    {"source": 3, "target": 2, "relation": "nsubj"},
                    {"source": 2, "target": 0, "relation": "nmod:poss"},
                    {"source": 0, "target": 1, "relation": "case"},
                    {"source": 3, "target": 5, "relation": "obj"},
                    {"source": 5, "target": 4, "relation": "det"},
                    {"source": 3, "target": 7, "relation": "obl"},
                    {"source": 7, "target": 6, "relation": "case"}
                ]
            },
            "triples": [
                {"confidence": 0.8, "subject": [0, 1, 2], "relation": "chased", "object": [4, 5]},
                {"confidence": 0.6, "subject": [0, 1, 2], "relation": "chased a ball", "object": [6, 7]}
            ],
            "mentions": [
                {"tokens": [0], "entity_type": "PERSON", "text": "Obama"},
                {"tokens": [7], "entity_type": "CITY", "text": "Paris"}
            ]
        }]
    })
}

#[test]
fn test_red_car_end_to_end() {
    let mut config = AppConfig::default();
    config.cleaning.droppable_tags.push("DT".to_string());
    let assembler = TripleAssembler::from_config(&config);

    let group = Uuid::new_v4();
    let output = assembler
        .process_document_with_group(&parse(red_car()), group)
        .unwrap();

    assert_eq!(
        output.rows(),
        &[
            format!("0.9;car;is;fast;{g}-car_2_NN;{g}-fast_4_JJ", g = group),
            format!("1.0;red;is;car;NE-COLOR-red;{g}-car_2_NN", g = group),
        ]
    );
}

#[test]
fn test_possessive_split() {
    let group = Uuid::new_v4();
    let output = TripleAssembler::default()
        .process_document_with_group(&parse(obama_dog()), group)
        .unwrap();
    let rows = output.rows();

    // Composite subject resolves to its head; the possessor hangs off it
    assert!(rows.contains(&format!(
        "0.8;dog;chased;a ball;{g}-dog_2_NN;{g}-a_4_DT-ball_5_NN",
        g = group
    )));
    assert!(rows.contains(&format!(
        "1.0;dog;has;Obama;{g}-dog_2_NN;NE-PERSON-Obama",
        g = group
    )));
    // "in Paris" resolves to the Paris mention it contains
    assert!(rows.contains(&format!(
        "0.6;dog;chased a ball;Paris;{g}-dog_2_NN;NE-CITY-Paris",
        g = group
    )));

    // The derivative row is written once although both triples split the subject
    let derived = rows.iter().filter(|r| r.contains(";has;")).count();
    assert_eq!(derived, 1);
}

#[test]
fn test_custom_relation_rules() {
    let config = AppConfig::from_toml_str(
        r#"
        [[relations]]
        label = "nmod:poss"
        phrase = "owns"
        swap = false
        "#,
    )
    .unwrap();

    let output = TripleAssembler::from_config(&config)
        .process_document_with_group(&parse(obama_dog()), Uuid::nil())
        .unwrap();

    assert!(output
        .rows()
        .iter()
        .any(|r| r.starts_with("1.0;Obama;owns;dog;")));
}

#[test]
fn test_rendered_file_round_trips_through_loader() {
    let output = TripleAssembler::default()
        .process_document(&parse(obama_dog()))
        .unwrap();
    let rendered = output.render();

    let file = TripleFile::parse(&rendered).unwrap();
    assert_eq!(file.source.as_deref(), Some("documents/dog.txt"));
    assert_eq!(file.rows.len(), output.len());

    let mut graph = EdgeListGraph::from_rows("documents/dog.txt", &file.rows);
    let report = graph.clean();
    assert_eq!(report.self_loops, 0);
    assert_eq!(graph.entity_text("NE-PERSON-Obama"), Some("Obama"));

    let value: Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
    assert_eq!(value["graph"].as_array().unwrap().len(), graph.edges().len());
}

/// A subject token that carries the column separator
fn separator_in_token() -> Value {
    json!({
        "source": "documents/team.txt",
        "sentences": [{
            "tokens": tokens(&[
                ("R&D;ops", "r&d;ops", "NN"),
                ("grew", "grow", "VBD"),
                ("fast", "fast", "RB"),
            ]),
            "dependencies": {
                "roots": [1],
                "edges": [
                    {"source": 1, "target": 0, "relation": "nsubj"},
                    {"source": 1, "target": 2, "relation": "advmod"}
                ]
            },
            "triples": [
                {"confidence": 0.8, "subject": [0], "relation": "grew", "object": [2]}
            ],
            "mentions": []
        }]
    })
}

#[test]
fn test_separator_in_token_round_trips_through_loader() {
    let group = Uuid::new_v4();
    let output = TripleAssembler::default()
        .process_document_with_group(&parse(separator_in_token()), group)
        .unwrap();
    assert_eq!(
        output.rows(),
        &[format!(
            "0.8;R&D,ops;grew;fast;{g}-r&d,ops_0_NN;{g}-fast_2_RB",
            g = group
        )]
    );

    let file = TripleFile::parse(&output.render()).unwrap();
    assert_eq!(file.rows.len(), 1);
    assert_eq!(file.rows[0].subject, "R&D,ops");
    assert_eq!(file.rows[0].subject_id, format!("{}-r&d,ops_0_NN", group));
    assert_eq!(file.rows[0].object, "fast");
}

#[test]
fn test_header_layout() {
    let output = TripleAssembler::default()
        .process_document(&parse(json!({"source": "empty.txt", "sentences": []})))
        .unwrap();
    assert_eq!(output.render(), format!("# empty.txt\n{}\n", HEADER));
}

#[test]
fn test_runs_are_deterministic() {
    let document = parse(obama_dog());
    let assembler = TripleAssembler::default();
    let group = Uuid::new_v4();

    let first = assembler.process_document_with_group(&document, group).unwrap();
    let second = assembler.process_document_with_group(&document, group).unwrap();
    assert_eq!(first.rows(), second.rows());
}

#[test]
fn test_no_self_loops_or_empty_sides() {
    let output = TripleAssembler::default()
        .process_document(&parse(obama_dog()))
        .unwrap();

    for row in output.rows() {
        let fields: Vec<&str> = row.split(';').collect();
        assert_eq!(fields.len(), 6, "row {}", row);
        assert!(!fields[1].is_empty() && !fields[3].is_empty(), "row {}", row);
        assert_ne!(fields[4], fields[5], "row {}", row);
    }
}
