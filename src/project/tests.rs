//! Unit tests for project persistence

use crate::config::EditorConfig;
use crate::project::{JsonFileStore, ProjectDocument, ProjectError, ProjectLibrary};

const STORED: &str = r#"{
  "p1": {
    "projectName": "Turnstile",
    "description": "coin operated",
    "lastEditTime": 1700000000000,
    "graph": {
      "nodes": [
        { "name": "Locked", "x": 0, "y": 0, "visible": true, "adj": [0] },
        { "name": "Unlocked", "x": 200, "y": 0, "visible": true, "adj": [1] }
      ],
      "edges": [
        { "from": 0, "to": 1, "events": ["coin"], "visible": true },
        { "from": 1, "to": 0, "events": ["push"], "visible": true }
      ]
    },
    "events": ["coin", "push", "kick"],
    "entryNode": 0,
    "eventQueue": ["coin", "push", "coin"]
  },
  "p2": {
    "projectName": "Fresh",
    "description": "",
    "lastEditTime": 1800000000000,
    "graph": { "nodes": [], "edges": [] },
    "events": []
  }
}"#;

fn config() -> EditorConfig {
    EditorConfig {
        seed: Some(1),
        ..EditorConfig::default()
    }
}

#[test]
fn test_load_document() {
    let library = ProjectLibrary::from_json_str(STORED).unwrap();
    assert_eq!(library.len(), 2);

    let editor = library.open("p1", &config()).unwrap();
    let graph = editor.graph();
    assert_eq!(graph.nodes()[1].name, "Unlocked");
    assert_eq!(graph.nodes()[0].adjacency, vec![0]);
    assert_eq!(graph.entry_node(), Some(0));
    assert!(graph.event_labels().contains("kick"));

    let ids: Vec<u64> = editor.queue().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(editor.history().len(), 1);
    assert_eq!(editor.run().current_node(), Some(0));
}

#[test]
fn test_missing_optional_fields() {
    let library = ProjectLibrary::from_json_str(STORED).unwrap();
    let doc = library.get("p2").unwrap();
    assert_eq!(doc.entry_node, None);
    assert!(doc.event_queue.is_empty());

    let editor = doc.open(&config()).unwrap();
    assert!(editor.graph().nodes().is_empty());
}

#[test]
fn test_adjacency_alias() {
    let json = r#"{ "name": "A", "x": 1, "y": 2, "adjacency": [3] }"#;
    let node: crate::graph::Node = serde_json::from_str(json).unwrap();
    assert_eq!(node.adjacency, vec![3]);
    assert!(node.visible);
}

#[test]
fn test_unknown_project() {
    let library = ProjectLibrary::from_json_str(STORED).unwrap();
    let err = library.open("nope", &config()).unwrap_err();
    assert!(matches!(err, ProjectError::EmptyProjectReference(ref id) if id == "nope"));
    assert!(err.to_string().contains("invalid project"));
}

#[test]
fn test_corrupt_graph_is_rejected() {
    let mut doc = ProjectDocument::new("Broken", "");
    doc.entry_node = Some(4);
    assert!(matches!(
        doc.open(&config()),
        Err(ProjectError::Graph(_))
    ));
}

#[test]
fn test_save_writes_editor_state() {
    let mut library = ProjectLibrary::from_json_str(STORED).unwrap();
    let mut editor = library.open("p1", &config()).unwrap();

    let n = editor.add_node(400.0, 0.0);
    editor.rename_node(n, "Broken").unwrap();
    editor.clear_queue();
    editor.enqueue("kick");
    library.save("p1", &editor).unwrap();

    let doc = library.get("p1").unwrap();
    assert_eq!(doc.graph.nodes.len(), 3);
    assert_eq!(doc.graph.nodes[2].name, "Broken");
    assert_eq!(doc.event_queue, vec!["kick"]);
    assert!(doc.last_edit_time > 1_700_000_000_000);

    let json = library.to_json_string().unwrap();
    assert!(json.contains("\"eventQueue\""));
    assert!(json.contains("\"adj\""));
}

#[test]
fn test_create_rename_delete() {
    let mut library = ProjectLibrary::new();
    let id = library.create("", "notes");
    assert_eq!(library.get(&id).unwrap().project_name, "Untitled");

    library.rename(&id, "Door").unwrap();
    library.set_description(&id, "a door").unwrap();
    let doc = library.get(&id).unwrap();
    assert_eq!(doc.project_name, "Door");
    assert_eq!(doc.description, "a door");

    library.rename(&id, "").unwrap();
    assert_eq!(library.get(&id).unwrap().project_name, "Untitled");

    library.delete(&id).unwrap();
    assert!(library.is_empty());
    assert!(library.delete(&id).is_err());
    assert!(library.rename(&id, "x").is_err());
}

#[test]
fn test_recent_orders_newest_first() {
    let library = ProjectLibrary::from_json_str(STORED).unwrap();
    let ids: Vec<&str> = library.recent().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["p2", "p1"]);
}

#[test]
fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("library.json"));

    let empty = store.load().unwrap();
    assert!(empty.is_empty());

    let library = ProjectLibrary::from_json_str(STORED).unwrap();
    store.store(&library).unwrap();
    assert_eq!(store.load().unwrap(), library);
}

#[test]
fn test_file_store_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.json");
    std::fs::write(&path, "[1, 2").unwrap();
    assert!(matches!(
        JsonFileStore::new(path).load(),
        Err(ProjectError::Json(_))
    ));
}
