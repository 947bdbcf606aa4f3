//! Unit tests for the editor session

use std::time::{Duration, Instant};

use crate::config::EditorConfig;
use crate::editor::{Editor, Selection};
use crate::graph::{EdgeToggle, GraphError, GraphSnapshot};
use crate::sim::ScriptedPicker;

fn editor() -> Editor {
    let mut ed = Editor::new(&EditorConfig::default());
    ed.set_picker(Box::new(ScriptedPicker::default()));
    ed
}

/// A --x--> B, entry at A
fn turnstile() -> Editor {
    let mut ed = editor();
    let a = ed.add_node(0.0, 0.0);
    let b = ed.add_node(200.0, 0.0);
    ed.toggle_edge(a, b).unwrap();
    ed.set_edge_events(0, ["x"]).unwrap();
    ed.set_entry_node(Some(a)).unwrap();
    ed
}

#[test]
fn test_every_edit_is_recorded() {
    let ed = turnstile();
    // initial + 5 edits
    assert_eq!(ed.history().len(), 6);
    assert_eq!(ed.history().time(), 5);
    assert_eq!(**ed.history().current(), *ed.graph());
}

#[test]
fn test_undo_all_then_redo_all() {
    let mut ed = turnstile();
    let before = ed.graph().clone();

    while ed.undo() {}
    assert_eq!(*ed.graph(), GraphSnapshot::default());
    while ed.redo() {}
    assert_eq!(*ed.graph(), before);
}

#[test]
fn test_edit_after_undo_discards_redo() {
    let mut ed = turnstile();
    assert!(ed.undo());
    ed.add_node(5.0, 5.0);
    assert!(!ed.redo());
    assert!(!ed.history().can_redo());
}

#[test]
fn test_transient_move_skips_history() {
    let mut ed = turnstile();
    ed.set_align_to_grid(true);
    let len = ed.history().len();

    ed.move_node(0, 12.0, 38.0, false).unwrap();
    ed.move_node(0, 23.0, 61.0, false).unwrap();
    assert_eq!(ed.history().len(), len);
    assert_eq!(ed.graph().nodes()[0].x, 23.0);

    ed.move_node(0, 23.0, 61.0, true).unwrap();
    assert_eq!(ed.history().len(), len + 1);
    let node = &ed.graph().nodes()[0];
    assert_eq!((node.x, node.y), (0.0, 50.0));
}

#[test]
fn test_undo_after_drag_returns_to_last_commit() {
    let mut ed = turnstile();
    ed.move_node(1, 999.0, 999.0, false).unwrap();
    ed.commit();
    assert!(ed.undo());
    assert_eq!(ed.graph().nodes()[1].x, 200.0);
}

#[test]
fn test_self_loop_is_rejected_without_side_effects() {
    let mut ed = turnstile();
    ed.enqueue("x");
    ed.step().unwrap();
    let len = ed.history().len();

    assert_eq!(ed.toggle_edge(1, 1), Err(GraphError::SelfLoopRejected(1)));
    assert_eq!(ed.history().len(), len);
    assert_eq!(ed.run().cursor(), 0);
}

#[test]
fn test_toggle_edge_through_editor() {
    let mut ed = turnstile();
    assert_eq!(ed.toggle_edge(0, 1).unwrap(), EdgeToggle::Removed(0));
    assert_eq!(ed.toggle_edge(0, 1).unwrap(), EdgeToggle::Added(1));
}

#[test]
fn test_delete_selection() {
    let mut ed = turnstile();
    ed.delete_selection(Selection::Edge(0)).unwrap();
    assert!(!ed.graph().edges()[0].visible);
    ed.delete_selection(Selection::Node(1)).unwrap();
    assert!(!ed.graph().nodes()[1].visible);
    assert!(ed.delete_selection(Selection::Node(7)).is_err());
}

#[test]
fn test_edit_resets_run() {
    let mut ed = turnstile();
    ed.enqueue("x");
    ed.step().unwrap();
    assert_eq!(ed.run().current_node(), Some(1));

    ed.rename_node(1, "Open").unwrap();
    assert_eq!(ed.run().cursor(), -1);
    assert_eq!(ed.run().current_node(), Some(0));
}

#[test]
fn test_undo_resets_run_to_snapshot_entry() {
    let mut ed = turnstile();
    ed.set_entry_node(Some(1)).unwrap();
    assert_eq!(ed.run().current_node(), Some(1));
    ed.undo();
    assert_eq!(ed.run().current_node(), Some(0));
    ed.undo();
    assert_eq!(ed.run().current_node(), None);
}

#[test]
fn test_simulation_scenario() {
    let mut ed = turnstile();
    ed.enqueue("x");
    ed.toggle_run_panel();

    let step = ed.step().unwrap();
    assert_eq!((step.from, step.to), (0, 1));
    assert_eq!(ed.run().cursor(), 0);
    assert_eq!(ed.last_transition(), Some(0));

    assert_eq!(ed.step_back(), Some(0));
    assert_eq!(ed.run().cursor(), -1);
    assert_eq!(ed.run().current_node(), Some(0));
}

#[test]
fn test_highlight_uses_edge_taken_not_first_match() {
    let mut ed = editor();
    let a = ed.add_node(0.0, 0.0);
    let b = ed.add_node(200.0, 0.0);
    assert_eq!(ed.toggle_edge(a, b).unwrap(), EdgeToggle::Added(0));
    assert_eq!(ed.toggle_edge(a, b).unwrap(), EdgeToggle::Removed(0));
    assert_eq!(ed.toggle_edge(a, b).unwrap(), EdgeToggle::Added(1));
    ed.set_edge_events(1, ["x"]).unwrap();
    ed.set_entry_node(Some(a)).unwrap();
    ed.enqueue("x");

    assert_eq!(ed.step().unwrap().edge, Some(1));
    assert_eq!(ed.last_transition(), Some(1));
}

#[test]
fn test_run_steps_returns_each_step() {
    let mut ed = turnstile();
    ed.enqueue("x");
    ed.enqueue("y");
    ed.enqueue("x");

    let steps = ed.run_steps(2);
    assert_eq!(steps.iter().map(|s| (s.from, s.to)).collect::<Vec<_>>(), vec![(0, 1), (1, 1)]);
    assert_eq!(ed.run_to_end().len(), 1);
    assert!(ed.run_to_end().is_empty());
}

#[test]
fn test_simulation_does_not_touch_graph_or_history() {
    let mut ed = turnstile();
    ed.enqueue("x");
    ed.enqueue("y");
    let len = ed.history().len();
    let graph = ed.graph().clone();

    ed.run_to_end();
    assert_eq!(ed.history().len(), len);
    assert_eq!(*ed.graph(), graph);
}

#[test]
fn test_queue_mutations_reset_run() {
    let mut ed = turnstile();
    let x = ed.enqueue("x");
    ed.step().unwrap();
    ed.enqueue("y");
    assert_eq!(ed.run().cursor(), -1);

    ed.step().unwrap();
    assert!(ed.remove_event(x));
    assert_eq!(ed.run().cursor(), -1);
    assert!(!ed.remove_event(x));

    ed.step().unwrap();
    ed.clear_queue();
    assert_eq!(ed.run().cursor(), -1);
    assert!(ed.queue().is_empty());
}

#[test]
fn test_reorder_of_pending_events_keeps_run() {
    let mut ed = turnstile();
    ed.enqueue("x");
    let y = ed.enqueue("y");
    let z = ed.enqueue("z");
    ed.step().unwrap();

    assert!(ed.move_event(z, 1));
    assert_eq!(ed.queue().names(), vec!["x", "z", "y"]);
    assert_eq!(ed.run().cursor(), 0);

    assert!(ed.move_event(y, 0));
    assert_eq!(ed.run().cursor(), -1);
    assert!(!ed.move_event(99, 0));
}

#[test]
fn test_enqueue_label_requires_known_label() {
    let mut ed = turnstile();
    assert!(ed.enqueue_label("x").is_some());
    assert!(ed.enqueue_label("nope").is_none());
    assert_eq!(ed.queue().len(), 1);
}

#[test]
fn test_set_edge_events_text_and_prune() {
    let mut ed = turnstile();
    ed.set_edge_events_text(0, "coin, push").unwrap();
    assert_eq!(ed.graph().event_labels().len(), 3);

    ed.prune_event_labels();
    let labels: Vec<_> = ed.graph().event_labels().iter().cloned().collect();
    assert_eq!(labels, vec!["coin", "push"]);

    // pruning is an ordinary commit and can be undone
    assert!(ed.undo());
    assert!(ed.graph().event_labels().contains("x"));
}

#[test]
fn test_clear_is_undoable() {
    let mut ed = turnstile();
    ed.clear();
    assert!(ed.graph().nodes().is_empty());
    assert_eq!(ed.run().current_node(), None);
    ed.undo();
    assert_eq!(ed.graph().nodes().len(), 2);
}

#[test]
fn test_auto_run_ticks_until_exhausted() {
    let mut ed = turnstile();
    ed.enqueue("x");
    ed.enqueue("y");
    let t0 = Instant::now();
    let tick = Duration::from_millis(500);

    assert!(ed.toggle_auto_run(t0));
    assert!(ed.tick(t0).is_none());
    assert!(ed.tick(t0 + tick).is_some());
    assert!(ed.is_auto_running());
    assert!(ed.tick(t0 + tick * 2).is_some());
    assert!(!ed.is_auto_running());
    assert_eq!(ed.run().cursor(), 1);
}

#[test]
fn test_auto_run_cancel_is_immediate() {
    let mut ed = turnstile();
    ed.enqueue("x");
    let t0 = Instant::now();

    ed.toggle_auto_run(t0);
    assert!(!ed.toggle_auto_run(t0));
    assert!(ed.tick(t0 + Duration::from_secs(10)).is_none());
    assert_eq!(ed.run().cursor(), -1);
}

#[test]
fn test_auto_run_needs_pending_events() {
    let mut ed = turnstile();
    assert!(!ed.toggle_auto_run(Instant::now()));
}

#[test]
fn test_run_panel_toggle_stops_auto_run() {
    let mut ed = turnstile();
    ed.enqueue("x");
    ed.enqueue("x");
    ed.step();
    ed.toggle_auto_run(Instant::now());

    assert!(ed.toggle_run_panel());
    assert!(!ed.is_auto_running());
    assert_eq!(ed.run().cursor(), -1);
    assert!(!ed.toggle_run_panel());
}

#[test]
fn test_restart_uses_current_entry() {
    let mut ed = turnstile();
    ed.enqueue("x");
    ed.step();
    ed.set_entry_node(Some(1)).unwrap();
    ed.restart();
    assert_eq!(ed.run().current_node(), Some(1));
}

#[test]
fn test_grid_toggle_affects_new_nodes() {
    let mut ed = editor();
    assert!(!ed.is_grid_aligned());
    assert!(ed.toggle_grid());
    let idx = ed.add_node(26.0, 74.0);
    let node = &ed.graph().nodes()[idx];
    assert_eq!((node.x, node.y), (50.0, 50.0));
}

#[test]
fn test_seeded_config_repeats_runs() {
    let config = EditorConfig {
        seed: Some(3),
        ..EditorConfig::default()
    };
    let run = || {
        let mut ed = Editor::new(&config);
        let a = ed.add_node(0.0, 0.0);
        let b = ed.add_node(1.0, 0.0);
        let c = ed.add_node(2.0, 0.0);
        ed.toggle_edge(a, b).unwrap();
        ed.toggle_edge(a, c).unwrap();
        ed.toggle_edge(b, a).unwrap();
        ed.toggle_edge(c, a).unwrap();
        for e in 0..4 {
            ed.set_edge_events(e, ["x"]).unwrap();
        }
        ed.set_entry_node(Some(a)).unwrap();
        for _ in 0..20 {
            ed.enqueue("x");
        }
        ed.run_to_end();
        ed.run().trace().to_vec()
    };
    assert_eq!(run(), run());
}
