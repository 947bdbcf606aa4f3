//! Editor session
//! Command surface tying graph store, history, event queue and simulator together

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace, warn};

use crate::config::EditorConfig;
use crate::graph::{
    parse_event_list, EdgeIndex, EdgeToggle, GraphError, GraphResult, GraphSnapshot, GraphStore,
    NodeIndex,
};
use crate::history::History;
use crate::queue::{EventId, EventQueue};
use crate::sim::{AutoRun, BranchPicker, RandomPicker, RunState, Simulator, Step};

#[cfg(test)]
mod tests;

/// What the UI currently has selected; owned by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Node(NodeIndex),
    Edge(EdgeIndex),
}

/// One open project.
///
/// Every graph edit swaps in a new snapshot, resets the run and, unless the
/// edit is transient, records the snapshot in history. The simulator reads the
/// graph and the queue but never writes to either.
#[derive(Debug)]
pub struct Editor {
    store: GraphStore,
    history: History<Arc<GraphSnapshot>>,
    queue: EventQueue,
    sim: Simulator,
    auto_run: AutoRun,
    run_panel_open: bool,
}

impl Editor {
    pub fn new(config: &EditorConfig) -> Self {
        Self::with_contents(config, GraphSnapshot::default(), EventQueue::new())
    }

    /// Open an editor on existing contents; history starts with `graph` alone
    pub fn with_contents(config: &EditorConfig, graph: GraphSnapshot, queue: EventQueue) -> Self {
        let mut store = GraphStore::new(config.default_node_name.clone(), config.grid());
        let graph = Arc::new(graph);
        store.replace(Arc::clone(&graph));

        let picker: Box<dyn BranchPicker> = match config.seed {
            Some(seed) => Box::new(RandomPicker::seeded(seed)),
            None => Box::new(RandomPicker::from_entropy()),
        };
        let mut sim = Simulator::new(picker);
        sim.reset(graph.entry_node());

        Self {
            store,
            history: History::new(graph),
            queue,
            sim,
            auto_run: AutoRun::new(config.auto_run_interval()),
            run_panel_open: false,
        }
    }

    pub fn graph(&self) -> &GraphSnapshot {
        self.store.current()
    }

    pub fn history(&self) -> &History<Arc<GraphSnapshot>> {
        &self.history
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn run(&self) -> &RunState {
        self.sim.state()
    }

    pub fn is_run_panel_open(&self) -> bool {
        self.run_panel_open
    }

    pub fn is_auto_running(&self) -> bool {
        self.auto_run.is_active()
    }

    pub fn auto_run(&self) -> &AutoRun {
        &self.auto_run
    }

    pub fn is_grid_aligned(&self) -> bool {
        self.store.grid.enabled
    }

    fn restart_run(&mut self) {
        self.sim.reset(self.store.current().entry_node());
    }

    /// Bookkeeping after the store swapped in a new snapshot
    fn after_edit(&mut self, what: &str, save: bool) {
        self.restart_run();
        if save {
            self.history.commit(Arc::clone(self.store.current()));
            debug!("{what} (history {}/{})", self.history.time(), self.history.len());
        } else {
            trace!("{what} (transient)");
        }
    }

    // ========================================================================
    // GRAPH EDITS
    // ========================================================================

    pub fn add_node(&mut self, x: f64, y: f64) -> NodeIndex {
        let idx = self.store.add_node(x, y);
        self.after_edit("add node", true);
        idx
    }

    /// Move a node. `save=false` is a live drag preview: no snapping, no history entry.
    pub fn move_node(&mut self, idx: NodeIndex, x: f64, y: f64, save: bool) -> GraphResult<()> {
        self.store.move_node(idx, x, y, save)?;
        self.after_edit("move node", save);
        Ok(())
    }

    pub fn rename_node(&mut self, idx: NodeIndex, name: impl Into<String>) -> GraphResult<()> {
        self.store.rename_node(idx, name)?;
        self.after_edit("rename node", true);
        Ok(())
    }

    pub fn delete_node(&mut self, idx: NodeIndex) -> GraphResult<()> {
        self.store.delete_node(idx)?;
        self.after_edit("delete node", true);
        Ok(())
    }

    pub fn delete_edge(&mut self, idx: EdgeIndex) -> GraphResult<()> {
        self.store.delete_edge(idx)?;
        self.after_edit("delete edge", true);
        Ok(())
    }

    pub fn delete_selection(&mut self, selection: Selection) -> GraphResult<()> {
        match selection {
            Selection::Node(idx) => self.delete_node(idx),
            Selection::Edge(idx) => self.delete_edge(idx),
        }
    }

    pub fn set_entry_node(&mut self, idx: Option<NodeIndex>) -> GraphResult<()> {
        self.store.set_entry_node(idx)?;
        self.after_edit("set entry node", true);
        Ok(())
    }

    /// The connect gesture. A self-loop is refused and leaves everything untouched.
    pub fn toggle_edge(&mut self, from: NodeIndex, to: NodeIndex) -> GraphResult<EdgeToggle> {
        match self.store.toggle_edge(from, to) {
            Ok(toggle) => {
                self.after_edit("toggle edge", true);
                Ok(toggle)
            }
            Err(err @ GraphError::SelfLoopRejected(_)) => {
                warn!("ignored connect gesture: {err}");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    pub fn set_edge_events<I, S>(&mut self, idx: EdgeIndex, labels: I) -> GraphResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store.set_edge_events(idx, labels)?;
        self.after_edit("set edge events", true);
        Ok(())
    }

    /// Set an edge's labels from comma separated text
    pub fn set_edge_events_text(&mut self, idx: EdgeIndex, text: &str) -> GraphResult<()> {
        self.set_edge_events(idx, parse_event_list(text))
    }

    pub fn prune_event_labels(&mut self) {
        self.store.prune_event_labels();
        self.after_edit("prune event labels", true);
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.after_edit("clear graph", true);
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    /// Record the live snapshot, e.g. after a run of transient edits
    pub fn commit(&mut self) {
        self.after_edit("commit", true);
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.store.replace(snapshot);
        self.restart_run();
        debug!("undo (history {}/{})", self.history.time(), self.history.len());
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.store.replace(snapshot);
        self.restart_run();
        debug!("redo (history {}/{})", self.history.time(), self.history.len());
        true
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.store.grid.enabled = !self.store.grid.enabled;
        self.store.grid.enabled
    }

    pub fn set_align_to_grid(&mut self, enabled: bool) {
        self.store.grid.enabled = enabled;
    }

    // ========================================================================
    // EVENT QUEUE
    // ========================================================================

    pub fn enqueue(&mut self, name: impl Into<String>) -> EventId {
        let id = self.queue.enqueue(name);
        self.restart_run();
        id
    }

    /// Enqueue from the label palette; only known labels are accepted
    pub fn enqueue_label(&mut self, name: &str) -> Option<EventId> {
        if !self.graph().event_labels().contains(name) {
            warn!("'{name}' is not a known event label");
            return None;
        }
        Some(self.enqueue(name))
    }

    pub fn remove_event(&mut self, id: EventId) -> bool {
        if self.queue.remove_by_id(id).is_none() {
            return false;
        }
        self.restart_run();
        true
    }

    /// Reorder the queue. The run survives unless an already consumed slot moved.
    pub fn move_event(&mut self, id: EventId, to: usize) -> bool {
        let Some(moved) = self.queue.move_by_id(id, to) else {
            return false;
        };
        if moved.from.min(moved.to) < self.sim.state().consumed() {
            self.restart_run();
        }
        true
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.restart_run();
    }

    // ========================================================================
    // SIMULATION
    // ========================================================================

    pub fn step(&mut self) -> Option<Step> {
        self.sim.step_forward(self.store.current(), &self.queue)
    }

    pub fn step_back(&mut self) -> Option<NodeIndex> {
        self.sim.step_back()
    }

    pub fn run_steps(&mut self, n: usize) -> Vec<Step> {
        self.sim.run_steps(self.store.current(), &self.queue, n)
    }

    pub fn run_to_end(&mut self) -> Vec<Step> {
        self.sim.run_to_end(self.store.current(), &self.queue)
    }

    /// Reset the run at the current entry node
    pub fn restart(&mut self) {
        self.restart_run();
    }

    pub fn last_transition(&self) -> Option<EdgeIndex> {
        self.sim.last_transition()
    }

    pub fn reseed(&mut self, seed: u64) {
        self.sim.set_picker(Box::new(RandomPicker::seeded(seed)));
    }

    pub fn set_picker(&mut self, picker: Box<dyn BranchPicker>) {
        self.sim.set_picker(picker);
    }

    /// Start or stop timed stepping; returns whether it is now running
    pub fn toggle_auto_run(&mut self, now: Instant) -> bool {
        if self.auto_run.is_active() {
            self.auto_run.cancel();
            debug!("auto-run stopped");
        } else if !self.sim.is_exhausted(&self.queue) {
            self.auto_run.start(now);
            debug!("auto-run started ({:?})", self.auto_run.interval());
        }
        self.auto_run.is_active()
    }

    /// Drive auto-run from the host loop; fires at most one step per call
    pub fn tick(&mut self, now: Instant) -> Option<Step> {
        if !self.auto_run.poll(now) {
            return None;
        }
        let step = self.step();
        if step.is_none() || self.sim.is_exhausted(&self.queue) {
            self.auto_run.cancel();
            debug!("auto-run finished");
        }
        step
    }

    /// Open or close the run panel; both reset the run and stop auto-run
    pub fn toggle_run_panel(&mut self) -> bool {
        self.restart_run();
        self.auto_run.cancel();
        self.run_panel_open = !self.run_panel_open;
        self.run_panel_open
    }
}
