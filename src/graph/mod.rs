//! Graph Store
//! Arena-backed state/transition storage with soft deletion and copy-on-write snapshots

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;


/// Position of a node in the node arena. Never reused.
pub type NodeIndex = usize;
/// Position of an edge in the edge arena. Never reused.
pub type EdgeIndex = usize;

/// Which arena an index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Node => write!(f, "node"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("{kind} index {index} out of range (len {len})")]
    OutOfRange {
        kind: ElementKind,
        index: usize,
        len: usize,
    },
    #[error("cannot connect node {0} to itself")]
    SelfLoopRejected(NodeIndex),
}

pub type GraphResult<T> = Result<T, GraphError>;

fn default_visible() -> bool {
    true
}

/// A state in the diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Display name
    pub name: String,
    /// Canvas position (top-left of the state circle)
    pub x: f64,
    pub y: f64,
    /// `false` once deleted; the slot stays allocated
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Outgoing edges, in creation order. Entries are never removed.
    #[serde(rename = "adj", alias = "adjacency", default)]
    pub adjacency: Vec<EdgeIndex>,
}

impl Node {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            visible: true,
            adjacency: Vec::new(),
        }
    }
}

/// A transition between two states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeIndex,
    pub to: NodeIndex,
    /// Event labels that fire this transition
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

impl Edge {
    pub fn new(from: NodeIndex, to: NodeIndex) -> Self {
        Self {
            from,
            to,
            events: Vec::new(),
            visible: true,
        }
    }

    /// Format the event list the way it is drawn on the canvas
    pub fn label(&self) -> String {
        self.events.join(", ")
    }
}

/// Outcome of a connect gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeToggle {
    Added(EdgeIndex),
    Removed(EdgeIndex),
}

/// Split a comma separated event list, trimming entries and dropping blanks and repeats
pub fn parse_event_list(input: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for part in input.split(',') {
        let label = part.trim();
        if !label.is_empty() && !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    labels
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// One immutable version of the whole graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    event_labels: BTreeSet<String>,
    entry_node: Option<NodeIndex>,
}

impl GraphSnapshot {
    /// Assemble a snapshot from stored parts, checking every cross reference
    pub fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        event_labels: impl IntoIterator<Item = String>,
        entry_node: Option<NodeIndex>,
    ) -> GraphResult<Self> {
        let snapshot = Self {
            nodes,
            edges,
            event_labels: event_labels.into_iter().collect(),
            entry_node,
        };

        for edge in &snapshot.edges {
            snapshot.check_node(edge.from)?;
            snapshot.check_node(edge.to)?;
        }
        for node in &snapshot.nodes {
            for &edge_idx in &node.adjacency {
                snapshot.check_edge(edge_idx)?;
            }
        }
        if let Some(entry) = snapshot.entry_node {
            snapshot.check_node(entry)?;
        }

        Ok(snapshot)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn event_labels(&self) -> &BTreeSet<String> {
        &self.event_labels
    }

    pub fn entry_node(&self) -> Option<NodeIndex> {
        self.entry_node
    }

    pub fn node(&self, idx: NodeIndex) -> GraphResult<&Node> {
        self.nodes.get(idx).ok_or(GraphError::OutOfRange {
            kind: ElementKind::Node,
            index: idx,
            len: self.nodes.len(),
        })
    }

    pub fn edge(&self, idx: EdgeIndex) -> GraphResult<&Edge> {
        self.edges.get(idx).ok_or(GraphError::OutOfRange {
            kind: ElementKind::Edge,
            index: idx,
            len: self.edges.len(),
        })
    }

    fn check_node(&self, idx: NodeIndex) -> GraphResult<()> {
        self.node(idx).map(|_| ())
    }

    fn check_edge(&self, idx: EdgeIndex) -> GraphResult<()> {
        self.edge(idx).map(|_| ())
    }

    fn node_mut(&mut self, idx: NodeIndex) -> GraphResult<&mut Node> {
        let len = self.nodes.len();
        self.nodes.get_mut(idx).ok_or(GraphError::OutOfRange {
            kind: ElementKind::Node,
            index: idx,
            len,
        })
    }

    fn edge_mut(&mut self, idx: EdgeIndex) -> GraphResult<&mut Edge> {
        let len = self.edges.len();
        self.edges.get_mut(idx).ok_or(GraphError::OutOfRange {
            kind: ElementKind::Edge,
            index: idx,
            len,
        })
    }

    /// True when the edge and both of its endpoints are visible
    pub fn is_edge_live(&self, idx: EdgeIndex) -> bool {
        self.edges.get(idx).is_some_and(|edge| {
            edge.visible && self.is_node_visible(edge.from) && self.is_node_visible(edge.to)
        })
    }

    pub fn is_node_visible(&self, idx: NodeIndex) -> bool {
        self.nodes.get(idx).is_some_and(|n| n.visible)
    }

    /// Visible nodes with their indices
    pub fn visible_nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes.iter().enumerate().filter(|(_, n)| n.visible)
    }

    /// Edges that would be drawn: visible and between visible nodes
    pub fn live_edges(&self) -> impl Iterator<Item = (EdgeIndex, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(idx, _)| self.is_edge_live(*idx))
    }

    /// The visible edge `from -> to`, if one exists
    pub fn find_edge(&self, from: NodeIndex, to: NodeIndex) -> Option<EdgeIndex> {
        let node = self.nodes.get(from)?;
        node.adjacency.iter().copied().find(|&idx| {
            self.edges
                .get(idx)
                .is_some_and(|edge| edge.visible && edge.to == to)
        })
    }

    /// Distinct destinations reachable from `from` on `event`, in adjacency order,
    /// each with the first edge leading there.
    ///
    /// Only visible edges whose destination is visible count.
    pub fn transition_targets(
        &self,
        from: NodeIndex,
        event: &str,
    ) -> Vec<(NodeIndex, EdgeIndex)> {
        let mut targets = Vec::new();
        let Some(node) = self.nodes.get(from) else {
            return targets;
        };
        for &edge_idx in &node.adjacency {
            let Some(edge) = self.edges.get(edge_idx) else {
                continue;
            };
            if !edge.visible || !self.is_node_visible(edge.to) {
                continue;
            }
            let labelled = edge.events.iter().any(|e| e == event);
            if labelled && !targets.iter().any(|&(to, _)| to == edge.to) {
                targets.push((edge.to, edge_idx));
            }
        }
        targets
    }

    /// Union of labels over live edges
    pub fn labels_in_use(&self) -> BTreeSet<String> {
        self.live_edges()
            .flat_map(|(_, edge)| edge.events.iter().cloned())
            .collect()
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Grid snapping for node positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAlign {
    pub pitch: f64,
    pub enabled: bool,
}

impl GridAlign {
    /// Round to the nearest multiple of the pitch (halves round up)
    pub fn apply(&self, value: f64) -> f64 {
        if self.enabled && self.pitch > 0.0 {
            (value / self.pitch + 0.5).floor() * self.pitch
        } else {
            value
        }
    }
}

impl Default for GridAlign {
    fn default() -> Self {
        Self {
            pitch: 50.0,
            enabled: false,
        }
    }
}

/// Owner of the live snapshot. Every mutation swaps in a fresh snapshot;
/// snapshots handed out earlier are never touched.
#[derive(Debug, Clone)]
pub struct GraphStore {
    current: Arc<GraphSnapshot>,
    pub grid: GridAlign,
    default_node_name: String,
}

impl GraphStore {
    pub fn new(default_node_name: impl Into<String>, grid: GridAlign) -> Self {
        Self {
            current: Arc::new(GraphSnapshot::default()),
            grid,
            default_node_name: default_node_name.into(),
        }
    }

    pub fn current(&self) -> &Arc<GraphSnapshot> {
        &self.current
    }

    /// Install a snapshot wholesale (load, undo, redo)
    pub fn replace(&mut self, snapshot: Arc<GraphSnapshot>) {
        self.current = snapshot;
    }

    /// Apply `f` to a copy of the live snapshot; nothing changes if it fails
    fn edit<T>(&mut self, f: impl FnOnce(&mut GraphSnapshot) -> GraphResult<T>) -> GraphResult<T> {
        let mut next = GraphSnapshot::clone(&self.current);
        let out = f(&mut next)?;
        self.current = Arc::new(next);
        Ok(out)
    }

    pub fn add_node(&mut self, x: f64, y: f64) -> NodeIndex {
        let node = Node::new(
            self.default_node_name.clone(),
            self.grid.apply(x),
            self.grid.apply(y),
        );
        let mut next = GraphSnapshot::clone(&self.current);
        next.nodes.push(node);
        let idx = next.nodes.len() - 1;
        self.current = Arc::new(next);
        idx
    }

    /// Reposition a node. `snap` applies grid alignment (used on drag release).
    pub fn move_node(&mut self, idx: NodeIndex, x: f64, y: f64, snap: bool) -> GraphResult<()> {
        let (x, y) = if snap {
            (self.grid.apply(x), self.grid.apply(y))
        } else {
            (x, y)
        };
        self.edit(|g| {
            let node = g.node_mut(idx)?;
            node.x = x;
            node.y = y;
            Ok(())
        })
    }

    pub fn rename_node(&mut self, idx: NodeIndex, name: impl Into<String>) -> GraphResult<()> {
        let name = name.into();
        self.edit(|g| {
            g.node_mut(idx)?.name = name;
            Ok(())
        })
    }

    /// Soft delete. Incident edges stay stored and drop out through visibility checks.
    pub fn delete_node(&mut self, idx: NodeIndex) -> GraphResult<()> {
        self.edit(|g| {
            g.node_mut(idx)?.visible = false;
            Ok(())
        })
    }

    pub fn delete_edge(&mut self, idx: EdgeIndex) -> GraphResult<()> {
        self.edit(|g| {
            g.edge_mut(idx)?.visible = false;
            Ok(())
        })
    }

    pub fn set_entry_node(&mut self, idx: Option<NodeIndex>) -> GraphResult<()> {
        self.edit(|g| {
            if let Some(idx) = idx {
                g.check_node(idx)?;
            }
            g.entry_node = idx;
            Ok(())
        })
    }

    /// Remove the visible edge `from -> to` if present, otherwise create it.
    /// Node adjacency and the edge arena change together in one snapshot.
    pub fn toggle_edge(&mut self, from: NodeIndex, to: NodeIndex) -> GraphResult<EdgeToggle> {
        self.edit(|g| {
            g.check_node(from)?;
            g.check_node(to)?;
            if from == to {
                return Err(GraphError::SelfLoopRejected(from));
            }

            if let Some(existing) = g.find_edge(from, to) {
                g.edge_mut(existing)?.visible = false;
                return Ok(EdgeToggle::Removed(existing));
            }

            let new_idx = g.edges.len();
            g.edges.push(Edge::new(from, to));
            g.node_mut(from)?.adjacency.push(new_idx);
            Ok(EdgeToggle::Added(new_idx))
        })
    }

    /// Replace an edge's labels and merge them into the global label set
    pub fn set_edge_events<I, S>(&mut self, idx: EdgeIndex, labels: I) -> GraphResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut events: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !events.contains(&label) {
                events.push(label);
            }
        }
        self.edit(|g| {
            g.edge_mut(idx)?.events = events.clone();
            g.event_labels.extend(events);
            Ok(())
        })
    }

    /// Add a label to the global set without attaching it to an edge
    pub fn add_event_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        let mut next = GraphSnapshot::clone(&self.current);
        next.event_labels.insert(label);
        self.current = Arc::new(next);
    }

    /// Recompute the label set as exactly the labels used by live edges
    pub fn prune_event_labels(&mut self) {
        let mut next = GraphSnapshot::clone(&self.current);
        next.event_labels = next.labels_in_use();
        self.current = Arc::new(next);
    }

    pub fn clear(&mut self) {
        self.current = Arc::new(GraphSnapshot::default());
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new("State", GridAlign::default())
    }
}
