//! Simulation Engine
//! Nondeterministic stepper over the event queue with exact rollback

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::graph::{EdgeIndex, GraphSnapshot, NodeIndex};
use crate::queue::EventQueue;


// ============================================================================
// BRANCH PICKING
// ============================================================================

/// Source of choices when several transitions match the same event
pub trait BranchPicker: fmt::Debug {
    /// Pick an index in `0..count`; only called with `count >= 2`
    fn pick(&mut self, count: usize) -> usize;
}

/// Uniform choice backed by ChaCha8
#[derive(Debug, Clone)]
pub struct RandomPicker {
    rng: ChaCha8Rng,
}

impl RandomPicker {
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Reproducible sequence of choices
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl BranchPicker for RandomPicker {
    fn pick(&mut self, count: usize) -> usize {
        self.rng.gen_range(0..count)
    }
}

/// Replays a fixed list of choices, wrapping each into range.
/// Picks 0 once the list runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPicker {
    picks: VecDeque<usize>,
}

impl ScriptedPicker {
    pub fn new(picks: impl IntoIterator<Item = usize>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
        }
    }
}

impl BranchPicker for ScriptedPicker {
    fn pick(&mut self, count: usize) -> usize {
        self.picks.pop_front().map_or(0, |p| p % count)
    }
}

// ============================================================================
// RUN STATE
// ============================================================================

/// Progress of one run over the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    /// Number of queue entries consumed so far
    consumed: usize,
    current_node: Option<NodeIndex>,
    /// `trace[i]` is the node that was current before consuming entry `i`
    trace: Vec<NodeIndex>,
    /// `taken[i]` is the edge followed by step `i`, `None` when the event matched nothing
    taken: Vec<Option<EdgeIndex>>,
}

impl RunState {
    pub fn new(entry: Option<NodeIndex>) -> Self {
        Self {
            consumed: 0,
            current_node: entry,
            trace: Vec::new(),
            taken: Vec::new(),
        }
    }

    /// Index of the last consumed queue entry, `-1` before the first step
    pub fn cursor(&self) -> isize {
        self.consumed as isize - 1
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn current_node(&self) -> Option<NodeIndex> {
        self.current_node
    }

    pub fn trace(&self) -> &[NodeIndex] {
        &self.trace
    }
}

/// One forward step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Queue position that was consumed
    pub position: usize,
    pub event: String,
    pub from: NodeIndex,
    pub to: NodeIndex,
    /// Edge followed, `None` when the event matched no transition
    pub edge: Option<EdgeIndex>,
    /// How many distinct destinations matched
    pub candidates: usize,
}

#[derive(Debug)]
pub struct Simulator {
    run: RunState,
    picker: Box<dyn BranchPicker>,
}

impl Simulator {
    pub fn new(picker: Box<dyn BranchPicker>) -> Self {
        Self {
            run: RunState::new(None),
            picker,
        }
    }

    pub fn set_picker(&mut self, picker: Box<dyn BranchPicker>) {
        self.picker = picker;
    }

    pub fn state(&self) -> &RunState {
        &self.run
    }

    /// Back to the start, anchored at `entry`
    pub fn reset(&mut self, entry: Option<NodeIndex>) {
        self.run = RunState::new(entry);
    }

    pub fn is_exhausted(&self, queue: &EventQueue) -> bool {
        self.run.consumed >= queue.len()
    }

    /// Consume the next queued event. An event with no matching transition
    /// keeps the current node.
    pub fn step_forward(&mut self, graph: &GraphSnapshot, queue: &EventQueue) -> Option<Step> {
        let position = self.run.consumed;
        let event = queue.get(position)?;
        let from = self.run.current_node?;

        let targets = graph.transition_targets(from, &event.name);
        let chosen = match targets.len() {
            0 => None,
            1 => Some(targets[0]),
            n => Some(targets[self.picker.pick(n) % n]),
        };
        let to = chosen.map_or(from, |(node, _)| node);
        let edge = chosen.map(|(_, edge)| edge);

        self.run.trace.push(from);
        self.run.taken.push(edge);
        self.run.current_node = Some(to);
        self.run.consumed += 1;

        debug!(
            "step {position}: {from} --{}--> {to} ({} candidates)",
            event.name,
            targets.len()
        );
        Some(Step {
            position,
            event: event.name.clone(),
            from,
            to,
            edge,
            candidates: targets.len(),
        })
    }

    /// Undo one step from the trace; returns the restored node
    pub fn step_back(&mut self) -> Option<NodeIndex> {
        if self.run.consumed == 0 {
            return None;
        }
        let previous = self.run.trace.pop()?;
        self.run.taken.pop();
        self.run.current_node = Some(previous);
        self.run.consumed -= 1;
        debug!("step back to {previous} (cursor {})", self.run.cursor());
        Some(previous)
    }

    /// Step forward up to `n` times, stopping early when the run cannot advance
    pub fn run_steps(
        &mut self,
        graph: &GraphSnapshot,
        queue: &EventQueue,
        n: usize,
    ) -> Vec<Step> {
        let mut steps = Vec::new();
        while steps.len() < n {
            match self.step_forward(graph, queue) {
                Some(step) => steps.push(step),
                None => break,
            }
        }
        steps
    }

    /// Consume every remaining queued event
    pub fn run_to_end(&mut self, graph: &GraphSnapshot, queue: &EventQueue) -> Vec<Step> {
        let remaining = queue.len().saturating_sub(self.run.consumed);
        self.run_steps(graph, queue, remaining)
    }

    /// The edge taken by the most recent step, for highlighting
    pub fn last_transition(&self) -> Option<EdgeIndex> {
        self.run.taken.last().copied().flatten()
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(Box::new(RandomPicker::from_entropy()))
    }
}

// ============================================================================
// AUTO RUN
// ============================================================================

/// Cancellable fixed-interval schedule, polled by the host loop
#[derive(Debug, Clone)]
pub struct AutoRun {
    interval: Duration,
    next_due: Option<Instant>,
}

impl AutoRun {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// First step fires one interval after `now`
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    /// True when a step is due; schedules the following one
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    /// Time left until the next step, for host loops that sleep or request repaints
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}
