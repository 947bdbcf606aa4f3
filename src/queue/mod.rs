//! Event Queue
//! Ordered event tokens awaiting simulation, each with a stable id

use log::warn;


/// Queue entry id. Assigned in increasing order and never reused.
pub type EventId = u64;

/// One token in the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    pub id: EventId,
    pub name: String,
}

/// Where a reorder moved an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moved {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    items: Vec<QueuedEvent>,
    next_id: EventId,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from stored names; ids restart at 0
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue = Self::new();
        for name in names {
            queue.enqueue(name);
        }
        queue
    }

    pub fn enqueue(&mut self, name: impl Into<String>) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(QueuedEvent {
            id,
            name: name.into(),
        });
        id
    }

    pub fn position(&self, id: EventId) -> Option<usize> {
        self.items.iter().position(|e| e.id == id)
    }

    /// Remove the entry with `id`, returning its former position
    pub fn remove_by_id(&mut self, id: EventId) -> Option<usize> {
        let Some(pos) = self.position(id) else {
            warn!("remove: no queued event with id {id}");
            return None;
        };
        self.items.remove(pos);
        Some(pos)
    }

    /// Splice the entry with `id` out and back in at `to` (clamped to the end)
    pub fn move_by_id(&mut self, id: EventId, to: usize) -> Option<Moved> {
        let Some(from) = self.position(id) else {
            warn!("reorder: no queued event with id {id}");
            return None;
        };
        let item = self.items.remove(from);
        let to = to.min(self.items.len());
        self.items.insert(to, item);
        Some(Moved { from, to })
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, pos: usize) -> Option<&QueuedEvent> {
        self.items.get(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedEvent> {
        self.items.iter()
    }

    /// Names in queue order, ids dropped (the stored form)
    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
