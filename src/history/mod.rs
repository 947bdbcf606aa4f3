//! History Timeline
//! Linear undo/redo log; committing after an undo drops the redo tail


/// Ordered snapshots plus a cursor at the active one.
///
/// Never empty: `0 <= time < len` always holds.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<T>,
    time: usize,
}

impl<T: Clone> History<T> {
    pub fn new(initial: T) -> Self {
        Self {
            entries: vec![initial],
            time: 0,
        }
    }

    pub fn commit(&mut self, snapshot: T) {
        self.entries.truncate(self.time + 1);
        self.entries.push(snapshot);
        self.time += 1;
    }

    pub fn undo(&mut self) -> Option<T> {
        if self.time == 0 {
            return None;
        }
        self.time -= 1;
        Some(self.entries[self.time].clone())
    }

    pub fn redo(&mut self) -> Option<T> {
        if self.time + 1 >= self.entries.len() {
            return None;
        }
        self.time += 1;
        Some(self.entries[self.time].clone())
    }

    pub fn can_undo(&self) -> bool {
        self.time > 0
    }

    pub fn can_redo(&self) -> bool {
        self.time + 1 < self.entries.len()
    }

    pub fn current(&self) -> &T {
        &self.entries[self.time]
    }

    pub fn time(&self) -> usize {
        self.time
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
