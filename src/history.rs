use std::collections::VecDeque;

pub const MAX_HISTORY: usize = 100;

/// Back/forward navigation over visited playlist indices.
///
/// Behaves like an undo stack: recording a visit while the cursor sits in the
/// middle drops everything after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetHistory {
    entries: VecDeque<u32>,
    cursor: Option<usize>,
    capacity: usize,
}

impl Default for PresetHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetHistory {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// `capacity` is clamped to at least one entry.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: None,
            capacity,
        }
    }

    pub fn record_visit(&mut self, index: u32) {
        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        }
        self.entries.push_back(index);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    pub fn go_back(&mut self) -> Option<u32> {
        let cursor = self.cursor?;
        if cursor == 0 {
            return None;
        }
        self.cursor = Some(cursor - 1);
        self.entries.get(cursor - 1).copied()
    }

    pub fn go_forward(&mut self) -> Option<u32> {
        let cursor = self.cursor?;
        if cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor = Some(cursor + 1);
        self.entries.get(cursor + 1).copied()
    }

    pub fn current(&self) -> Option<u32> {
        self.entries.get(self.cursor?).copied()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().copied()
    }

    /// Drops every entry, e.g. after the playlist it indexes was rebuilt.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
