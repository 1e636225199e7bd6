//! Undo/redo over opaque snapshots.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStatus {
    pub past_count: usize,
    pub has_present: bool,
    pub future_count: usize,
}

impl HistoryStatus {
    pub const fn can_undo(&self) -> bool {
        self.past_count > 0
    }

    pub const fn can_redo(&self) -> bool {
        self.future_count > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

impl HistoryAction {
    pub const fn applied_message(self) -> &'static str {
        match self {
            Self::Undo => "undo applied",
            Self::Redo => "redo applied",
        }
    }

    pub const fn empty_message(self) -> &'static str {
        match self {
            Self::Undo => "undo stack empty",
            Self::Redo => "redo stack empty",
        }
    }
}

/// Three-sequence history: `past` (oldest first), `present`, and `future` (next redo first).
#[derive(Debug, Clone)]
pub struct History<T> {
    past: VecDeque<T>,
    present: Option<T>,
    future: VecDeque<T>,
    limit: Option<usize>,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> History<T> {
    pub const fn new() -> Self {
        Self {
            past: VecDeque::new(),
            present: None,
            future: VecDeque::new(),
            limit: None,
        }
    }

    /// Caps `past` at `limit` entries; the oldest are dropped first. A zero limit is ignored.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: (limit > 0).then_some(limit),
            ..Self::new()
        }
    }

    pub fn push(&mut self, snapshot: T) {
        if let Some(previous) = self.present.replace(snapshot) {
            self.past.push_back(previous);
            if let Some(limit) = self.limit {
                while self.past.len() > limit {
                    self.past.pop_front();
                }
            }
        }
        self.future.clear();
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.present = None;
        self.future.clear();
    }

    pub fn present(&self) -> Option<&T> {
        self.present.as_ref()
    }

    pub fn status(&self) -> HistoryStatus {
        HistoryStatus {
            past_count: self.past.len(),
            has_present: self.present.is_some(),
            future_count: self.future.len(),
        }
    }

    pub fn past(&self) -> impl Iterator<Item = &T> {
        self.past.iter()
    }

    pub fn future(&self) -> impl Iterator<Item = &T> {
        self.future.iter()
    }

    /// The snapshot `action` would make present, without moving anything.
    pub fn peek(&self, action: HistoryAction) -> Option<&T> {
        match action {
            HistoryAction::Undo => self.past.back(),
            HistoryAction::Redo => self.future.front(),
        }
    }
}

impl<T: Clone> History<T> {
    /// Steps back one snapshot and returns the new present, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<T> {
        let previous = self.past.pop_back()?;
        if let Some(current) = self.present.replace(previous) {
            self.future.push_front(current);
        }
        self.present.clone()
    }

    pub fn redo(&mut self) -> Option<T> {
        let next = self.future.pop_front()?;
        if let Some(current) = self.present.replace(next) {
            self.past.push_back(current);
        }
        self.present.clone()
    }

    pub fn apply(&mut self, action: HistoryAction) -> Option<T> {
        match action {
            HistoryAction::Undo => self.undo(),
            HistoryAction::Redo => self.redo(),
        }
    }
}
