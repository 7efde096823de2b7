//! Linear undo/redo over whole snapshots, capped in depth.

use std::collections::VecDeque;

/// Default cap on stored snapshots.
pub(crate) const MAX_UNDO_STACK: usize = 100;

/// A bounded ring of snapshots with a cursor at the current state.
///
/// `push` drops anything after the cursor (the redo branch) before appending,
/// and evicts the oldest snapshot once `max_depth` is exceeded.
#[derive(Clone, Debug)]
pub struct History<T> {
    snapshots: VecDeque<T>,
    cursor: usize,
    max_depth: usize,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new(MAX_UNDO_STACK)
    }
}

impl<T> History<T> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: 0,
            max_depth: max_depth.max(1),
        }
    }

    pub fn push(&mut self, snapshot: T) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.max_depth {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back. Returns the snapshot now current, or None at the oldest one.
    pub fn undo(&mut self) -> Option<&T> {
        if self.cursor == 0 || self.snapshots.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.snapshots.get(self.cursor)
    }

    /// Step forward. Returns the snapshot now current, or None at the newest one.
    pub fn redo(&mut self) -> Option<&T> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor)
    }

    pub fn current(&self) -> Option<&T> {
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Forget everything and start over from `snapshot`.
    pub fn reset(&mut self, snapshot: T) {
        self.snapshots.clear();
        self.cursor = 0;
        self.snapshots.push_back(snapshot);
    }
}
