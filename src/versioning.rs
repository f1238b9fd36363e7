//! Plan versioning
//!
//! A linear undo/redo state machine over whole plan values. Committing a new
//! version discards every redo entry, so there are never branching timelines.

use std::collections::VecDeque;

/// Current value plus undo and redo stacks
#[derive(Debug, Clone)]
pub struct UndoRedo<T> {
    current: Option<T>,
    undo_stack: Vec<T>,
    redo_stack: VecDeque<T>,
}

impl<T> Default for UndoRedo<T> {
    fn default() -> Self {
        Self {
            current: None,
            undo_stack: Vec::new(),
            redo_stack: VecDeque::new(),
        }
    }
}

impl<T> UndoRedo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh history with `value` as the current version
    pub fn install(&mut self, value: T) {
        self.reset();
        self.current = Some(value);
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Replaces the current version without recording history.
    ///
    /// Used for display-only state that must not show up in undo/redo.
    /// Ignored when there is no current version.
    pub fn replace_current(&mut self, value: T) {
        if self.current.is_some() {
            self.current = Some(value);
        }
    }

    /// Makes `value` current and records the previous version for undo.
    ///
    /// Returns `false` without doing anything when there is no current
    /// version to commit against.
    pub fn commit(&mut self, value: T) -> bool {
        let Some(previous) = self.current.take() else {
            return false;
        };
        self.current = Some(value);
        self.undo_stack.push(previous);
        self.redo_stack.clear();
        true
    }

    /// Steps back one version. Returns whether anything changed.
    pub fn undo(&mut self) -> bool {
        if self.current.is_none() {
            return false;
        }
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        if let Some(replaced) = self.current.replace(previous) {
            self.redo_stack.push_front(replaced);
        }
        true
    }

    /// Steps forward one version. Returns whether anything changed.
    pub fn redo(&mut self) -> bool {
        if self.current.is_none() {
            return false;
        }
        let Some(next) = self.redo_stack.pop_front() else {
            return false;
        };
        if let Some(replaced) = self.current.replace(next) {
            self.undo_stack.push(replaced);
        }
        true
    }

    /// Clears the current version and both stacks
    pub fn reset(&mut self) {
        self.current = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        self.current.is_some() && !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.current.is_some() && !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
}
