//! The command trait and the undo/redo bus.

use faden_core::StoryAsset;
use tracing::debug;

use crate::error::EditResult;

/// An invertible document mutation.
///
/// `apply` may stash whatever it needs (removed nodes, previous values) so
/// that `revert` can restore the document exactly. The bus guarantees that
/// `revert` is only called after a successful `apply`, and that re-applies
/// only happen after a revert.
pub trait Command: std::fmt::Debug + Send {
    /// Short human-readable label, e.g. for an edit-history panel.
    fn label(&self) -> &str;

    /// Apply the mutation to the document.
    fn apply(&mut self, story: &mut StoryAsset) -> EditResult<()>;

    /// Undo the mutation, restoring the document exactly.
    fn revert(&mut self, story: &mut StoryAsset) -> EditResult<()>;
}

/// Bounded undo/redo history over [`Command`]s.
///
/// Executing a new command clears the redo stack. When the undo stack is
/// full the oldest entry is dropped, so memory stays bounded on long
/// editing sessions.
#[derive(Debug)]
pub struct CommandBus {
    undo: Vec<Box<dyn Command>>,
    redo: Vec<Box<dyn Command>>,
    capacity: usize,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    /// History depth kept by [`CommandBus::new`].
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a bus keeping at most `capacity` undoable commands.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Apply a command and push it onto the undo stack. A failing command
    /// is not recorded.
    pub fn execute(
        &mut self,
        story: &mut StoryAsset,
        mut command: Box<dyn Command>,
    ) -> EditResult<()> {
        debug!(label = command.label(), "execute");
        command.apply(story)?;
        self.redo.clear();
        if self.undo.len() == self.capacity {
            self.undo.remove(0);
        }
        self.undo.push(command);
        Ok(())
    }

    /// Revert the most recent command. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self, story: &mut StoryAsset) -> EditResult<bool> {
        let Some(mut command) = self.undo.pop() else {
            return Ok(false);
        };
        debug!(label = command.label(), "undo");
        command.revert(story)?;
        self.redo.push(command);
        Ok(true)
    }

    /// Re-apply the most recently undone command. Returns `false` when
    /// there is nothing to redo.
    pub fn redo(&mut self, story: &mut StoryAsset) -> EditResult<bool> {
        let Some(mut command) = self.redo.pop() else {
            return Ok(false);
        };
        debug!(label = command.label(), "redo");
        command.apply(story)?;
        self.undo.push(command);
        Ok(true)
    }

    /// Whether an undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Labels of undoable commands, oldest first.
    pub fn undo_labels(&self) -> Vec<&str> {
        self.undo.iter().map(|c| c.label()).collect()
    }

    /// Drop all history without touching the document.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RenameSegment;
    use faden_core::SegmentAsset;

    fn fixture() -> (StoryAsset, faden_core::SegmentId) {
        let segment = SegmentAsset::new("Prologue");
        let id = segment.id;
        (StoryAsset::new("Test").with_segment(segment), id)
    }

    fn rename(segment: faden_core::SegmentId, name: &str) -> Box<dyn Command> {
        Box::new(RenameSegment::new(segment, name))
    }

    #[test]
    fn undo_restores_and_redo_reapplies() {
        let (mut story, segment) = fixture();
        let mut bus = CommandBus::new();

        bus.execute(&mut story, rename(segment, "Chapter One"))
            .unwrap();
        assert_eq!(story.segment(segment).unwrap().name, "Chapter One");

        assert!(bus.undo(&mut story).unwrap());
        assert_eq!(story.segment(segment).unwrap().name, "Prologue");

        assert!(bus.redo(&mut story).unwrap());
        assert_eq!(story.segment(segment).unwrap().name, "Chapter One");
    }

    #[test]
    fn execute_clears_the_redo_stack() {
        let (mut story, segment) = fixture();
        let mut bus = CommandBus::new();

        bus.execute(&mut story, rename(segment, "A")).unwrap();
        bus.undo(&mut story).unwrap();
        assert!(bus.can_redo());

        bus.execute(&mut story, rename(segment, "B")).unwrap();
        assert!(!bus.can_redo());
        assert_eq!(story.segment(segment).unwrap().name, "B");
    }

    #[test]
    fn empty_stacks_are_reported_not_errors() {
        let (mut story, _) = fixture();
        let mut bus = CommandBus::new();
        assert!(!bus.undo(&mut story).unwrap());
        assert!(!bus.redo(&mut story).unwrap());
    }

    #[test]
    fn capacity_evicts_the_oldest_undo() {
        let (mut story, segment) = fixture();
        let mut bus = CommandBus::with_capacity(2);

        bus.execute(&mut story, rename(segment, "A")).unwrap();
        bus.execute(&mut story, rename(segment, "B")).unwrap();
        bus.execute(&mut story, rename(segment, "C")).unwrap();
        assert_eq!(bus.undo_labels().len(), 2);

        // Only the two newest renames can be unwound
        assert!(bus.undo(&mut story).unwrap());
        assert!(bus.undo(&mut story).unwrap());
        assert!(!bus.undo(&mut story).unwrap());
        assert_eq!(story.segment(segment).unwrap().name, "A");
    }

    #[test]
    fn failing_command_is_not_recorded() {
        let (mut story, _) = fixture();
        let mut bus = CommandBus::new();
        let unknown = faden_core::SegmentId::new();

        assert!(bus.execute(&mut story, rename(unknown, "X")).is_err());
        assert!(!bus.can_undo());
    }
}
