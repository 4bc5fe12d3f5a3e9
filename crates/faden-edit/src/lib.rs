//! Fadenspiel edit layer: invertible mutations over a story document.
//!
//! Every mutation goes through a [`Command`], executed by a [`CommandBus`]
//! that keeps bounded undo/redo history. Commands stash what they destroy
//! so undo restores the document exactly; nothing here touches the
//! runtime, which always re-reads the document it was given.

pub mod command;
pub mod commands;
pub mod error;

pub use command::{Command, CommandBus};
pub use commands::{
    AddAttribute, AddEdge, AddNode, RemoveAttribute, RemoveEdge, RemoveNode, RenameSegment,
    UpdateNode, UpdateStoryMeta,
};
pub use error::{EditError, EditResult};
