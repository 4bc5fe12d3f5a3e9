//! Error types for the runtime.
//!
//! The engine's propagation policy keeps normal narrative states out of the
//! error channel: missing segments, unmet guards, and absent choices are
//! logged no-ops. Only handler failures and navigation-cycle detection
//! surface as `Err`.

use faden_core::NodeId;
use thiserror::Error;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur while running a story.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A control-node fast-forward pass revisited a node it had already
    /// passed through.
    #[error("navigation cycle detected at node {node}")]
    NavigationCycle {
        /// The node at which the cycle closed.
        node: NodeId,
    },

    /// A custom action or condition handler failed.
    #[error("handler \"{kind}\" failed: {message}")]
    Handler {
        /// Registry key of the failing handler.
        kind: String,
        /// What went wrong.
        message: String,
    },

    /// A generic runtime failure reported by a subscriber or plugin.
    #[error("{0}")]
    Failed(String),
}

impl RuntimeError {
    /// Build a handler failure.
    pub fn handler(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
