//! Error types that callers may want to tell apart.
//!
//! Everything is propagated as [`anyhow::Error`]; these types are attached as
//! the error or as context, so that `error.downcast_ref::<T>()` recovers them.
//! Transport faults keep whatever type the client produced.

use std::{error::Error, fmt::Display};

/// A command could not be built from the supplied arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCommand {
    pub command: &'static str,
    pub message: String,
}

impl InvalidCommand {
    pub fn new(command: &'static str, message: impl Into<String>) -> Self {
        InvalidCommand {
            command,
            message: message.into(),
        }
    }
}

impl Display for InvalidCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.command, self.message)
    }
}
impl Error for InvalidCommand {}

/// The target of a command is not in the state the command requires, e.g. a
/// resource to change does not exist. Raised before anything is modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconditionFailed {
    pub target: String,
    pub message: String,
}

impl PreconditionFailed {
    pub fn new(target: impl Display, message: impl Into<String>) -> Self {
        PreconditionFailed {
            target: target.to_string(),
            message: message.into(),
        }
    }
}

impl Display for PreconditionFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.target, self.message)
    }
}
impl Error for PreconditionFailed {}

/// The management endpoint executed an operation and reported a failure.
/// Which operation is told by the surrounding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailed {
    pub description: String,
}

impl Display for OperationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation failed: {}", self.description)
    }
}
impl Error for OperationFailed {}

/// An offline transform ran against its subtree and refused the edit, e.g.
/// because the child to add already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFailed {
    pub transform: String,
    pub subtree: String,
    pub message: String,
}

impl TransformFailed {
    /// The subtree is filled in by whoever located it.
    pub fn new(transform: impl Into<String>, message: impl Into<String>) -> Self {
        TransformFailed {
            transform: transform.into(),
            subtree: String::new(),
            message: message.into(),
        }
    }
}

impl Display for TransformFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "transform {} in {} failed: {}",
            self.transform, self.subtree, self.message
        )
    }
}
impl Error for TransformFailed {}

/// Outermost context of every failed command application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailed {
    pub command: String,
}

impl Display for CommandFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "command {} failed", self.command)
    }
}
impl Error for CommandFailed {}
