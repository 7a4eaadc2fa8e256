//! Progress events emitted while an action runs

use crate::models::session::Action;

/// Ordered progress/message stream delivered to the host
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A worker thread picked up a unit of work
    Started(String),
    /// Line of output from the external tool
    Output(String),
    /// Informational message for the user
    Info(String),
    /// Warning message for the user
    Warning(String),
    /// Error message for the user
    Error(String),
    /// A worker thread finished (label, success)
    Finished(String, bool),
    /// The terminal action of a flow finished
    ActionFinished(Action, bool),
}
