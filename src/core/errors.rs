/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use super::types::InlineString;
use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for the capture pipeline
///
/// Only startup failures (allocation, thread spawn, opening the destination) are
/// returned to callers. Everything raised while the pipeline runs is logged and the
/// affected event is skipped.
#[derive(Error, Debug, Diagnostic)]
pub enum WatchError {
    #[error("Failed to allocate ring buffer with {capacity} slots")]
    #[diagnostic(
        code(watch::buffer_allocation),
        help("The process is out of memory. Lower the buffer capacity.")
    )]
    BufferAllocation { capacity: usize },

    #[error("Invalid ring buffer capacity {capacity}: at least {minimum} slots required")]
    #[diagnostic(
        code(watch::invalid_capacity),
        help("One slot is always kept free, so a usable buffer needs two or more slots.")
    )]
    InvalidCapacity { capacity: usize, minimum: usize },

    #[error("Clock unavailable: {0}")]
    #[diagnostic(
        code(watch::clock),
        help("The system clock reads before the Unix epoch. The event was skipped.")
    )]
    Clock(InlineString),

    #[error("State query failed: {0}")]
    #[diagnostic(
        code(watch::state_query),
        help("The host could not report the thread state. The thread is skipped this pass.")
    )]
    StateQuery(InlineString),

    #[error("Failed to release host thread: {0}")]
    #[diagnostic(
        code(watch::host_release),
        help("The host kept resources for a finished thread. Nothing else is affected.")
    )]
    HostRelease(InlineString),

    #[error("Persistence error: {0}")]
    #[diagnostic(
        code(watch::persistence),
        help("Check the output path, file permissions and disk space.")
    )]
    Persistence(InlineString),

    #[error("Failed to spawn {thread} thread: {reason}")]
    #[diagnostic(
        code(watch::spawn),
        help("The OS refused to create a background thread. Check thread limits.")
    )]
    Spawn {
        thread: &'static str,
        reason: InlineString,
    },

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(watch::configuration),
        help("Options are comma separated: file=<path>,maxdelay=<ms>,buffer=<n>,verbose,daemons")
    )]
    Configuration(InlineString),

    #[error("Trace decode error: {0}")]
    #[diagnostic(
        code(watch::decode),
        help("The file is truncated or was not written by threadwatch.")
    )]
    Decode(InlineString),
}

impl From<std::io::Error> for WatchError {
    fn from(err: std::io::Error) -> Self {
        WatchError::Persistence(err.to_string().into())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, WatchError>;
