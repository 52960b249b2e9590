//! Clock and task context for the scene client.

use std::future::Future;
use std::time::Duration;

/// The session's view of time and task spawning.
///
/// The session never calls `tokio::spawn` or reads the clock directly, so
/// tests can substitute a context whose clock is advanced by hand.
pub trait VizContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// Used to timestamp recorded frames.
    fn now(&self) -> Duration;

    /// Spawns a background task.
    ///
    /// The session uses this for the transport reader that feeds decoded
    /// messages into its inbound channel.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
