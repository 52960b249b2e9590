//! Production implementation of VizContext using Tokio.

use crate::VizContext;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Production context backed by the Tokio runtime and the system clock.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

impl VizContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.to_string();
        tokio::spawn(async move {
            future.await;
            tracing::debug!(task = %name, "task finished");
        });
    }
}
