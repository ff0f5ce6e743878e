//! Timing of long-running steps.

use std::time::{Duration, Instant};

use tracing::info;

/// Logs the start of a step on creation and its duration on drop.
///
/// ```
/// use wsi_autotiler::timing::TimedStep;
///
/// {
///     let _step = TimedStep::new("tile slide");
///     // ...
/// } // "Successfully tile slide!: 0 seconds"
/// ```
#[derive(Debug)]
pub struct TimedStep {
    task: String,
    started: Instant,
}

impl TimedStep {
    pub fn new(task: impl Into<String>) -> Self {
        let task = task.into();
        info!("Starting to {}", task);
        Self {
            task,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for TimedStep {
    fn drop(&mut self) {
        info!("Successfully {}!: {}", self.task, format_elapsed(self.elapsed()));
    }
}

/// Whole seconds, or minutes and seconds from one minute on.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{} minutes and {} seconds", secs / 60, secs % 60)
    } else {
        format!("{} seconds", secs)
    }
}
