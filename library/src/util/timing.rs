use std::borrow::Cow;
use std::time::{Duration, Instant};

use log::{self, Level};

/// Logs the elapsed time of a scope when dropped.
pub struct ScopedTimer {
    label: Option<Cow<'static, str>>,
    level: Level,
    start: Option<Instant>,
}

impl ScopedTimer {
    pub fn with_level(label: impl Into<Cow<'static, str>>, level: Level) -> Self {
        Self {
            label: Some(label.into()),
            level,
            start: Some(Instant::now()),
        }
    }

    /// Only builds the label (and reads the clock) if debug logging is enabled.
    pub fn debug_lazy<F>(label_gen: F) -> Self
    where
        F: FnOnce() -> String,
    {
        if log::log_enabled!(Level::Debug) {
            Self::with_level(label_gen(), Level::Debug)
        } else {
            Self {
                label: None,
                level: Level::Debug,
                start: None,
            }
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.start.map(|start| start.elapsed())
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if let (Some(label), Some(start)) = (&self.label, self.start) {
            let micros = start.elapsed().as_micros();
            log::log!(self.level, "{} took {} us", label, micros);
        }
    }
}
