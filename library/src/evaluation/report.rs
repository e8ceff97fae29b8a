use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use crate::error::ProcessorExecutionError;
use crate::network::ProcessorId;

/// Outcome of one evaluation pass.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub pass_id: Uuid,
    /// Processors whose `process()` succeeded, in execution order.
    pub executed: Vec<ProcessorId>,
    /// Invalid processors that were not ready and stay pending.
    pub skipped: Vec<ProcessorId>,
    pub failed: Vec<ProcessorExecutionError>,
    pub elapsed: Duration,
}

impl EvaluationReport {
    pub fn new(pass_id: Uuid) -> Self {
        Self {
            pass_id,
            executed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// True if every Invalid processor became Valid.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }

    /// True if the pass had nothing to do.
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }

    pub fn was_executed(&self, id: &ProcessorId) -> bool {
        self.executed.contains(id)
    }

    pub fn failed_ids(&self) -> Vec<&ProcessorId> {
        self.failed.iter().map(|err| &err.processor_id).collect()
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pass {}: {} executed, {} skipped, {} failed ({} us)",
            self.pass_id,
            self.executed.len(),
            self.skipped.len(),
            self.failed.len(),
            self.elapsed.as_micros()
        )
    }
}
