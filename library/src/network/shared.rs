//! Thread-shared network handle.
//!
//! Mutations and evaluation passes are serialized behind one `RwLock`. Property changes that
//! arrive while a pass holds the lock are queued and applied at the next pass boundary.

use std::sync::{Arc, Mutex, RwLock};

use log::{debug, warn};

use super::{ProcessorId, ProcessorNetwork};
use crate::error::{NetworkError, Result};
use crate::evaluation::{EvaluationReport, NetworkEvaluator};
use crate::model::property::PropertyValue;

#[derive(Debug, Clone, PartialEq)]
struct PendingPropertyChange {
    processor_id: ProcessorId,
    key: String,
    value: PropertyValue,
}

#[derive(Clone)]
pub struct SharedNetwork {
    network: Arc<RwLock<ProcessorNetwork>>,
    pending: Arc<Mutex<Vec<PendingPropertyChange>>>,
}

impl SharedNetwork {
    pub fn new(network: ProcessorNetwork) -> Self {
        Self {
            network: Arc::new(RwLock::new(network)),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Execute a function with a write lock on the network.
    pub fn with_write<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut ProcessorNetwork) -> Result<R>,
    {
        let mut network = self
            .network
            .write()
            .map_err(|_| NetworkError::LockPoisoned)?;
        f(&mut network)
    }

    /// Execute a function with a read lock on the network.
    pub fn with_read<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&ProcessorNetwork) -> Result<R>,
    {
        let network = self
            .network
            .read()
            .map_err(|_| NetworkError::LockPoisoned)?;
        f(&network)
    }

    /// Queue a property change for the next pass boundary. Never waits for a running pass.
    pub fn queue_property_change(
        &self,
        processor_id: ProcessorId,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        let mut pending = self.pending.lock().map_err(|_| NetworkError::LockPoisoned)?;
        pending.push(PendingPropertyChange {
            processor_id,
            key: key.to_string(),
            value: value.into(),
        });
        Ok(())
    }

    pub fn pending_changes(&self) -> Result<usize> {
        Ok(self
            .pending
            .lock()
            .map_err(|_| NetworkError::LockPoisoned)?
            .len())
    }

    /// Apply queued property changes, then run one evaluation pass, all under the write lock.
    ///
    /// A queued change for a processor that has since been removed, or for an undeclared
    /// key, is dropped with a warning rather than failing the pass.
    pub fn evaluate(&self, evaluator: &NetworkEvaluator) -> Result<EvaluationReport> {
        self.with_write(|network| {
            let changes: Vec<PendingPropertyChange> = {
                let mut pending = self.pending.lock().map_err(|_| NetworkError::LockPoisoned)?;
                pending.drain(..).collect()
            };
            if !changes.is_empty() {
                debug!("Applying {} queued property change(s)", changes.len());
            }
            for change in changes {
                if let Err(err) =
                    network.set_property(&change.processor_id, &change.key, change.value)
                {
                    warn!("Dropping queued property change: {}", err);
                }
            }
            evaluator.evaluate(network)
        })
    }
}
