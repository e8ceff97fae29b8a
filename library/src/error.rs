use thiserror::Error;

use crate::model::port::{PortDataType, PortDirection, PortId};
use crate::network::ProcessorId;
use crate::processor::ProcessorError;

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Incompatible port types: {from} ({from_type}) -> {to} ({to_type})")]
    IncompatibleType {
        from: PortId,
        to: PortId,
        from_type: PortDataType,
        to_type: PortDataType,
    },
    #[error("Cannot connect processor {0} to itself")]
    SelfLoop(ProcessorId),
    #[error("Connection {from} -> {to} would create a cycle")]
    Cycle { from: PortId, to: PortId },
    #[error("Inport {port} already has the maximum of {max} connection(s)")]
    PortFull { port: PortId, max: usize },
    #[error("Processor id already in use: {0}")]
    DuplicateId(ProcessorId),
    #[error("Processor not found: {0}")]
    NotFound(ProcessorId),
    #[error("Port not found: {0}")]
    PortNotFound(PortId),
    #[error("Port {port} is not an {expected} port")]
    PortDirection {
        port: PortId,
        expected: PortDirection,
    },
    #[error("Unknown processor type: {0}")]
    UnknownProcessorType(String),
    #[error("Processor {processor_id} has no property '{key}'")]
    UnknownProperty {
        processor_id: ProcessorId,
        key: String,
    },
    #[error("{0}")]
    ProcessorExecution(#[from] ProcessorExecutionError),
    #[error("Corrupted network graph: {0}")]
    CorruptedGraph(String),
    #[error("Lock poisoned")]
    LockPoisoned,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl NetworkError {
    pub fn corrupted(msg: impl Into<String>) -> Self {
        NetworkError::CorruptedGraph(msg.into())
    }

    /// Graph-mutation errors leave the network untouched and can simply be reported.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            NetworkError::CorruptedGraph(_) | NetworkError::LockPoisoned
        )
    }
}

/// A `process()` failure, tagged with the processor that raised it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Processor {processor_id} failed: {source}")]
pub struct ProcessorExecutionError {
    pub processor_id: ProcessorId,
    #[source]
    pub source: ProcessorError,
}

impl ProcessorExecutionError {
    pub fn new(processor_id: ProcessorId, source: ProcessorError) -> Self {
        Self {
            processor_id,
            source,
        }
    }

    pub fn message(&self) -> String {
        self.source.to_string()
    }
}
