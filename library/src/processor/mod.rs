//! Processor contract: the unit of computation owned by a `ProcessorNetwork`.

pub mod builtin;
pub mod registry;

use thiserror::Error;

use crate::evaluation::context::ProcessContext;
use crate::model::port::{PortDataType, PortDefinition};
use crate::model::property::PropertyDefinition;

pub use registry::{ProcessorCategory, ProcessorRegistry, ProcessorTypeDefinition};

/// Failure raised from [`Processor::process`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("Missing input on port '{0}'")]
    MissingInput(String),
    #[error("Port '{port}' expected {expected} data, got {actual}")]
    UnexpectedInputType {
        port: String,
        expected: PortDataType,
        actual: PortDataType,
    },
    #[error("No outport named '{0}'")]
    UnknownOutport(String),
    #[error("Outport '{port}' carries {expected} data, cannot write {actual}")]
    OutputTypeMismatch {
        port: String,
        expected: PortDataType,
        actual: PortDataType,
    },
    #[error("Invalid property '{key}': {reason}")]
    InvalidProperty { key: String, reason: String },
    #[error("{0}")]
    Failed(String),
}

impl ProcessorError {
    pub fn failed(msg: impl Into<String>) -> Self {
        ProcessorError::Failed(msg.into())
    }

    pub fn invalid_property(key: &str, reason: impl Into<String>) -> Self {
        ProcessorError::InvalidProperty {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// A node in the dataflow graph.
///
/// Port and property declarations are read once when the processor is added to a network;
/// they are expected to stay the same for the processor's lifetime. `process` reads inputs
/// and properties from the context and writes every output it produces. Outports left
/// unwritten hold no data after the call, which keeps their consumers from running.
pub trait Processor: Send + Sync {
    /// Registry key of this processor's type (e.g. "filter.scale").
    fn type_id(&self) -> &'static str;

    fn inports(&self) -> Vec<PortDefinition>;

    fn outports(&self) -> Vec<PortDefinition>;

    fn property_definitions(&self) -> Vec<PropertyDefinition> {
        Vec::new()
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessorError>;

    /// Internal state persisted alongside properties in a snapshot.
    fn serialize_state(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn deserialize_state(&mut self, _state: &serde_json::Value) -> Result<(), ProcessorError> {
        Ok(())
    }
}
