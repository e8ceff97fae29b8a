use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::evaluation::context::ProcessContext;
use crate::model::data::PortData;
use crate::model::port::{PortDataType, PortDefinition};
use crate::processor::{Processor, ProcessorError};

/// Every data kind gets its own registered sink type.
pub(super) const SINK_KINDS: [PortDataType; 10] = [
    PortDataType::Scalar,
    PortDataType::Integer,
    PortDataType::Boolean,
    PortDataType::Vec2,
    PortDataType::Vec3,
    PortDataType::Color,
    PortDataType::String,
    PortDataType::Buffer,
    PortDataType::Image,
    PortDataType::Mesh,
];

/// Registry key of the sink accepting `data_type`. Scalars keep the plain `sink.value` name.
pub fn sink_type_id(data_type: PortDataType) -> &'static str {
    match data_type {
        PortDataType::Scalar => "sink.value",
        PortDataType::Integer => "sink.integer",
        PortDataType::Boolean => "sink.boolean",
        PortDataType::Vec2 => "sink.vec2",
        PortDataType::Vec3 => "sink.vec3",
        PortDataType::Color => "sink.color",
        PortDataType::String => "sink.string",
        PortDataType::Buffer => "sink.buffer",
        PortDataType::Image => "sink.image",
        PortDataType::Mesh => "sink.mesh",
    }
}

#[derive(Debug, Default)]
struct SinkState {
    latest: Option<PortData>,
    received: u64,
}

/// Host-side view of what a [`ValueSink`] has received.
#[derive(Debug, Clone, Default)]
pub struct SinkHandle {
    state: Arc<Mutex<SinkState>>,
}

impl SinkHandle {
    pub fn latest(&self) -> Option<PortData> {
        self.state.lock().ok().and_then(|state| state.latest.clone())
    }

    /// Number of values received so far.
    pub fn received(&self) -> u64 {
        self.state.lock().map(|state| state.received).unwrap_or(0)
    }
}

/// Terminal processor that stores the last value arriving on its `value` inport.
pub struct ValueSink {
    data_type: PortDataType,
    handle: SinkHandle,
}

impl ValueSink {
    pub fn new(data_type: PortDataType) -> Self {
        Self {
            data_type,
            handle: SinkHandle::default(),
        }
    }

    pub fn data_type(&self) -> PortDataType {
        self.data_type
    }

    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }
}

impl Processor for ValueSink {
    fn type_id(&self) -> &'static str {
        sink_type_id(self.data_type)
    }

    fn inports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("value", "Value", self.data_type)]
    }

    fn outports(&self) -> Vec<PortDefinition> {
        Vec::new()
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessorError> {
        let value = ctx.require_input("value")?.clone();
        let mut state = self
            .handle
            .state
            .lock()
            .map_err(|_| ProcessorError::failed("sink state lock poisoned"))?;
        state.latest = Some(value);
        state.received += 1;
        Ok(())
    }

    fn serialize_state(&self) -> serde_json::Value {
        json!({ "received": self.handle.received() })
    }

    fn deserialize_state(&mut self, state: &serde_json::Value) -> Result<(), ProcessorError> {
        if state.is_null() {
            return Ok(());
        }
        let received = state
            .get("received")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| ProcessorError::failed("sink state is missing 'received'"))?;
        let mut inner = self
            .handle
            .state
            .lock()
            .map_err(|_| ProcessorError::failed("sink state lock poisoned"))?;
        inner.received = received;
        Ok(())
    }
}
