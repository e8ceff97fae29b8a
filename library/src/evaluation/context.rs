//! What a processor sees during one `process()` call.

use std::collections::HashMap;

use crate::model::data::PortData;
use crate::model::port::PortDataType;
use crate::model::property::PropertyMap;
use crate::network::ProcessorId;
use crate::network::node::Outport;
use crate::processor::ProcessorError;

/// Inputs, properties and output slots for a single `process()` call.
///
/// Created fresh for each call. Inputs are snapshots of the upstream outports taken just
/// before the call; outputs are only published to the network if `process()` succeeds.
pub struct ProcessContext<'a> {
    processor_id: &'a ProcessorId,
    inputs: &'a HashMap<String, Vec<PortData>>,
    properties: &'a PropertyMap,
    outports: &'a [Outport],
    outputs: HashMap<String, PortData>,
    reevaluate: bool,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(
        processor_id: &'a ProcessorId,
        inputs: &'a HashMap<String, Vec<PortData>>,
        properties: &'a PropertyMap,
        outports: &'a [Outport],
    ) -> Self {
        Self {
            processor_id,
            inputs,
            properties,
            outports,
            outputs: HashMap::new(),
            reevaluate: false,
        }
    }

    pub fn processor_id(&self) -> &ProcessorId {
        self.processor_id
    }

    pub fn properties(&self) -> &PropertyMap {
        self.properties
    }

    /// All values arriving on `port`, in connection order. Empty if unconnected.
    pub fn inputs(&self, port: &str) -> &[PortData] {
        self.inputs.get(port).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value arriving on `port`.
    pub fn input(&self, port: &str) -> Option<&PortData> {
        self.inputs(port).first()
    }

    pub fn require_input(&self, port: &str) -> Result<&PortData, ProcessorError> {
        self.input(port)
            .ok_or_else(|| ProcessorError::MissingInput(port.to_string()))
    }

    pub fn scalar_input(&self, port: &str) -> Result<f64, ProcessorError> {
        let data = self.require_input(port)?;
        data.as_scalar()
            .ok_or_else(|| unexpected(port, PortDataType::Scalar, data))
    }

    pub fn buffer_input(&self, port: &str) -> Result<&[f64], ProcessorError> {
        let data = self.require_input(port)?;
        data.as_buffer()
            .ok_or_else(|| unexpected(port, PortDataType::Buffer, data))
    }

    /// Publish `data` on outport `port`. Rejects unknown ports and mismatched data kinds.
    pub fn set_output(
        &mut self,
        port: &str,
        data: impl Into<PortData>,
    ) -> Result<(), ProcessorError> {
        let data = data.into();
        let outport = self
            .outports
            .iter()
            .find(|p| p.definition.name == port)
            .ok_or_else(|| ProcessorError::UnknownOutport(port.to_string()))?;

        if outport.definition.data_type != data.data_type() {
            return Err(ProcessorError::OutputTypeMismatch {
                port: port.to_string(),
                expected: outport.definition.data_type,
                actual: data.data_type(),
            });
        }

        self.outputs.insert(port.to_string(), data);
        Ok(())
    }

    /// Ask for this processor to be invalidated again once the current pass is over.
    ///
    /// The processor is never re-run within the same pass.
    pub fn request_reevaluation(&mut self) {
        self.reevaluate = true;
    }

    pub(crate) fn finish(self) -> (HashMap<String, PortData>, bool) {
        (self.outputs, self.reevaluate)
    }
}

fn unexpected(port: &str, expected: PortDataType, data: &PortData) -> ProcessorError {
    ProcessorError::UnexpectedInputType {
        port: port.to_string(),
        expected,
        actual: data.data_type(),
    }
}
