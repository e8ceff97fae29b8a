//! Per-processor bookkeeping held by the network: ports, properties and validity.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProcessorExecutionError;
use crate::evaluation::context::ProcessContext;
use crate::model::data::PortData;
use crate::model::port::{PortDefinition, PortId};
use crate::model::property::{PropertyDefinition, PropertyMap};
use crate::processor::{Processor, ProcessorError};

/// Unique identifier of a processor within a network.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ProcessorId(String);

impl ProcessorId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Fresh random id, for processors created without a caller-chosen identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProcessorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&ProcessorId> for ProcessorId {
    fn from(value: &ProcessorId) -> Self {
        value.clone()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Validity {
    Valid,
    Invalid,
}

/// Input endpoint state: the outports currently feeding it, in connection order.
#[derive(Debug, Clone)]
pub struct Inport {
    pub definition: PortDefinition,
    pub(crate) connections: Vec<PortId>,
}

impl Inport {
    pub fn connections(&self) -> &[PortId] {
        &self.connections
    }
}

/// Output endpoint state: consumers plus the data last produced here.
#[derive(Debug, Clone)]
pub struct Outport {
    pub definition: PortDefinition,
    pub(crate) connections: Vec<PortId>,
    data: Option<PortData>,
    valid: bool,
}

impl Outport {
    pub fn connections(&self) -> &[PortId] {
        &self.connections
    }

    /// Data produced by the last successful `process()`, unless it has since gone stale.
    pub fn valid_data(&self) -> Option<&PortData> {
        if self.valid { self.data.as_ref() } else { None }
    }

    pub fn is_valid(&self) -> bool {
        self.valid && self.data.is_some()
    }
}

pub struct ProcessorNode {
    pub(crate) id: ProcessorId,
    pub(crate) display_name: String,
    /// Insertion sequence number; breaks ties in the topological order.
    pub(crate) seq: u64,
    pub(crate) processor: Box<dyn Processor>,
    pub(crate) inports: Vec<Inport>,
    pub(crate) outports: Vec<Outport>,
    pub(crate) property_definitions: Vec<PropertyDefinition>,
    pub(crate) properties: PropertyMap,
    pub(crate) validity: Validity,
    pub(crate) last_error: Option<ProcessorExecutionError>,
    pub(crate) execution_count: u64,
}

impl ProcessorNode {
    pub(crate) fn new(
        id: ProcessorId,
        display_name: String,
        seq: u64,
        processor: Box<dyn Processor>,
    ) -> Self {
        let inports = processor
            .inports()
            .into_iter()
            .map(|definition| Inport {
                definition,
                connections: Vec::new(),
            })
            .collect();
        let outports = processor
            .outports()
            .into_iter()
            .map(|definition| Outport {
                definition,
                connections: Vec::new(),
                data: None,
                valid: false,
            })
            .collect();
        let property_definitions = processor.property_definitions();
        let properties = PropertyMap::from_definitions(&property_definitions);

        Self {
            id,
            display_name,
            seq,
            processor,
            inports,
            outports,
            property_definitions,
            properties,
            validity: Validity::Invalid,
            last_error: None,
            execution_count: 0,
        }
    }

    pub fn id(&self) -> &ProcessorId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn type_id(&self) -> &'static str {
        self.processor.type_id()
    }

    pub fn processor(&self) -> &dyn Processor {
        self.processor.as_ref()
    }

    pub fn inports(&self) -> &[Inport] {
        &self.inports
    }

    pub fn outports(&self) -> &[Outport] {
        &self.outports
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }

    pub fn last_error(&self) -> Option<&ProcessorExecutionError> {
        self.last_error.as_ref()
    }

    /// Number of successful `process()` calls over the node's lifetime.
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    pub fn inport(&self, name: &str) -> Option<&Inport> {
        self.inports.iter().find(|p| p.definition.name == name)
    }

    pub fn outport(&self, name: &str) -> Option<&Outport> {
        self.outports.iter().find(|p| p.definition.name == name)
    }

    pub(crate) fn inport_mut(&mut self, name: &str) -> Option<&mut Inport> {
        self.inports.iter_mut().find(|p| p.definition.name == name)
    }

    pub(crate) fn outport_mut(&mut self, name: &str) -> Option<&mut Outport> {
        self.outports.iter_mut().find(|p| p.definition.name == name)
    }

    pub(crate) fn declares_property(&self, key: &str) -> bool {
        self.property_definitions.iter().any(|def| def.name == key) || self.properties.contains(key)
    }

    /// Ids of processors fed by this node's outports (may repeat).
    pub(crate) fn downstream_ids(&self) -> impl Iterator<Item = &ProcessorId> {
        self.outports
            .iter()
            .flat_map(|p| p.connections.iter().map(|peer| &peer.processor_id))
    }

    /// Ids of processors feeding this node's inports (may repeat).
    pub(crate) fn upstream_ids(&self) -> impl Iterator<Item = &ProcessorId> {
        self.inports
            .iter()
            .flat_map(|p| p.connections.iter().map(|peer| &peer.processor_id))
    }

    /// Mark Invalid and stale all outport data. Returns false if the node already was Invalid.
    pub(crate) fn mark_invalid(&mut self) -> bool {
        for port in &mut self.outports {
            port.valid = false;
        }
        if self.validity == Validity::Invalid {
            return false;
        }
        self.validity = Validity::Invalid;
        true
    }

    /// Run `process()` with the gathered inputs.
    ///
    /// On success outputs are stored and the node becomes Valid; the returned flag is the
    /// processor's re-evaluation request. On failure the node stays Invalid and keeps the
    /// error as `last_error`.
    pub(crate) fn execute(
        &mut self,
        inputs: HashMap<String, Vec<PortData>>,
    ) -> Result<bool, ProcessorExecutionError> {
        let mut ctx = ProcessContext::new(&self.id, &inputs, &self.properties, &self.outports);
        let result = self.processor.process(&mut ctx);
        let (mut outputs, reevaluate) = ctx.finish();

        match result {
            Ok(()) => {
                for port in &mut self.outports {
                    port.data = outputs.remove(&port.definition.name);
                    port.valid = true;
                }
                self.validity = Validity::Valid;
                self.last_error = None;
                self.execution_count += 1;
                Ok(reevaluate)
            }
            Err(err) => {
                let err = ProcessorExecutionError::new(self.id.clone(), err);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub(crate) fn restore_state(
        &mut self,
        state: &serde_json::Value,
    ) -> Result<(), ProcessorError> {
        self.processor.deserialize_state(state)
    }
}

/// Readiness rule shared by the network and the evaluator.
///
/// Every inport must meet its minimum connection count, and every outport connected to any
/// inport must hold valid data.
pub(crate) fn inputs_ready<'n>(
    node: &ProcessorNode,
    lookup: impl Fn(&ProcessorId) -> Option<&'n ProcessorNode>,
) -> bool {
    node.inports.iter().all(|inport| {
        inport.connections.len() >= inport.definition.min_connections
            && inport.connections.iter().all(|peer| {
                lookup(&peer.processor_id)
                    .and_then(|upstream| upstream.outport(&peer.port_name))
                    .is_some_and(Outport::is_valid)
            })
    })
}

/// Collect input data per inport, in connection order. Assumes `inputs_ready` holds.
pub(crate) fn gather_inputs<'n>(
    node: &ProcessorNode,
    lookup: impl Fn(&ProcessorId) -> Option<&'n ProcessorNode>,
) -> HashMap<String, Vec<PortData>> {
    node.inports
        .iter()
        .map(|inport| {
            let values = inport
                .connections
                .iter()
                .filter_map(|peer| {
                    lookup(&peer.processor_id)
                        .and_then(|upstream| upstream.outport(&peer.port_name))
                        .and_then(|port| port.valid_data())
                        .cloned()
                })
                .collect();
            (inport.definition.name.clone(), values)
        })
        .collect()
}
