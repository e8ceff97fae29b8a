//! The processor network: owns processors and the connections between their ports.

pub mod events;
pub mod graph_analysis;
pub mod node;
pub mod shared;

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use log::debug;

use crate::error::{NetworkError, ProcessorExecutionError, Result};
use crate::model::data::PortData;
use crate::model::port::{PortConnection, PortDirection, PortId};
use crate::model::property::{Invalidation, PropertyMap, PropertyValue};
use crate::model::snapshot::{NetworkSnapshot, ProcessorSnapshot};
use crate::processor::{Processor, ProcessorRegistry};

pub use events::{EventBus, NetworkEvent};
pub use node::{Inport, Outport, ProcessorId, ProcessorNode, Validity};
pub use shared::SharedNetwork;

/// Owns all processors and port connections.
///
/// Invariant: every connection's endpoints are ports of processors currently in the
/// network, and each connection is recorded identically on both of its ports.
#[derive(Default)]
pub struct ProcessorNetwork {
    nodes: HashMap<ProcessorId, ProcessorNode>,
    /// Insertion order of processor ids.
    order: Vec<ProcessorId>,
    connections: Vec<PortConnection>,
    next_seq: u64,
    events: EventBus,
}

impl ProcessorNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Processors
    // ---------------------------------------------------------------------

    /// Take ownership of `processor` under `id`. The new processor starts Invalid.
    pub fn add_processor(
        &mut self,
        id: ProcessorId,
        display_name: &str,
        processor: Box<dyn Processor>,
    ) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(NetworkError::DuplicateId(id));
        }

        debug!("Adding processor {} ({})", id, processor.type_id());
        let node = ProcessorNode::new(id.clone(), display_name.to_string(), self.next_seq, processor);
        self.next_seq += 1;
        self.nodes.insert(id.clone(), node);
        self.order.push(id.clone());
        self.events.emit(NetworkEvent::ProcessorAdded(id.clone()));
        self.events.emit(NetworkEvent::ProcessorInvalidated(id));
        self.debug_check();
        Ok(())
    }

    /// Create a processor of `type_id` from `registry` and add it. The display name is the
    /// registered type's display name.
    pub fn add_processor_from_registry(
        &mut self,
        registry: &ProcessorRegistry,
        type_id: &str,
        id: ProcessorId,
    ) -> Result<()> {
        let processor = registry.create(type_id)?;
        let display_name = registry
            .definition(type_id)
            .map(|def| def.display_name.clone())
            .unwrap_or_else(|| type_id.to_string());
        self.add_processor(id, &display_name, processor)
    }

    /// Disconnect every port of `id` and hand the processor back to the caller.
    ///
    /// Former downstream neighbours are invalidated.
    pub fn remove_processor(&mut self, id: &ProcessorId) -> Result<Box<dyn Processor>> {
        if !self.nodes.contains_key(id) {
            return Err(NetworkError::NotFound(id.clone()));
        }

        let touching: Vec<PortConnection> = self
            .connections
            .iter()
            .filter(|c| c.touches(id))
            .cloned()
            .collect();
        for conn in touching {
            self.disconnect(&conn.from, &conn.to)?;
        }

        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| NetworkError::NotFound(id.clone()))?;
        self.order.retain(|existing| existing != id);
        debug!("Removed processor {}", id);
        self.events.emit(NetworkEvent::ProcessorRemoved(id.clone()));
        self.debug_check();
        Ok(node.processor)
    }

    // ---------------------------------------------------------------------
    // Connections
    // ---------------------------------------------------------------------

    /// Connect outport `from` to inport `to`.
    ///
    /// Returns `Ok(false)` if the pair is already connected. On a new connection the
    /// destination and everything downstream of it is invalidated.
    pub fn connect(&mut self, from: PortId, to: PortId) -> Result<bool> {
        let source = self.require_node(&from.processor_id)?;
        let from_port = match source.outport(&from.port_name) {
            Some(port) => port,
            None => {
                let is_inport = source.inport(&from.port_name).is_some();
                return Err(port_error(is_inport, from, PortDirection::Output));
            }
        };
        let from_type = from_port.definition.data_type;

        let dest = self.require_node(&to.processor_id)?;
        let to_port = match dest.inport(&to.port_name) {
            Some(port) => port,
            None => {
                let is_outport = dest.outport(&to.port_name).is_some();
                return Err(port_error(is_outport, to, PortDirection::Input));
            }
        };
        let to_type = to_port.definition.data_type;
        let to_max = to_port.definition.max_connections;
        let to_count = to_port.connections.len();

        if from.processor_id == to.processor_id {
            return Err(NetworkError::SelfLoop(from.processor_id));
        }

        let conn = PortConnection::new(from, to);
        if self.connections.contains(&conn) {
            return Ok(false);
        }

        if from_type != to_type {
            return Err(NetworkError::IncompatibleType {
                from: conn.from,
                to: conn.to,
                from_type,
                to_type,
            });
        }

        if graph_analysis::would_create_cycle(self, &conn.from.processor_id, &conn.to.processor_id) {
            return Err(NetworkError::Cycle {
                from: conn.from,
                to: conn.to,
            });
        }

        if let Some(max) = to_max {
            if to_count >= max {
                return Err(NetworkError::PortFull { port: conn.to, max });
            }
        }

        self.port_links_mut(&conn)?;
        debug!("Connected {}", conn);
        self.connections.push(conn.clone());
        self.events.emit(NetworkEvent::PortConnected(conn.clone()));
        self.invalidate_from(&conn.to.processor_id);
        self.debug_check();
        Ok(true)
    }

    /// Remove the connection `from` → `to` if present and invalidate the destination.
    ///
    /// Returns `Ok(false)` when the ports were not connected.
    pub fn disconnect(&mut self, from: &PortId, to: &PortId) -> Result<bool> {
        self.require_node(&from.processor_id)?;
        self.require_node(&to.processor_id)?;

        let Some(index) = self
            .connections
            .iter()
            .position(|c| &c.from == from && &c.to == to)
        else {
            return Ok(false);
        };
        let conn = self.connections.remove(index);

        if let Some(port) = self
            .nodes
            .get_mut(&conn.from.processor_id)
            .and_then(|node| node.outport_mut(&conn.from.port_name))
        {
            port.connections.retain(|peer| peer != &conn.to);
        }
        if let Some(port) = self
            .nodes
            .get_mut(&conn.to.processor_id)
            .and_then(|node| node.inport_mut(&conn.to.port_name))
        {
            port.connections.retain(|peer| peer != &conn.from);
        }

        debug!("Disconnected {}", conn);
        self.events.emit(NetworkEvent::PortDisconnected(conn.clone()));
        self.invalidate_from(&conn.to.processor_id);
        self.debug_check();
        Ok(true)
    }

    fn port_links_mut(&mut self, conn: &PortConnection) -> Result<()> {
        self.nodes
            .get_mut(&conn.from.processor_id)
            .and_then(|node| node.outport_mut(&conn.from.port_name))
            .ok_or_else(|| NetworkError::PortNotFound(conn.from.clone()))?
            .connections
            .push(conn.to.clone());
        self.nodes
            .get_mut(&conn.to.processor_id)
            .and_then(|node| node.inport_mut(&conn.to.port_name))
            .ok_or_else(|| NetworkError::PortNotFound(conn.to.clone()))?
            .connections
            .push(conn.from.clone());
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Invalidation
    // ---------------------------------------------------------------------

    /// Mark `id` Invalid and propagate downstream.
    pub fn invalidate(&mut self, id: &ProcessorId) -> Result<()> {
        self.require_node(id)?;
        self.invalidate_from(id);
        Ok(())
    }

    /// Apply an invalidation token produced by a property change.
    pub fn apply_invalidation(&mut self, invalidation: Invalidation) -> Result<()> {
        self.invalidate(&invalidation.processor_id)
    }

    /// Walk downstream from `start`, marking processors Invalid. The walk does not continue
    /// past a processor that was already Invalid: its dependents are Invalid as well.
    pub(crate) fn invalidate_from(&mut self, start: &ProcessorId) {
        let mut stack = vec![start.clone()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            if !node.mark_invalid() {
                continue;
            }
            debug!("Invalidated {}", id);
            stack.extend(node.downstream_ids().cloned());
            self.events.emit(NetworkEvent::ProcessorInvalidated(id));
        }
    }

    /// Mark every processor Invalid, e.g. after restoring a snapshot.
    pub fn invalidate_all(&mut self) {
        for id in self.order.clone() {
            self.invalidate_from(&id);
        }
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    /// Set a property on a processor. Returns `true` if the value changed, in which case
    /// the processor and its dependents were invalidated.
    pub fn set_property(
        &mut self,
        id: &ProcessorId,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| NetworkError::NotFound(id.clone()))?;
        if !node.declares_property(key) {
            return Err(NetworkError::UnknownProperty {
                processor_id: id.clone(),
                key: key.to_string(),
            });
        }

        match node.properties.set(id, key, value.into()) {
            Some(invalidation) => {
                self.events.emit(NetworkEvent::PropertyChanged {
                    processor_id: id.clone(),
                    key: key.to_string(),
                });
                self.apply_invalidation(invalidation)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn properties(&self, id: &ProcessorId) -> Result<&PropertyMap> {
        Ok(&self.require_node(id)?.properties)
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn contains(&self, id: &ProcessorId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &ProcessorId) -> Option<&ProcessorNode> {
        self.nodes.get(id)
    }

    pub fn processor(&self, id: &ProcessorId) -> Option<&dyn Processor> {
        self.nodes.get(id).map(|node| node.processor.as_ref())
    }

    /// Processor ids in insertion order.
    pub fn processor_ids(&self) -> impl Iterator<Item = &ProcessorId> {
        self.order.iter()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ProcessorNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Connections in the order they were made.
    pub fn connections(&self) -> &[PortConnection] {
        &self.connections
    }

    pub fn is_connected(&self, from: &PortId, to: &PortId) -> bool {
        self.connections.iter().any(|c| &c.from == from && &c.to == to)
    }

    pub fn validity(&self, id: &ProcessorId) -> Result<Validity> {
        Ok(self.require_node(id)?.validity)
    }

    /// Whether `id` could run now: inport minimums are met and all feeding outports hold
    /// valid data.
    pub fn is_ready(&self, id: &ProcessorId) -> Result<bool> {
        let node = self.require_node(id)?;
        Ok(node::inputs_ready(node, |peer| self.nodes.get(peer)))
    }

    pub fn last_error(&self, id: &ProcessorId) -> Result<Option<&ProcessorExecutionError>> {
        Ok(self.require_node(id)?.last_error.as_ref())
    }

    /// Valid data currently held by an outport.
    pub fn outport_data(&self, port: &PortId) -> Option<&PortData> {
        self.nodes
            .get(&port.processor_id)
            .and_then(|node| node.outport(&port.port_name))
            .and_then(Outport::valid_data)
    }

    pub fn downstream_of(&self, id: &ProcessorId) -> Result<Vec<ProcessorId>> {
        self.require_node(id)?;
        Ok(graph_analysis::downstream_closure(self, id))
    }

    /// Direct upstream neighbours of `id`, deduplicated, in connection order.
    pub fn upstream_of(&self, id: &ProcessorId) -> Result<Vec<ProcessorId>> {
        let node = self.require_node(id)?;
        let mut result: Vec<ProcessorId> = Vec::new();
        for upstream in node.upstream_ids() {
            if !result.contains(upstream) {
                result.push(upstream.clone());
            }
        }
        Ok(result)
    }

    /// Ids of all processors currently Invalid, in insertion order.
    pub fn invalid_processors(&self) -> Vec<ProcessorId> {
        self.nodes()
            .filter(|node| node.validity == Validity::Invalid)
            .map(|node| node.id.clone())
            .collect()
    }

    pub fn subscribe(&mut self) -> Receiver<NetworkEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&mut self, event: NetworkEvent) {
        self.events.emit(event);
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = (&ProcessorId, &mut ProcessorNode)> {
        self.nodes.iter_mut()
    }

    fn require_node(&self, id: &ProcessorId) -> Result<&ProcessorNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| NetworkError::NotFound(id.clone()))
    }

    // ---------------------------------------------------------------------
    // Integrity
    // ---------------------------------------------------------------------

    /// Verify that no connection references a missing processor or port and that both
    /// port-side views of every connection agree with the connection list.
    pub fn check_integrity(&self) -> Result<()> {
        if self.order.len() != self.nodes.len()
            || self.order.iter().any(|id| !self.nodes.contains_key(id))
        {
            return Err(NetworkError::corrupted(
                "insertion order does not match the processor set",
            ));
        }

        for conn in &self.connections {
            let outport = self
                .nodes
                .get(&conn.from.processor_id)
                .and_then(|node| node.outport(&conn.from.port_name))
                .ok_or_else(|| {
                    NetworkError::corrupted(format!("connection {} has a dangling source", conn))
                })?;
            let inport = self
                .nodes
                .get(&conn.to.processor_id)
                .and_then(|node| node.inport(&conn.to.port_name))
                .ok_or_else(|| {
                    NetworkError::corrupted(format!(
                        "connection {} has a dangling destination",
                        conn
                    ))
                })?;
            if !outport.connections.contains(&conn.to) || !inport.connections.contains(&conn.from) {
                return Err(NetworkError::corrupted(format!(
                    "connection {} is not registered on its ports",
                    conn
                )));
            }
        }

        let port_side_links: usize = self
            .nodes
            .values()
            .map(|node| node.inports.iter().map(|p| p.connections.len()).sum::<usize>())
            .sum();
        if port_side_links != self.connections.len() {
            return Err(NetworkError::corrupted(format!(
                "{} inport links for {} connections",
                port_side_links,
                self.connections.len()
            )));
        }

        Ok(())
    }

    fn debug_check(&self) {
        debug_assert!(
            self.check_integrity().is_ok(),
            "network invariant violated: {:?}",
            self.check_integrity().err()
        );
    }

    // ---------------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------------

    /// Capture processors (with properties and persisted state) and connections.
    pub fn snapshot(&self) -> NetworkSnapshot {
        let processors = self
            .nodes()
            .map(|node| ProcessorSnapshot {
                id: node.id.clone(),
                type_id: node.type_id().to_string(),
                display_name: node.display_name.clone(),
                properties: node.properties.clone(),
                state: node.processor.serialize_state(),
            })
            .collect();
        NetworkSnapshot {
            processors,
            connections: self.connections.clone(),
        }
    }

    /// Rebuild a network from `snapshot`, creating processors through `registry`.
    ///
    /// Every processor of the restored network is Invalid, so the first evaluation pass
    /// recomputes all of it.
    pub fn from_snapshot(snapshot: &NetworkSnapshot, registry: &ProcessorRegistry) -> Result<Self> {
        let mut network = Self::new();
        for entry in &snapshot.processors {
            network.add_processor_from_registry(registry, &entry.type_id, entry.id.clone())?;
            let node = network
                .nodes
                .get_mut(&entry.id)
                .ok_or_else(|| NetworkError::NotFound(entry.id.clone()))?;
            node.display_name = entry.display_name.clone();
            node.properties.merge(&entry.properties);
            node.restore_state(&entry.state)
                .map_err(|source| ProcessorExecutionError::new(entry.id.clone(), source))?;
        }
        for conn in &snapshot.connections {
            network.connect(conn.from.clone(), conn.to.clone())?;
        }
        network.invalidate_all();
        Ok(network)
    }
}

fn port_error(exists_other_way: bool, port: PortId, expected: PortDirection) -> NetworkError {
    if exists_other_way {
        NetworkError::PortDirection { port, expected }
    } else {
        NetworkError::PortNotFound(port)
    }
}
