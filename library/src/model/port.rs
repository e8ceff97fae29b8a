//! Port and connection model for the processor network.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::network::ProcessorId;

/// Data kind carried by a port. Two ports can only be connected if their kinds match.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortDataType {
    /// Floating point scalar (f64)
    Scalar,
    /// Integer value (i64)
    Integer,
    /// Boolean value
    Boolean,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
    /// RGBA color
    Color,
    /// Text string
    String,
    /// Flat sample buffer
    Buffer,
    /// Multi-channel image
    Image,
    /// Triangle mesh
    Mesh,
}

impl fmt::Display for PortDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortDataType::Scalar => "scalar",
            PortDataType::Integer => "integer",
            PortDataType::Boolean => "boolean",
            PortDataType::Vec2 => "vec2",
            PortDataType::Vec3 => "vec3",
            PortDataType::Color => "color",
            PortDataType::String => "string",
            PortDataType::Buffer => "buffer",
            PortDataType::Image => "image",
            PortDataType::Mesh => "mesh",
        };
        write!(f, "{}", s)
    }
}

/// Direction of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => write!(f, "input"),
            PortDirection::Output => write!(f, "output"),
        }
    }
}

/// Definition of a port on a processor type.
#[derive(Clone, Debug, PartialEq)]
pub struct PortDefinition {
    /// Internal name used for connections (e.g. "buffer_in", "factor")
    pub name: String,
    /// Display name shown to users (e.g. "Buffer", "Factor")
    pub display_name: String,
    pub direction: PortDirection,
    pub data_type: PortDataType,
    /// Connections required before the owning processor is ready (inports only)
    pub min_connections: usize,
    /// Upper bound on connections; `None` means unlimited. Outports are always unlimited.
    pub max_connections: Option<usize>,
}

impl PortDefinition {
    /// Required single-connection inport.
    pub fn input(name: &str, display_name: &str, data_type: PortDataType) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            direction: PortDirection::Input,
            data_type,
            min_connections: 1,
            max_connections: Some(1),
        }
    }

    /// Single-connection inport that may stay unconnected.
    pub fn optional_input(name: &str, display_name: &str, data_type: PortDataType) -> Self {
        Self::input(name, display_name, data_type).with_min_connections(0)
    }

    /// Inport accepting any number of connections (at least one).
    pub fn multi_input(name: &str, display_name: &str, data_type: PortDataType) -> Self {
        Self {
            max_connections: None,
            ..Self::input(name, display_name, data_type)
        }
    }

    pub fn output(name: &str, display_name: &str, data_type: PortDataType) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            direction: PortDirection::Output,
            data_type,
            min_connections: 0,
            max_connections: None,
        }
    }

    /// Clamped to `max_connections`.
    pub fn with_min_connections(mut self, min: usize) -> Self {
        self.min_connections = match self.max_connections {
            Some(max) => min.min(max),
            None => min,
        };
        self
    }

    /// Lowers `min_connections` as well if it would exceed the new maximum.
    pub fn with_max_connections(mut self, max: Option<usize>) -> Self {
        if self.direction == PortDirection::Input {
            self.max_connections = max;
            if let Some(max) = max {
                self.min_connections = self.min_connections.min(max);
            }
        }
        self
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }
}

/// Identifies a specific port on a specific processor.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId {
    pub processor_id: ProcessorId,
    pub port_name: String,
}

impl PortId {
    pub fn new(processor_id: impl Into<ProcessorId>, port_name: &str) -> Self {
        Self {
            processor_id: processor_id.into(),
            port_name: port_name.to_string(),
        }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.processor_id, self.port_name)
    }
}

/// A directed edge from an outport to an inport.
///
/// Equality is structural: two connections between the same pair of ports are the same
/// connection, which is what gives `connect` its set semantics.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortConnection {
    /// Source port (output)
    pub from: PortId,
    /// Destination port (input)
    pub to: PortId,
}

impl PortConnection {
    pub fn new(from: PortId, to: PortId) -> Self {
        Self { from, to }
    }

    /// True if either endpoint belongs to `processor_id`.
    pub fn touches(&self, processor_id: &ProcessorId) -> bool {
        &self.from.processor_id == processor_id || &self.to.processor_id == processor_id
    }
}

impl fmt::Display for PortConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
