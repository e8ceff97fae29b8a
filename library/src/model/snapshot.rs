//! Persisted layout of a processor network.

use serde::{Deserialize, Serialize};

use super::port::PortConnection;
use super::property::PropertyMap;
use crate::network::ProcessorId;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProcessorSnapshot {
    pub id: ProcessorId,
    pub type_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub properties: PropertyMap,
    /// Output of `Processor::serialize_state`.
    #[serde(default)]
    pub state: serde_json::Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct NetworkSnapshot {
    pub processors: Vec<ProcessorSnapshot>,
    #[serde(default)]
    pub connections: Vec<PortConnection>,
}

impl NetworkSnapshot {
    pub fn load(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    pub fn save(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
