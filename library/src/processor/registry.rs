//! Processor type registry, keyed by type id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;

use super::Processor;
use crate::error::{NetworkError, Result};

/// Category of a processor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorCategory {
    /// Produces data without inports
    Source,
    /// Transforms data of one kind into the same kind
    Filter,
    /// Arithmetic on scalars
    Math,
    /// Converts between data kinds
    Conversion,
    /// Consumes data; no outports
    Sink,
    /// Host-defined processors
    Custom,
}

impl fmt::Display for ProcessorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessorCategory::Source => "Source",
            ProcessorCategory::Filter => "Filter",
            ProcessorCategory::Math => "Math",
            ProcessorCategory::Conversion => "Conversion",
            ProcessorCategory::Sink => "Sink",
            ProcessorCategory::Custom => "Custom",
        };
        write!(f, "{}", s)
    }
}

/// Metadata describing a registered processor type.
#[derive(Debug, Clone)]
pub struct ProcessorTypeDefinition {
    /// Unique type identifier (e.g. "source.buffer", "filter.scale")
    pub type_id: String,
    /// Human-readable name (e.g. "Scale")
    pub display_name: String,
    pub category: ProcessorCategory,
    pub description: String,
}

impl ProcessorTypeDefinition {
    pub fn new(type_id: &str, display_name: &str, category: ProcessorCategory) -> Self {
        Self {
            type_id: type_id.to_string(),
            display_name: display_name.to_string(),
            category,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }
}

pub type ProcessorFactory = Arc<dyn Fn() -> Box<dyn Processor> + Send + Sync>;

struct RegisteredType {
    definition: ProcessorTypeDefinition,
    factory: ProcessorFactory,
}

/// Creates processors by type id.
#[derive(Default)]
pub struct ProcessorRegistry {
    types: HashMap<String, RegisteredType>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Create a registry with all built-in processor types registered.
    pub fn with_builtin_processors() -> Self {
        let mut registry = Self::new();
        super::builtin::register_all(&mut registry);
        registry
    }

    /// Register a processor type. A later registration with the same type id replaces the
    /// earlier one.
    pub fn register<F>(&mut self, definition: ProcessorTypeDefinition, factory: F)
    where
        F: Fn() -> Box<dyn Processor> + Send + Sync + 'static,
    {
        debug!("Registering processor type '{}'", definition.type_id);
        self.types.insert(
            definition.type_id.clone(),
            RegisteredType {
                definition,
                factory: Arc::new(factory),
            },
        );
    }

    pub fn create(&self, type_id: &str) -> Result<Box<dyn Processor>> {
        self.types
            .get(type_id)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| NetworkError::UnknownProcessorType(type_id.to_string()))
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    pub fn definition(&self, type_id: &str) -> Option<&ProcessorTypeDefinition> {
        self.types.get(type_id).map(|entry| &entry.definition)
    }

    /// All registered definitions, sorted by type id.
    pub fn definitions(&self) -> Vec<&ProcessorTypeDefinition> {
        let mut defs: Vec<_> = self.types.values().map(|entry| &entry.definition).collect();
        defs.sort_by(|a, b| a.type_id.cmp(&b.type_id));
        defs
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
