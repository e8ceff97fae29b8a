use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use ordered_float::OrderedFloat;
use std::hash::{Hash, Hasher};

use crate::network::ProcessorId;

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(untagged)]
pub enum PropertyValue {
    // Integer before Number so that whole JSON numbers come back as integers.
    Integer(i64),
    Number(OrderedFloat<f64>),
    String(String),
    Boolean(bool),
    Array(Vec<PropertyValue>),
}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            PropertyValue::Number(n) => n.hash(state),
            PropertyValue::Integer(i) => i.hash(state),
            PropertyValue::String(s) => s.hash(state),
            PropertyValue::Boolean(b) => b.hash(state),
            PropertyValue::Array(arr) => arr.hash(state),
        }
    }
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(n.into_inner()),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            PropertyValue::Number(n) if n.fract() == 0.0 => Some(n.into_inner() as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Array of numbers; any non-numeric element makes the whole conversion fail.
    pub fn as_f64_array(&self) -> Option<Vec<f64>> {
        match self {
            PropertyValue::Array(items) => items.iter().map(PropertyValue::as_f64).collect(),
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(OrderedFloat(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(value: Vec<f64>) -> Self {
        PropertyValue::Array(value.into_iter().map(PropertyValue::from).collect())
    }
}

/// Declared configuration value of a processor type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub name: String,
    pub label: String,
    pub default_value: PropertyValue,
}

impl PropertyDefinition {
    pub fn new(name: &str, label: &str, default_value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            default_value: default_value.into(),
        }
    }
}

/// Proof that a processor's configuration changed and its output is stale.
///
/// Produced by [`PropertyMap::set`]; the owning network applies it with
/// `ProcessorNetwork::apply_invalidation`.
#[must_use = "an Invalidation does nothing until the network applies it"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub processor_id: ProcessorId,
    pub key: String,
}

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq, Debug)]
#[serde(transparent)]
pub struct PropertyMap {
    properties: HashMap<String, PropertyValue>,
}

impl Hash for PropertyMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut entries: Vec<_> = self.properties.iter().collect();
        entries.sort_by_key(|(k, _)| k.as_str());
        for (k, v) in entries {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl PropertyMap {
    pub fn new() -> Self {
        Self {
            properties: HashMap::new(),
        }
    }

    pub fn from_definitions(definitions: &[PropertyDefinition]) -> Self {
        let properties = definitions
            .iter()
            .map(|def| (def.name.clone(), def.default_value.clone()))
            .collect();
        Self { properties }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Store `value` under `key`. Returns an invalidation for `owner` only if the stored
    /// value actually changed.
    pub fn set(
        &mut self,
        owner: &ProcessorId,
        key: &str,
        value: PropertyValue,
    ) -> Option<Invalidation> {
        if self.properties.get(key) == Some(&value) {
            return None;
        }
        self.properties.insert(key.to_string(), value);
        Some(Invalidation {
            processor_id: owner.clone(),
            key: key.to_string(),
        })
    }

    /// Overlay values from `other`, keeping keys `other` does not mention.
    pub fn merge(&mut self, other: &PropertyMap) {
        for (key, value) in other.iter() {
            self.properties.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropertyValue::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropertyValue::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PropertyValue::as_bool)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn get_array_f64(&self, key: &str) -> Option<Vec<f64>> {
        self.get(key).and_then(PropertyValue::as_f64_array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> ProcessorId {
        ProcessorId::new("scale")
    }

    #[test]
    fn test_set_returns_invalidation_on_change() {
        let mut map = PropertyMap::from_definitions(&[PropertyDefinition::new(
            "factor", "Factor", 1.0,
        )]);
        let token = map.set(&owner(), "factor", 2.0.into());
        assert_eq!(
            token,
            Some(Invalidation {
                processor_id: owner(),
                key: "factor".to_string()
            })
        );
        assert_eq!(map.get_f64("factor"), Some(2.0));
    }

    #[test]
    fn test_set_same_value_is_silent() {
        let mut map = PropertyMap::from_definitions(&[PropertyDefinition::new(
            "factor", "Factor", 1.0,
        )]);
        assert!(map.set(&owner(), "factor", 1.0.into()).is_none());
    }

    #[test]
    fn test_array_roundtrip_through_json() {
        let mut map = PropertyMap::new();
        let _ = map.set(&owner(), "values", vec![1.0, 2.5].into());
        let json = serde_json::to_string(&map).unwrap();
        let loaded: PropertyMap = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.get_array_f64("values"), Some(vec![1.0, 2.5]));
    }

    #[test]
    fn test_integer_number_conversions() {
        assert_eq!(PropertyValue::from(4.0).as_i64(), Some(4));
        assert_eq!(PropertyValue::from(4.5).as_i64(), None);
        assert_eq!(PropertyValue::Integer(3).as_f64(), Some(3.0));
    }
}
