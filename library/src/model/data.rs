//! Typed values that flow through the network.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::port::PortDataType;

/// Plain multi-channel image container. Pixels are stored row-major, channel-interleaved.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub pixels: Vec<f32>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            width,
            height,
            channels,
            pixels: vec![0.0; len],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct MeshData {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
}

/// The value held by an outport after its processor ran.
///
/// Each variant corresponds to a `PortDataType`. Heavy payloads are reference counted so
/// that an outport feeding many inports does not copy them.
#[derive(Clone, Debug, PartialEq)]
pub enum PortData {
    Scalar(f64),
    Integer(i64),
    Boolean(bool),
    Vec2(f64, f64),
    Vec3(f64, f64, f64),
    /// RGBA, 0.0..=1.0 per channel.
    Color([f32; 4]),
    String(String),
    Buffer(Arc<Vec<f64>>),
    Image(Arc<ImageData>),
    Mesh(Arc<MeshData>),
}

impl PortData {
    pub fn data_type(&self) -> PortDataType {
        match self {
            PortData::Scalar(_) => PortDataType::Scalar,
            PortData::Integer(_) => PortDataType::Integer,
            PortData::Boolean(_) => PortDataType::Boolean,
            PortData::Vec2(..) => PortDataType::Vec2,
            PortData::Vec3(..) => PortDataType::Vec3,
            PortData::Color(_) => PortDataType::Color,
            PortData::String(_) => PortDataType::String,
            PortData::Buffer(_) => PortDataType::Buffer,
            PortData::Image(_) => PortDataType::Image,
            PortData::Mesh(_) => PortDataType::Mesh,
        }
    }

    pub fn buffer(values: Vec<f64>) -> Self {
        PortData::Buffer(Arc::new(values))
    }

    /// Extract as scalar. Integers are widened.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            PortData::Scalar(v) => Some(*v),
            PortData::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PortData::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PortData::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            PortData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[f64]> {
        match self {
            PortData::Buffer(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn into_image(self) -> Option<Arc<ImageData>> {
        match self {
            PortData::Image(img) => Some(img),
            _ => None,
        }
    }

    pub fn into_mesh(self) -> Option<Arc<MeshData>> {
        match self {
            PortData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

impl From<f64> for PortData {
    fn from(value: f64) -> Self {
        PortData::Scalar(value)
    }
}

impl From<i64> for PortData {
    fn from(value: i64) -> Self {
        PortData::Integer(value)
    }
}

impl From<bool> for PortData {
    fn from(value: bool) -> Self {
        PortData::Boolean(value)
    }
}

impl From<String> for PortData {
    fn from(value: String) -> Self {
        PortData::String(value)
    }
}

impl From<Vec<f64>> for PortData {
    fn from(value: Vec<f64>) -> Self {
        PortData::buffer(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_matches_variant() {
        assert_eq!(PortData::from(1.5).data_type(), PortDataType::Scalar);
        assert_eq!(PortData::from(vec![1.0]).data_type(), PortDataType::Buffer);
        let img = PortData::Image(Arc::new(ImageData::new(2, 2, 4)));
        assert_eq!(img.data_type(), PortDataType::Image);
    }

    #[test]
    fn test_integer_widens_to_scalar() {
        assert_eq!(PortData::Integer(3).as_scalar(), Some(3.0));
        assert_eq!(PortData::Boolean(true).as_scalar(), None);
    }

    #[test]
    fn test_image_new_allocates_pixels() {
        let img = ImageData::new(4, 3, 4);
        assert_eq!(img.pixels.len(), 48);
    }
}
