pub mod data;
pub mod port;
pub mod property;
pub mod snapshot;

pub use data::{ImageData, MeshData, PortData};
pub use port::{PortConnection, PortDataType, PortDefinition, PortDirection, PortId};
pub use property::{Invalidation, PropertyDefinition, PropertyMap, PropertyValue};
pub use snapshot::{NetworkSnapshot, ProcessorSnapshot};
