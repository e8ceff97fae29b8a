//! Built-in processor types.

mod filters;
mod sinks;
mod sources;

pub use filters::{BufferStats, ScaleFilter, SumProcessor, ThresholdFilter};
pub use sinks::{SinkHandle, ValueSink, sink_type_id};
pub use sources::{BufferSource, ScalarSource};

use super::registry::{ProcessorCategory, ProcessorRegistry, ProcessorTypeDefinition};

fn def(type_id: &str, name: &str, cat: ProcessorCategory, desc: &str) -> ProcessorTypeDefinition {
    ProcessorTypeDefinition::new(type_id, name, cat).with_description(desc)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Register all built-in processor types.
pub(crate) fn register_all(registry: &mut ProcessorRegistry) {
    use ProcessorCategory::*;

    registry.register(
        def(sources::SCALAR_SOURCE, "Scalar Source", Source, "Emits the 'value' property"),
        || Box::new(ScalarSource),
    );
    registry.register(
        def(
            sources::BUFFER_SOURCE,
            "Buffer Source",
            Source,
            "Emits a buffer from the 'values' property or a generated ramp",
        ),
        || Box::new(BufferSource),
    );
    registry.register(
        def(filters::SCALE, "Scale", Filter, "Multiplies every sample by a factor"),
        || Box::new(ScaleFilter),
    );
    registry.register(
        def(filters::THRESHOLD, "Threshold", Filter, "Maps samples to 0 or 1"),
        || Box::new(ThresholdFilter),
    );
    registry.register(
        def(filters::SUM, "Sum", Math, "Adds all connected scalars"),
        || Box::new(SumProcessor),
    );
    registry.register(
        def(
            filters::BUFFER_STATS,
            "Buffer Statistics",
            Conversion,
            "Minimum, maximum and mean of a buffer",
        ),
        || Box::new(BufferStats),
    );
    for kind in sinks::SINK_KINDS {
        let name = format!("{} Sink", capitalize(&kind.to_string()));
        let desc = format!("Keeps the last received {} value", kind);
        registry.register(def(sink_type_id(kind), &name, Sink, &desc), move || {
            Box::new(ValueSink::new(kind))
        });
    }
}
