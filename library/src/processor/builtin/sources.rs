use crate::evaluation::context::ProcessContext;
use crate::model::data::PortData;
use crate::model::port::{PortDataType, PortDefinition};
use crate::model::property::{PropertyDefinition, PropertyValue};
use crate::processor::{Processor, ProcessorError};

pub(super) const SCALAR_SOURCE: &str = "source.scalar";
pub(super) const BUFFER_SOURCE: &str = "source.buffer";

pub struct ScalarSource;

impl Processor for ScalarSource {
    fn type_id(&self) -> &'static str {
        SCALAR_SOURCE
    }

    fn inports(&self) -> Vec<PortDefinition> {
        Vec::new()
    }

    fn outports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("value", "Value", PortDataType::Scalar)]
    }

    fn property_definitions(&self) -> Vec<PropertyDefinition> {
        vec![PropertyDefinition::new("value", "Value", 0.0)]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessorError> {
        let value = ctx
            .properties()
            .get_f64("value")
            .ok_or_else(|| ProcessorError::invalid_property("value", "expected a number"))?;
        ctx.set_output("value", value)
    }
}

/// Emits the `values` property, or with `mode = "ramp"`, `count` samples starting at `start`
/// spaced by `step`.
pub struct BufferSource;

impl BufferSource {
    fn ramp(ctx: &ProcessContext<'_>) -> Result<Vec<f64>, ProcessorError> {
        let props = ctx.properties();
        let count = props
            .get_i64("count")
            .filter(|c| *c >= 0)
            .ok_or_else(|| ProcessorError::invalid_property("count", "expected a non-negative integer"))?;
        let start = props.get_f64("start").unwrap_or(0.0);
        let step = props.get_f64("step").unwrap_or(1.0);
        Ok((0..count).map(|i| start + step * i as f64).collect())
    }
}

impl Processor for BufferSource {
    fn type_id(&self) -> &'static str {
        BUFFER_SOURCE
    }

    fn inports(&self) -> Vec<PortDefinition> {
        Vec::new()
    }

    fn outports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("buffer", "Buffer", PortDataType::Buffer)]
    }

    fn property_definitions(&self) -> Vec<PropertyDefinition> {
        vec![
            PropertyDefinition::new("mode", "Mode", "values"),
            PropertyDefinition::new("values", "Values", PropertyValue::Array(Vec::new())),
            PropertyDefinition::new("count", "Count", 16_i64),
            PropertyDefinition::new("start", "Start", 0.0),
            PropertyDefinition::new("step", "Step", 1.0),
        ]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessorError> {
        let mode = ctx
            .properties()
            .get_string("mode")
            .unwrap_or_else(|| "values".to_string());
        let values = match mode.as_str() {
            "values" => ctx
                .properties()
                .get_array_f64("values")
                .ok_or_else(|| ProcessorError::invalid_property("values", "expected an array of numbers"))?,
            "ramp" => Self::ramp(ctx)?,
            other => {
                return Err(ProcessorError::invalid_property(
                    "mode",
                    format!("unknown mode '{}'", other),
                ));
            }
        };
        ctx.set_output("buffer", PortData::buffer(values))
    }
}
