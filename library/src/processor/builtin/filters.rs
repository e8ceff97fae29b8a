use crate::evaluation::context::ProcessContext;
use crate::model::data::PortData;
use crate::model::port::{PortDataType, PortDefinition};
use crate::model::property::PropertyDefinition;
use crate::processor::{Processor, ProcessorError};

pub(super) const SCALE: &str = "filter.scale";
pub(super) const THRESHOLD: &str = "filter.threshold";
pub(super) const SUM: &str = "math.sum";
pub(super) const BUFFER_STATS: &str = "convert.buffer_stats";

/// Buffer × factor. A connected `factor` inport overrides the `factor` property.
pub struct ScaleFilter;

impl Processor for ScaleFilter {
    fn type_id(&self) -> &'static str {
        SCALE
    }

    fn inports(&self) -> Vec<PortDefinition> {
        use PortDataType::*;
        vec![
            PortDefinition::input("buffer", "Buffer", Buffer),
            PortDefinition::optional_input("factor", "Factor", Scalar),
        ]
    }

    fn outports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("buffer", "Buffer", PortDataType::Buffer)]
    }

    fn property_definitions(&self) -> Vec<PropertyDefinition> {
        vec![PropertyDefinition::new("factor", "Factor", 1.0)]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessorError> {
        let factor = match ctx.input("factor") {
            Some(_) => ctx.scalar_input("factor")?,
            None => ctx.properties().get_f64("factor").unwrap_or(1.0),
        };
        let scaled: Vec<f64> = ctx.buffer_input("buffer")?.iter().map(|v| v * factor).collect();
        ctx.set_output("buffer", PortData::buffer(scaled))
    }
}

pub struct ThresholdFilter;

impl Processor for ThresholdFilter {
    fn type_id(&self) -> &'static str {
        THRESHOLD
    }

    fn inports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("buffer", "Buffer", PortDataType::Buffer)]
    }

    fn outports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("buffer", "Buffer", PortDataType::Buffer)]
    }

    fn property_definitions(&self) -> Vec<PropertyDefinition> {
        vec![PropertyDefinition::new("threshold", "Threshold", 0.5)]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessorError> {
        let threshold = ctx.properties().get_f64("threshold").unwrap_or(0.5);
        let mask: Vec<f64> = ctx
            .buffer_input("buffer")?
            .iter()
            .map(|v| if *v >= threshold { 1.0 } else { 0.0 })
            .collect();
        ctx.set_output("buffer", PortData::buffer(mask))
    }
}

pub struct SumProcessor;

impl Processor for SumProcessor {
    fn type_id(&self) -> &'static str {
        SUM
    }

    fn inports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::multi_input("values", "Values", PortDataType::Scalar)]
    }

    fn outports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("sum", "Sum", PortDataType::Scalar)]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessorError> {
        let mut sum = 0.0;
        for value in ctx.inputs("values") {
            sum += value.as_scalar().ok_or_else(|| ProcessorError::UnexpectedInputType {
                port: "values".to_string(),
                expected: PortDataType::Scalar,
                actual: value.data_type(),
            })?;
        }
        ctx.set_output("sum", sum)
    }
}

pub struct BufferStats;

impl Processor for BufferStats {
    fn type_id(&self) -> &'static str {
        BUFFER_STATS
    }

    fn inports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("buffer", "Buffer", PortDataType::Buffer)]
    }

    fn outports(&self) -> Vec<PortDefinition> {
        use PortDataType::*;
        vec![
            PortDefinition::output("min", "Minimum", Scalar),
            PortDefinition::output("max", "Maximum", Scalar),
            PortDefinition::output("mean", "Mean", Scalar),
        ]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessorError> {
        let buffer = ctx.buffer_input("buffer")?;
        if buffer.is_empty() {
            return Err(ProcessorError::failed("cannot compute statistics of an empty buffer"));
        }
        let min = buffer.iter().copied().fold(f64::INFINITY, f64::min);
        let max = buffer.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = buffer.iter().sum::<f64>() / buffer.len() as f64;

        ctx.set_output("min", min)?;
        ctx.set_output("max", max)?;
        ctx.set_output("mean", mean)
    }
}
