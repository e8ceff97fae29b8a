#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dataflow::processor::{Processor, ProcessorError};
use dataflow::{
    PortDataType, PortDefinition, PortId, ProcessContext, ProcessorId, ProcessorNetwork,
    PropertyDefinition,
};

/// Execution log shared between test processors.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn id(s: &str) -> ProcessorId {
    ProcessorId::new(s)
}

pub fn port(processor: &str, name: &str) -> PortId {
    PortId::new(processor, name)
}

#[derive(Clone, Copy)]
enum Shape {
    Source,
    Filter,
    Join,
    Sink,
}

/// Scalar processor that records its id in a log on every `process()` call.
///
/// Sources emit their `value` property; everything else emits the sum of its inputs
/// plus `value`.
pub struct Recorder {
    shape: Shape,
    log: Log,
    fail: Arc<AtomicBool>,
    /// Number of runs that still request re-evaluation.
    reevaluations: Arc<AtomicUsize>,
}

impl Recorder {
    fn new(shape: Shape, log: &Log) -> Self {
        Self {
            shape,
            log: log.clone(),
            fail: Arc::new(AtomicBool::new(false)),
            reevaluations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn source(log: &Log) -> Self {
        Self::new(Shape::Source, log)
    }

    pub fn filter(log: &Log) -> Self {
        Self::new(Shape::Filter, log)
    }

    /// Like `filter` but its inport accepts any number of connections.
    pub fn join(log: &Log) -> Self {
        Self::new(Shape::Join, log)
    }

    pub fn sink(log: &Log) -> Self {
        Self::new(Shape::Sink, log)
    }

    /// Fail every `process()` call while `flag` is set.
    pub fn failing_when(mut self, flag: &Arc<AtomicBool>) -> Self {
        self.fail = flag.clone();
        self
    }

    /// Request re-evaluation on the first `count` runs.
    pub fn reevaluating(self, count: usize) -> Self {
        self.reevaluations.store(count, Ordering::SeqCst);
        self
    }
}

impl Processor for Recorder {
    fn type_id(&self) -> &'static str {
        match self.shape {
            Shape::Source => "test.source",
            Shape::Filter => "test.filter",
            Shape::Join => "test.join",
            Shape::Sink => "test.sink",
        }
    }

    fn inports(&self) -> Vec<PortDefinition> {
        match self.shape {
            Shape::Source => Vec::new(),
            Shape::Join => vec![PortDefinition::multi_input("in", "In", PortDataType::Scalar)],
            Shape::Filter | Shape::Sink => {
                vec![PortDefinition::input("in", "In", PortDataType::Scalar)]
            }
        }
    }

    fn outports(&self) -> Vec<PortDefinition> {
        match self.shape {
            Shape::Sink => Vec::new(),
            _ => vec![PortDefinition::output("out", "Out", PortDataType::Scalar)],
        }
    }

    fn property_definitions(&self) -> Vec<PropertyDefinition> {
        vec![PropertyDefinition::new("value", "Value", 1.0)]
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), ProcessorError> {
        self.log
            .lock()
            .unwrap()
            .push(ctx.processor_id().as_str().to_string());

        if self.fail.load(Ordering::SeqCst) {
            return Err(ProcessorError::failed("boom"));
        }

        let base = ctx.properties().get_f64("value").unwrap_or(0.0);
        let inputs: f64 = ctx.inputs("in").iter().filter_map(|d| d.as_scalar()).sum();

        let remaining = self.reevaluations.load(Ordering::SeqCst);
        if remaining > 0 {
            self.reevaluations.store(remaining - 1, Ordering::SeqCst);
            ctx.request_reevaluation();
        }

        if matches!(self.shape, Shape::Sink) {
            return Ok(());
        }
        ctx.set_output("out", base + inputs)
    }
}

pub fn add(network: &mut ProcessorNetwork, name: &str, processor: Recorder) {
    network
        .add_processor(id(name), name, Box::new(processor))
        .unwrap();
}

pub fn link(network: &mut ProcessorNetwork, from: &str, to: &str) {
    assert!(network.connect(port(from, "out"), port(to, "in")).unwrap());
}

/// source -> filter -> sink
pub fn chain(log: &Log) -> ProcessorNetwork {
    let mut network = ProcessorNetwork::new();
    add(&mut network, "source", Recorder::source(log));
    add(&mut network, "filter", Recorder::filter(log));
    add(&mut network, "sink", Recorder::sink(log));
    link(&mut network, "source", "filter");
    link(&mut network, "filter", "sink");
    network
}

/// Every Invalid processor's downstream neighbours are Invalid too.
pub fn assert_invalidation_sound(network: &ProcessorNetwork) {
    for node in network.nodes() {
        if node.is_valid() {
            continue;
        }
        for downstream in network.downstream_of(node.id()).unwrap() {
            assert!(
                !network.node(&downstream).unwrap().is_valid(),
                "{} is Valid but upstream {} is Invalid",
                downstream,
                node.id()
            );
        }
    }
}
