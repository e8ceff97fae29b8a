//! Processor-network dataflow evaluation.
//!
//! A [`ProcessorNetwork`] owns processors and the typed port connections between them.
//! Changing a property or a connection invalidates the affected processor and everything
//! downstream of it; [`NetworkEvaluator::evaluate`] then re-runs exactly the invalid,
//! ready processors in topological order.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod network;
pub mod processor;
pub mod util;

use std::fs;

use log::info;

pub use config::EvaluatorConfig;
pub use error::{NetworkError, ProcessorExecutionError, Result};
pub use evaluation::{EvaluationReport, NetworkEvaluator, ProcessContext};
pub use model::data::PortData;
pub use model::port::{PortConnection, PortDataType, PortDefinition, PortId};
pub use model::property::{PropertyDefinition, PropertyMap, PropertyValue};
pub use model::snapshot::NetworkSnapshot;
pub use network::events::NetworkEvent;
pub use network::shared::SharedNetwork;
pub use network::{ProcessorId, ProcessorNetwork, Validity};
pub use processor::{Processor, ProcessorError, ProcessorRegistry};

/// Command-line entry point: `<snapshot.json> [config.json]`.
///
/// Builds the snapshot against the built-in registry, runs one pass and prints the report
/// followed by the validity of every processor.
pub fn run(args: Vec<String>) -> Result<()> {
    let usage = || {
        let program = args.first().map(String::as_str).unwrap_or("dataflow-cli");
        NetworkError::InvalidArgument(format!("usage: {} <snapshot.json> [config.json]", program))
    };
    let snapshot_path = args.get(1).ok_or_else(usage)?;
    if args.len() > 3 {
        return Err(usage());
    }

    let config = match args.get(2) {
        Some(path) => EvaluatorConfig::load(path)?,
        None => EvaluatorConfig::default(),
    };

    let snapshot = NetworkSnapshot::load(&fs::read_to_string(snapshot_path)?)?;
    let registry = ProcessorRegistry::with_builtin_processors();
    let mut network = ProcessorNetwork::from_snapshot(&snapshot, &registry)?;
    info!(
        "Loaded {} processors and {} connections from {}",
        network.len(),
        network.connections().len(),
        snapshot_path
    );

    let evaluator = NetworkEvaluator::new(config)?;
    let report = evaluator.evaluate(&mut network)?;

    println!("{}", report);
    for failure in &report.failed {
        println!("  failed: {}", failure);
    }
    for node in network.nodes() {
        println!(
            "{:<24} {:<22} {:?}",
            node.id().as_str(),
            node.type_id(),
            node.validity()
        );
    }
    Ok(())
}
