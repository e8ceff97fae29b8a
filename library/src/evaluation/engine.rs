//! Evaluation engine: drives `process()` calls over the invalid part of a network.

use std::collections::HashMap;
use std::time::Instant;

use log::{debug, error, info, warn};
use rayon::prelude::*;
use uuid::Uuid;

use super::report::EvaluationReport;
use crate::config::EvaluatorConfig;
use crate::error::{NetworkError, ProcessorExecutionError, Result};
use crate::network::node::{self, ProcessorNode};
use crate::network::{NetworkEvent, ProcessorId, ProcessorNetwork, graph_analysis};
use crate::util::timing::ScopedTimer;

/// Runs evaluation passes.
///
/// A pass walks the network in topological order and executes every Invalid processor
/// that is ready, each at most once. Processors that are not ready, or that depend on a
/// processor that failed during the pass, stay Invalid for the next pass. A failure never
/// stops independent branches.
pub struct NetworkEvaluator {
    config: EvaluatorConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Default for NetworkEvaluator {
    fn default() -> Self {
        Self {
            config: EvaluatorConfig::sequential(),
            pool: None,
        }
    }
}

impl NetworkEvaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self> {
        let pool = if config.parallel_components {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_count())
                .thread_name(|i| format!("dataflow-worker-{}", i))
                .build()
                .map_err(|e| NetworkError::InvalidArgument(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Run one evaluation pass over `network`.
    ///
    /// Fails only if the network's structural invariants are broken; processor failures are
    /// reported in the returned [`EvaluationReport`].
    pub fn evaluate(&self, network: &mut ProcessorNetwork) -> Result<EvaluationReport> {
        let pass_id = Uuid::new_v4();
        let start = Instant::now();

        if let Err(err) = network.check_integrity() {
            error!("Aborting evaluation pass {}: {}", pass_id, err);
            return Err(err);
        }

        let mut report = EvaluationReport::new(pass_id);
        let pending = network.invalid_processors();
        if pending.is_empty() {
            debug!("Evaluation pass {}: network is up to date", pass_id);
            return Ok(report);
        }
        debug!(
            "Evaluation pass {}: {} invalid processor(s)",
            pass_id,
            pending.len()
        );

        let order = graph_analysis::topological_order(network)?;
        let outcome = match &self.pool {
            Some(pool) => run_components(pool, network, &order),
            None => {
                let mut nodes: HashMap<ProcessorId, &mut ProcessorNode> = network
                    .nodes_mut()
                    .map(|(id, node)| (id.clone(), node))
                    .collect();
                run_schedule(&mut nodes, &order)
            }
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Aborting evaluation pass {}: {}", pass_id, err);
                return Err(err);
            }
        };

        // Pass boundary: publish results, then apply deferred re-evaluation requests.
        for id in &outcome.invalidated {
            network.emit(NetworkEvent::ProcessorInvalidated(id.clone()));
        }
        for id in &outcome.executed {
            network.emit(NetworkEvent::ProcessorEvaluated(id.clone()));
        }
        for err in &outcome.failed {
            network.emit(NetworkEvent::ProcessorFailed {
                processor_id: err.processor_id.clone(),
                message: err.message(),
            });
        }
        for id in &outcome.reevaluate {
            network.invalidate_from(id);
        }

        report.executed = outcome.executed;
        report.skipped = outcome.skipped;
        report.failed = outcome.failed;
        report.elapsed = start.elapsed();

        network.emit(NetworkEvent::PassCompleted {
            pass_id,
            executed: report.executed.len(),
            skipped: report.skipped.len(),
            failed: report.failed.len(),
        });
        info!("Evaluation {}", report);
        Ok(report)
    }
}

#[derive(Default)]
struct ScheduleOutcome {
    executed: Vec<ProcessorId>,
    skipped: Vec<ProcessorId>,
    failed: Vec<ProcessorExecutionError>,
    /// Processors that asked to run again on the next pass.
    reevaluate: Vec<ProcessorId>,
    /// Processors newly marked Invalid by upstream output changes during the pass.
    invalidated: Vec<ProcessorId>,
}

impl ScheduleOutcome {
    fn merge(&mut self, other: ScheduleOutcome) {
        self.executed.extend(other.executed);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
        self.reevaluate.extend(other.reevaluate);
        self.invalidated.extend(other.invalidated);
    }
}

/// Execute `order` sequentially over `nodes`.
///
/// `nodes` must contain every processor named in `order` and all of their upstream
/// neighbours.
fn run_schedule(
    nodes: &mut HashMap<ProcessorId, &mut ProcessorNode>,
    order: &[ProcessorId],
) -> Result<ScheduleOutcome> {
    let mut outcome = ScheduleOutcome::default();

    for id in order {
        let node = nodes
            .get(id)
            .ok_or_else(|| NetworkError::corrupted(format!("scheduled processor {} is missing", id)))?;
        if node.is_valid() {
            continue;
        }

        let lookup = |peer: &ProcessorId| nodes.get(peer).map(|n| &**n);
        if !node::inputs_ready(node, lookup) {
            debug!("Processor {} is not ready, leaving it pending", id);
            outcome.skipped.push(id.clone());
            continue;
        }
        let inputs = node::gather_inputs(node, lookup);
        let downstream: Vec<ProcessorId> = node.downstream_ids().cloned().collect();

        let node = nodes
            .get_mut(id)
            .ok_or_else(|| NetworkError::corrupted(format!("scheduled processor {} is missing", id)))?;
        let result = {
            let _timer = ScopedTimer::debug_lazy(|| format!("Processing {}", id));
            node.execute(inputs)
        };

        match result {
            Ok(reevaluate) => {
                outcome.executed.push(id.clone());
                if reevaluate {
                    outcome.reevaluate.push(id.clone());
                }
                // New output: consumers later in the order must run in this pass too.
                for next in downstream {
                    if let Some(consumer) = nodes.get_mut(&next) {
                        if consumer.mark_invalid() {
                            outcome.invalidated.push(next);
                        }
                    }
                }
            }
            Err(err) => {
                warn!("{}", err);
                outcome.failed.push(err);
            }
        }
    }

    Ok(outcome)
}

/// Split the network into connected components and run them on `pool`.
///
/// Components share no connections, so each worker has exclusive access to its processors.
/// Results are merged in component order to keep reports deterministic.
fn run_components(
    pool: &rayon::ThreadPool,
    network: &mut ProcessorNetwork,
    order: &[ProcessorId],
) -> Result<ScheduleOutcome> {
    let components = graph_analysis::connected_components(network);
    let mut component_of: HashMap<ProcessorId, usize> = HashMap::new();
    for (index, members) in components.iter().enumerate() {
        for id in members {
            component_of.insert(id.clone(), index);
        }
    }

    let mut orders: Vec<Vec<ProcessorId>> = vec![Vec::new(); components.len()];
    for id in order {
        let index = component_of
            .get(id)
            .ok_or_else(|| NetworkError::corrupted(format!("processor {} has no component", id)))?;
        orders[*index].push(id.clone());
    }

    let mut buckets: Vec<HashMap<ProcessorId, &mut ProcessorNode>> =
        (0..components.len()).map(|_| HashMap::new()).collect();
    for (id, node) in network.nodes_mut() {
        let index = component_of
            .get(id)
            .ok_or_else(|| NetworkError::corrupted(format!("processor {} has no component", id)))?;
        buckets[*index].insert(id.clone(), node);
    }

    debug!(
        "Evaluating {} component(s) on {} worker(s)",
        buckets.len(),
        pool.current_num_threads()
    );

    let results: Vec<Result<ScheduleOutcome>> = pool.install(|| {
        buckets
            .into_par_iter()
            .zip(orders.into_par_iter())
            .map(|(mut bucket, component_order)| run_schedule(&mut bucket, &component_order))
            .collect()
    });

    let mut outcome = ScheduleOutcome::default();
    for result in results {
        outcome.merge(result?);
    }
    Ok(outcome)
}
