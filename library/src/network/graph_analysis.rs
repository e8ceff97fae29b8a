//! Graph analysis utilities for the processor network.
//!
//! Cycle checks for connection validation, downstream closures for invalidation, and the
//! deterministic processing order used by the evaluator.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use super::ProcessorNetwork;
use super::node::ProcessorId;
use crate::error::{NetworkError, Result};

/// Check if connecting `from_processor` → `to_processor` would create a cycle.
/// Returns true if `to_processor` can already reach `from_processor`.
pub fn would_create_cycle(
    network: &ProcessorNetwork,
    from_processor: &ProcessorId,
    to_processor: &ProcessorId,
) -> bool {
    // BFS from to_processor: if from_processor is reachable, adding from→to closes a loop.
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(to_processor);

    while let Some(current) = queue.pop_front() {
        if current == from_processor {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(node) = network.node(current) {
            queue.extend(node.downstream_ids());
        }
    }
    false
}

/// Every processor reachable through outports of `start`, excluding `start`, in BFS order.
pub fn downstream_closure(network: &ProcessorNetwork, start: &ProcessorId) -> Vec<ProcessorId> {
    let mut visited: HashSet<&ProcessorId> = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let Some(node) = network.node(current) else {
            continue;
        };
        for next in node.downstream_ids() {
            if visited.insert(next) {
                result.push(next.clone());
                queue.push_back(next);
            }
        }
    }
    result
}

/// Topological sort of the whole network.
///
/// Returns processors in dependency order (sources first, sinks last). Among processors
/// with no ordering constraint between them, the one added to the network first comes
/// first, so identical graphs always produce identical orders.
/// A cycle can only appear if the connection invariants were bypassed, so it is reported
/// as a corrupted graph.
pub fn topological_order(network: &ProcessorNetwork) -> Result<Vec<ProcessorId>> {
    let mut in_degree: HashMap<&ProcessorId, usize> = HashMap::new();
    for node in network.nodes() {
        in_degree.entry(node.id()).or_insert(0);
        for next in node.downstream_ids() {
            *in_degree.entry(next).or_insert(0) += 1;
        }
    }

    // Kahn's algorithm with a min-heap on insertion sequence.
    let mut ready: BinaryHeap<Reverse<(u64, &ProcessorId)>> = network
        .nodes()
        .filter(|node| in_degree.get(node.id()) == Some(&0))
        .map(|node| Reverse((node.seq, node.id())))
        .collect();

    let mut sorted = Vec::with_capacity(network.len());

    while let Some(Reverse((_, id))) = ready.pop() {
        sorted.push(id.clone());
        let node = network
            .node(id)
            .ok_or_else(|| NetworkError::corrupted(format!("dangling processor {}", id)))?;
        for next in node.downstream_ids() {
            let deg = in_degree
                .get_mut(next)
                .ok_or_else(|| NetworkError::corrupted(format!("dangling processor {}", next)))?;
            *deg -= 1;
            if *deg == 0 {
                let next_node = network.node(next).ok_or_else(|| {
                    NetworkError::corrupted(format!("connection to removed processor {}", next))
                })?;
                ready.push(Reverse((next_node.seq, next_node.id())));
            }
        }
    }

    if sorted.len() != network.len() {
        return Err(NetworkError::corrupted("cycle detected in processor network"));
    }

    Ok(sorted)
}

/// Weakly connected components, each listed in insertion order. Components are ordered by
/// their earliest-added member.
pub fn connected_components(network: &ProcessorNetwork) -> Vec<Vec<ProcessorId>> {
    let mut visited: HashSet<&ProcessorId> = HashSet::new();
    let mut components = Vec::new();

    for id in network.processor_ids() {
        if !visited.insert(id) {
            continue;
        }
        let mut members = vec![id];
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let Some(node) = network.node(current) else {
                continue;
            };
            for neighbor in node.downstream_ids().chain(node.upstream_ids()) {
                if visited.insert(neighbor) {
                    members.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }

        members.sort_by_key(|member| network.node(member).map(|n| n.seq));
        components.push(members.into_iter().cloned().collect());
    }

    components
}
