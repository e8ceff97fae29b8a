mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::*;
use dataflow::processor::builtin::ValueSink;
use dataflow::{
    EvaluatorConfig, NetworkEvaluator, NetworkEvent, PortData, PortDataType, ProcessorNetwork,
    ProcessorRegistry, Validity,
};

fn position(order: &[String], name: &str) -> usize {
    order
        .iter()
        .position(|entry| entry == name)
        .unwrap_or_else(|| panic!("{} was not executed: {:?}", name, order))
}

#[test]
fn test_source_filter_sink_runs_in_order() {
    let log = new_log();
    let mut network = chain(&log);
    let evaluator = NetworkEvaluator::default();

    let report = evaluator.evaluate(&mut network).unwrap();

    assert_eq!(entries(&log), vec!["source", "filter", "sink"]);
    assert_eq!(report.executed, vec![id("source"), id("filter"), id("sink")]);
    assert!(report.is_complete());
    for name in ["source", "filter", "sink"] {
        assert_eq!(network.validity(&id(name)).unwrap(), Validity::Valid);
    }
    // source = 1, filter = 1 + 1
    assert_eq!(
        network.outport_data(&port("filter", "out")),
        Some(&PortData::Scalar(2.0))
    );
}

#[test]
fn test_valid_processors_are_not_executed_again() {
    let log = new_log();
    let mut network = chain(&log);
    let evaluator = NetworkEvaluator::default();

    evaluator.evaluate(&mut network).unwrap();
    let report = evaluator.evaluate(&mut network).unwrap();

    assert!(report.is_empty());
    assert_eq!(entries(&log).len(), 3);
    assert_eq!(network.node(&id("sink")).unwrap().execution_count(), 1);
}

#[test]
fn test_property_change_reruns_only_downstream() {
    let log = new_log();
    let mut network = chain(&log);
    let evaluator = NetworkEvaluator::default();
    evaluator.evaluate(&mut network).unwrap();

    network.set_property(&id("filter"), "value", 10.0).unwrap();
    assert_eq!(network.validity(&id("source")).unwrap(), Validity::Valid);
    assert_invalidation_sound(&network);

    let report = evaluator.evaluate(&mut network).unwrap();
    assert_eq!(report.executed, vec![id("filter"), id("sink")]);
    assert_eq!(
        network.outport_data(&port("filter", "out")),
        Some(&PortData::Scalar(11.0))
    );
    assert_eq!(network.node(&id("source")).unwrap().execution_count(), 1);
}

#[test]
fn test_disconnected_sink_is_not_ready() {
    let log = new_log();
    let mut network = chain(&log);
    let evaluator = NetworkEvaluator::default();
    evaluator.evaluate(&mut network).unwrap();

    network
        .disconnect(&port("filter", "out"), &port("sink", "in"))
        .unwrap();
    assert_eq!(network.validity(&id("sink")).unwrap(), Validity::Invalid);
    assert!(!network.is_ready(&id("sink")).unwrap());

    let report = evaluator.evaluate(&mut network).unwrap();
    assert_eq!(report.skipped, vec![id("sink")]);
    assert!(report.executed.is_empty());
    assert_eq!(network.validity(&id("sink")).unwrap(), Validity::Invalid);
    assert!(!report.is_complete());
}

#[test]
fn test_diamond_respects_dependencies() {
    let log = new_log();
    let mut network = ProcessorNetwork::new();
    add(&mut network, "join", Recorder::join(&log));
    add(&mut network, "right", Recorder::filter(&log));
    add(&mut network, "left", Recorder::filter(&log));
    add(&mut network, "src", Recorder::source(&log));
    link(&mut network, "src", "left");
    link(&mut network, "src", "right");
    link(&mut network, "left", "join");
    link(&mut network, "right", "join");

    NetworkEvaluator::default().evaluate(&mut network).unwrap();

    let order = entries(&log);
    assert_eq!(order.len(), 4);
    assert!(position(&order, "src") < position(&order, "left"));
    assert!(position(&order, "src") < position(&order, "right"));
    assert!(position(&order, "left") < position(&order, "join"));
    assert!(position(&order, "right") < position(&order, "join"));
    // 同順位は追加順
    assert!(position(&order, "right") < position(&order, "left"));

    // src = 1, left = right = 2, join = 1 + 2 + 2
    assert_eq!(
        network.outport_data(&port("join", "out")),
        Some(&PortData::Scalar(5.0))
    );
}

#[test]
fn test_failure_is_isolated_to_its_branch() {
    let log = new_log();
    let broken = Arc::new(AtomicBool::new(true));
    let mut network = ProcessorNetwork::new();
    add(&mut network, "a1", Recorder::source(&log).failing_when(&broken));
    add(&mut network, "a2", Recorder::sink(&log));
    add(&mut network, "b1", Recorder::source(&log));
    add(&mut network, "b2", Recorder::sink(&log));
    link(&mut network, "a1", "a2");
    link(&mut network, "b1", "b2");
    let evaluator = NetworkEvaluator::default();

    let report = evaluator.evaluate(&mut network).unwrap();

    assert_eq!(report.failed_ids(), vec![&id("a1")]);
    assert_eq!(report.failed[0].message(), "boom");
    assert_eq!(report.skipped, vec![id("a2")]);
    assert!(report.was_executed(&id("b1")));
    assert!(report.was_executed(&id("b2")));
    assert_eq!(network.validity(&id("a1")).unwrap(), Validity::Invalid);
    assert_eq!(network.validity(&id("a2")).unwrap(), Validity::Invalid);
    assert!(network.last_error(&id("a1")).unwrap().is_some());
    assert_invalidation_sound(&network);

    // 直れば次のパスで再実行される
    broken.store(false, Ordering::SeqCst);
    let report = evaluator.evaluate(&mut network).unwrap();
    assert_eq!(report.executed, vec![id("a1"), id("a2")]);
    assert!(network.last_error(&id("a1")).unwrap().is_none());
}

#[test]
fn test_failure_is_isolated_to_its_branch_in_parallel() {
    let log = new_log();
    let broken = Arc::new(AtomicBool::new(true));
    let mut network = ProcessorNetwork::new();
    add(&mut network, "a1", Recorder::source(&log).failing_when(&broken));
    add(&mut network, "a2", Recorder::filter(&log));
    add(&mut network, "a3", Recorder::sink(&log));
    add(&mut network, "b1", Recorder::source(&log));
    add(&mut network, "b2", Recorder::filter(&log));
    add(&mut network, "b3", Recorder::sink(&log));
    link(&mut network, "a1", "a2");
    link(&mut network, "a2", "a3");
    link(&mut network, "b1", "b2");
    link(&mut network, "b2", "b3");
    let evaluator = NetworkEvaluator::new(EvaluatorConfig::parallel(2)).unwrap();

    let report = evaluator.evaluate(&mut network).unwrap();

    assert_eq!(report.failed_ids(), vec![&id("a1")]);
    assert_eq!(report.skipped, vec![id("a2"), id("a3")]);
    assert_eq!(report.executed, vec![id("b1"), id("b2"), id("b3")]);
    for name in ["a1", "a2", "a3"] {
        assert_eq!(network.validity(&id(name)).unwrap(), Validity::Invalid);
    }
    for name in ["b1", "b2", "b3"] {
        assert_eq!(network.validity(&id(name)).unwrap(), Validity::Valid);
    }
    assert!(!entries(&log).contains(&"a2".to_string()));
    assert_invalidation_sound(&network);

    broken.store(false, Ordering::SeqCst);
    let report = evaluator.evaluate(&mut network).unwrap();
    assert_eq!(report.executed, vec![id("a1"), id("a2"), id("a3")]);
    assert!(report.is_complete());
}

#[test]
fn test_failure_events() {
    let log = new_log();
    let broken = Arc::new(AtomicBool::new(true));
    let mut network = ProcessorNetwork::new();
    add(&mut network, "source", Recorder::source(&log).failing_when(&broken));
    let events = network.subscribe();

    NetworkEvaluator::default().evaluate(&mut network).unwrap();

    let received: Vec<NetworkEvent> = events.try_iter().collect();
    assert!(received.contains(&NetworkEvent::ProcessorFailed {
        processor_id: id("source"),
        message: "boom".to_string(),
    }));
    assert!(matches!(
        received.last(),
        Some(NetworkEvent::PassCompleted { executed: 0, skipped: 0, failed: 1, .. })
    ));
}

#[test]
fn test_reevaluation_is_deferred_to_next_pass() {
    let log = new_log();
    let mut network = ProcessorNetwork::new();
    add(&mut network, "source", Recorder::source(&log).reevaluating(1));
    add(&mut network, "sink", Recorder::sink(&log));
    link(&mut network, "source", "sink");
    let evaluator = NetworkEvaluator::default();

    let report = evaluator.evaluate(&mut network).unwrap();
    // 同じパス内では一度だけ
    assert_eq!(report.executed, vec![id("source"), id("sink")]);
    assert_eq!(network.validity(&id("source")).unwrap(), Validity::Invalid);
    assert_eq!(network.validity(&id("sink")).unwrap(), Validity::Invalid);

    let report = evaluator.evaluate(&mut network).unwrap();
    assert_eq!(report.executed, vec![id("source"), id("sink")]);
    assert_eq!(network.validity(&id("source")).unwrap(), Validity::Valid);
    assert_eq!(entries(&log), vec!["source", "sink", "source", "sink"]);
}

#[test]
fn test_parallel_components_match_sequential_results() {
    let log = new_log();
    let mut network = ProcessorNetwork::new();
    for branch in ["x", "y", "z"] {
        let src = format!("{}_src", branch);
        let mid = format!("{}_mid", branch);
        let out = format!("{}_sink", branch);
        add(&mut network, &src, Recorder::source(&log));
        add(&mut network, &mid, Recorder::filter(&log));
        add(&mut network, &out, Recorder::sink(&log));
        link(&mut network, &src, &mid);
        link(&mut network, &mid, &out);
    }

    let evaluator = NetworkEvaluator::new(EvaluatorConfig::parallel(3)).unwrap();
    let report = evaluator.evaluate(&mut network).unwrap();

    assert_eq!(report.executed.len(), 9);
    assert!(report.is_complete());
    assert!(network.invalid_processors().is_empty());

    let order = entries(&log);
    for branch in ["x", "y", "z"] {
        let src = position(&order, &format!("{}_src", branch));
        let mid = position(&order, &format!("{}_mid", branch));
        let out = position(&order, &format!("{}_sink", branch));
        assert!(src < mid && mid < out, "branch {} out of order: {:?}", branch, order);
        assert_eq!(
            network.outport_data(&port(&format!("{}_mid", branch), "out")),
            Some(&PortData::Scalar(2.0))
        );
    }
}

#[test]
fn test_builtin_pipeline() {
    let registry = ProcessorRegistry::with_builtin_processors();
    let mut network = ProcessorNetwork::new();
    network
        .add_processor_from_registry(&registry, "source.buffer", id("buffer"))
        .unwrap();
    network
        .add_processor_from_registry(&registry, "filter.scale", id("scale"))
        .unwrap();
    network
        .add_processor_from_registry(&registry, "convert.buffer_stats", id("stats"))
        .unwrap();
    let sink = ValueSink::new(PortDataType::Scalar);
    let handle = sink.handle();
    network
        .add_processor(id("mean"), "Mean", Box::new(sink))
        .unwrap();

    network
        .set_property(&id("buffer"), "values", vec![1.0, 2.0, 3.0])
        .unwrap();
    network.set_property(&id("scale"), "factor", 2.0).unwrap();
    network.connect(port("buffer", "buffer"), port("scale", "buffer")).unwrap();
    network.connect(port("scale", "buffer"), port("stats", "buffer")).unwrap();
    network.connect(port("stats", "mean"), port("mean", "value")).unwrap();

    let evaluator = NetworkEvaluator::default();
    evaluator.evaluate(&mut network).unwrap();
    assert_eq!(handle.latest(), Some(PortData::Scalar(4.0)));
    assert_eq!(
        network.outport_data(&port("stats", "max")),
        Some(&PortData::Scalar(6.0))
    );

    network.set_property(&id("scale"), "factor", 3.0).unwrap();
    let report = evaluator.evaluate(&mut network).unwrap();
    assert!(!report.was_executed(&id("buffer")));
    assert_eq!(handle.latest(), Some(PortData::Scalar(6.0)));
    assert_eq!(handle.received(), 2);
}

#[test]
fn test_buffer_stats_fails_on_empty_buffer() {
    let registry = ProcessorRegistry::with_builtin_processors();
    let mut network = ProcessorNetwork::new();
    network
        .add_processor_from_registry(&registry, "source.buffer", id("buffer"))
        .unwrap();
    network
        .add_processor_from_registry(&registry, "convert.buffer_stats", id("stats"))
        .unwrap();
    network.connect(port("buffer", "buffer"), port("stats", "buffer")).unwrap();

    let report = NetworkEvaluator::default().evaluate(&mut network).unwrap();

    assert!(report.was_executed(&id("buffer")));
    assert_eq!(report.failed_ids(), vec![&id("stats")]);
    assert!(network.outport_data(&port("stats", "mean")).is_none());
}

#[test]
fn test_ramp_source_and_threshold() {
    let registry = ProcessorRegistry::with_builtin_processors();
    let mut network = ProcessorNetwork::new();
    network
        .add_processor_from_registry(&registry, "source.buffer", id("ramp"))
        .unwrap();
    network
        .add_processor_from_registry(&registry, "filter.threshold", id("mask"))
        .unwrap();
    network.set_property(&id("ramp"), "mode", "ramp").unwrap();
    network.set_property(&id("ramp"), "count", 4_i64).unwrap();
    network.set_property(&id("ramp"), "step", 0.25).unwrap();
    network.connect(port("ramp", "buffer"), port("mask", "buffer")).unwrap();

    NetworkEvaluator::default().evaluate(&mut network).unwrap();

    let mask = network.outport_data(&port("mask", "buffer")).unwrap();
    assert_eq!(mask.as_buffer(), Some(&[0.0, 0.0, 1.0, 1.0][..]));
}

#[test]
fn test_scale_factor_inport_overrides_property() {
    let registry = ProcessorRegistry::with_builtin_processors();
    let mut network = ProcessorNetwork::new();
    for (name, type_id) in [
        ("buffer", "source.buffer"),
        ("factor", "source.scalar"),
        ("scale", "filter.scale"),
    ] {
        network
            .add_processor_from_registry(&registry, type_id, id(name))
            .unwrap();
    }
    network.set_property(&id("buffer"), "values", vec![1.0, -2.0]).unwrap();
    network.set_property(&id("factor"), "value", -3.0).unwrap();
    network.set_property(&id("scale"), "factor", 100.0).unwrap();
    network.connect(port("buffer", "buffer"), port("scale", "buffer")).unwrap();
    network.connect(port("factor", "value"), port("scale", "factor")).unwrap();

    NetworkEvaluator::default().evaluate(&mut network).unwrap();

    let scaled = network.outport_data(&port("scale", "buffer")).unwrap();
    assert_eq!(scaled.as_buffer(), Some(&[-3.0, 6.0][..]));
}

#[test]
fn test_sum_of_scalars() {
    let registry = ProcessorRegistry::with_builtin_processors();
    let mut network = ProcessorNetwork::new();
    network
        .add_processor_from_registry(&registry, "math.sum", id("sum"))
        .unwrap();
    for (name, value) in [("a", 1.5), ("b", 2.5), ("c", -1.0)] {
        network
            .add_processor_from_registry(&registry, "source.scalar", id(name))
            .unwrap();
        network.set_property(&id(name), "value", value).unwrap();
        network.connect(port(name, "value"), port("sum", "values")).unwrap();
    }

    NetworkEvaluator::default().evaluate(&mut network).unwrap();

    assert_eq!(
        network.outport_data(&port("sum", "sum")),
        Some(&PortData::Scalar(3.0))
    );
}
