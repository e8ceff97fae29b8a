pub mod context;
pub mod engine;
pub mod report;

pub use context::ProcessContext;
pub use engine::NetworkEvaluator;
pub use report::EvaluationReport;
