//! Workflow execution engine.
//!
//! A [`Workflow`] is validated into a [`WorkflowGraph`], then driven by the
//! [`GraphScheduler`] from its selected triggers. Each node is evaluated at
//! most once; gated edges decide which successors become runnable, and every
//! node ends the run with exactly one [`NodeExecutionState`].
//!
//! [`NodeExecutionState`]: autoflow_core::types::NodeExecutionState

pub mod compare;
pub mod evaluator;
pub mod executor;
pub mod extract;
pub mod graph;
pub mod record_store;
pub mod resolver;
pub mod result;
pub mod run_log;
pub mod scheduler;

pub use evaluator::{NodeOutcome, OutcomeEvaluator};
pub use executor::{RunRequest, WorkflowExecutor};
pub use graph::{
    ConditionOperator, Edge, ExtractConfig, ExtractMode, GateCondition, LogicOperator, Node,
    NodeKind, ParameterValue, Workflow, WorkflowGraph,
};
pub use record_store::JsonlRecordStore;
pub use resolver::{ParameterResolver, ResolutionError, RunContext, StandardResolver};
pub use result::RunResult;
pub use scheduler::GraphScheduler;
