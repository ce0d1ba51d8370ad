//! Workflow graph model.
//!
//! A workflow is a directed graph of `Node`s (trigger, execute, condition,
//! logic, extract)
//! connected by gated `Edge`s. `WorkflowGraph` is the validated, immutable
//! arena the scheduler walks; building it is where configuration errors
//! (dangling edges, cycles through edges or references, duplicate ids)
//! surface.

pub mod edge;
pub mod index;
pub mod node;
pub mod workflow;

pub use edge::{should_transmit, Edge, GateCondition};
pub use index::WorkflowGraph;
pub use node::{
    ConditionOperator, ExtractConfig, ExtractMode, LogicOperator, Node, NodeKind, NodePosition,
    ParameterValue,
};
pub use workflow::Workflow;
