use std::collections::{BTreeMap, HashMap};

use autoflow_core::types::NodeExecutionState;

use crate::graph::ParameterValue;

/// Why a declared value could not be turned into a concrete string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    #[error("node '{0}' has not run yet")]
    NotSettled(String),

    #[error("node '{node_id}' failed: {error}")]
    SourceFailed { node_id: String, error: String },

    #[error("node '{0}' was skipped")]
    SourceSkipped(String),

    #[error("trigger value '{0}' not provided")]
    MissingExtra(String),
}

/// Everything a resolver may read while a run is in progress.
pub struct RunContext<'a> {
    pub trigger_extras: &'a BTreeMap<String, String>,
    pub states: &'a HashMap<String, NodeExecutionState>,
    /// Sources of the node's incoming edges, in declaration order.
    pub predecessors: Vec<&'a str>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        trigger_extras: &'a BTreeMap<String, String>,
        states: &'a HashMap<String, NodeExecutionState>,
    ) -> Self {
        Self {
            trigger_extras,
            states,
            predecessors: Vec::new(),
        }
    }

    pub fn with_predecessors(mut self, predecessors: Vec<&'a str>) -> Self {
        self.predecessors = predecessors;
        self
    }

    /// Successful outputs of the predecessors, in order.
    pub fn predecessor_outputs(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.predecessors
            .iter()
            .filter_map(|id| match self.states.get(*id) {
                Some(NodeExecutionState::Success { output }) => Some(output.as_str()),
                _ => None,
            })
    }
}

/// Turns a [`ParameterValue`] into the string a node consumes.
pub trait ParameterResolver: Send + Sync + 'static {
    fn resolve(&self, value: &ParameterValue, ctx: &RunContext<'_>) -> Result<String, ResolutionError>;
}

/// Default resolver: literals as-is, node outputs from settled successes,
/// extras from the trigger payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardResolver;

impl ParameterResolver for StandardResolver {
    fn resolve(&self, value: &ParameterValue, ctx: &RunContext<'_>) -> Result<String, ResolutionError> {
        match value {
            ParameterValue::Static { value } => Ok(value.clone()),
            ParameterValue::NodeReference { node_id } => match ctx.states.get(node_id) {
                Some(NodeExecutionState::Success { output }) => Ok(output.clone()),
                Some(NodeExecutionState::Failed { error }) => Err(ResolutionError::SourceFailed {
                    node_id: node_id.clone(),
                    error: error.clone(),
                }),
                Some(NodeExecutionState::Skipped { .. }) => {
                    Err(ResolutionError::SourceSkipped(node_id.clone()))
                }
                None => Err(ResolutionError::NotSettled(node_id.clone())),
            },
            ParameterValue::TriggerExtra { key } => ctx
                .trigger_extras
                .get(key)
                .cloned()
                .ok_or_else(|| ResolutionError::MissingExtra(key.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_core::types::SkipReason;

    fn states() -> HashMap<String, NodeExecutionState> {
        let mut states = HashMap::new();
        states.insert(
            "ok".to_string(),
            NodeExecutionState::Success {
                output: "42".into(),
            },
        );
        states.insert(
            "bad".to_string(),
            NodeExecutionState::Failed {
                error: "boom".into(),
            },
        );
        states.insert(
            "off".to_string(),
            NodeExecutionState::skipped(SkipReason::GateNotSatisfied),
        );
        states
    }

    #[test]
    fn test_static_and_extra() {
        let mut extras = BTreeMap::new();
        extras.insert("city".to_string(), "Oslo".to_string());
        let states = HashMap::new();
        let ctx = RunContext::new(&extras, &states);

        assert_eq!(
            StandardResolver.resolve(&ParameterValue::literal("x"), &ctx),
            Ok("x".to_string())
        );
        assert_eq!(
            StandardResolver.resolve(&ParameterValue::extra("city"), &ctx),
            Ok("Oslo".to_string())
        );
        assert_eq!(
            StandardResolver.resolve(&ParameterValue::extra("country"), &ctx),
            Err(ResolutionError::MissingExtra("country".into()))
        );
    }

    #[test]
    fn test_node_reference_states() {
        let extras = BTreeMap::new();
        let states = states();
        let ctx = RunContext::new(&extras, &states);

        assert_eq!(
            StandardResolver.resolve(&ParameterValue::node("ok"), &ctx),
            Ok("42".to_string())
        );

        let err = StandardResolver
            .resolve(&ParameterValue::node("bad"), &ctx)
            .unwrap_err();
        assert_eq!(err.to_string(), "node 'bad' failed: boom");

        assert_eq!(
            StandardResolver.resolve(&ParameterValue::node("off"), &ctx),
            Err(ResolutionError::SourceSkipped("off".into()))
        );
        assert_eq!(
            StandardResolver.resolve(&ParameterValue::node("later"), &ctx),
            Err(ResolutionError::NotSettled("later".into()))
        );
    }
}
