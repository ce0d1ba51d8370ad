use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use autoflow_core::traits::ActionExecutor;
use autoflow_core::types::{ActionContext, ActionParameters, NodeExecutionState};

use crate::compare::compare;
use crate::extract;
use crate::graph::{ExtractConfig, ExtractMode, LogicOperator, Node, NodeKind, ParameterValue};
use crate::resolver::{ParameterResolver, RunContext, StandardResolver};

/// Result of evaluating one node's own logic.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    Success {
        output: String,
        /// Boolean result. Only condition and logic nodes set it.
        branch: Option<bool>,
    },
    Failed {
        error: String,
    },
}

impl NodeOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
            branch: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Outcome of a condition or logic node that evaluated to `result`.
    pub fn from_branch(result: bool) -> Self {
        Self::Success {
            output: result.to_string(),
            branch: Some(result),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn branch(&self) -> Option<bool> {
        match self {
            Self::Success { branch, .. } => *branch,
            Self::Failed { .. } => None,
        }
    }

    pub fn into_state(self) -> NodeExecutionState {
        match self {
            Self::Success { output, .. } => NodeExecutionState::Success { output },
            Self::Failed { error } => NodeExecutionState::Failed { error },
        }
    }
}

/// First phase of evaluating a node.
///
/// Everything but execute nodes settles synchronously. Execute nodes whose
/// parameters resolved hand back the action call for the scheduler to drive.
#[derive(Debug)]
pub enum Evaluation {
    Settled(NodeOutcome),
    Action {
        action_type: String,
        params: ActionParameters,
    },
}

/// Per-kind node logic. Failures are captured in the outcome, never raised.
pub struct OutcomeEvaluator {
    resolver: Arc<dyn ParameterResolver>,
    executor: Arc<dyn ActionExecutor>,
}

impl OutcomeEvaluator {
    pub fn new(executor: Arc<dyn ActionExecutor>) -> Self {
        Self {
            resolver: Arc::new(StandardResolver),
            executor,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ParameterResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Resolve inputs and settle everything that does not need an action call.
    pub fn prepare(&self, node: &Node, ctx: &RunContext<'_>) -> Evaluation {
        match &node.kind {
            NodeKind::Trigger { .. } => match serde_json::to_string(ctx.trigger_extras) {
                Ok(payload) => Evaluation::Settled(NodeOutcome::success(payload)),
                Err(e) => Evaluation::Settled(NodeOutcome::failed(format!(
                    "cannot encode trigger payload: {}",
                    e
                ))),
            },
            NodeKind::Execute {
                action_type,
                parameters,
            } => {
                if action_type.trim().is_empty() {
                    return Evaluation::Settled(NodeOutcome::failed("no action configured"));
                }
                if !self.executor.knows(action_type) {
                    return Evaluation::Settled(NodeOutcome::failed(format!(
                        "action not registered: {}",
                        action_type
                    )));
                }

                let mut params = ActionParameters::new();
                for (key, value) in parameters {
                    match self.resolver.resolve(value, ctx) {
                        Ok(resolved) => {
                            params.insert(key.clone(), resolved);
                        }
                        Err(e) => {
                            return Evaluation::Settled(NodeOutcome::failed(format!(
                                "parameter '{}': {}",
                                key, e
                            )));
                        }
                    }
                }

                Evaluation::Action {
                    action_type: action_type.clone(),
                    params,
                }
            }
            NodeKind::Condition {
                left,
                operator,
                right,
            } => {
                let resolved = self
                    .resolver
                    .resolve(left, ctx)
                    .and_then(|l| self.resolver.resolve(right, ctx).map(|r| (l, r)));
                let (left, right) = match resolved {
                    Ok(pair) => pair,
                    Err(e) => return Evaluation::Settled(NodeOutcome::failed(e.to_string())),
                };

                match compare(&left, *operator, &right) {
                    Ok(result) => {
                        debug!(node_id = %node.id, %left, %operator, %right, result, "Condition evaluated");
                        Evaluation::Settled(NodeOutcome::from_branch(result))
                    }
                    Err(e) => Evaluation::Settled(NodeOutcome::failed(e.to_string())),
                }
            }
            NodeKind::Logic { operator } => {
                let inputs: Vec<bool> = ctx
                    .predecessor_outputs()
                    .filter_map(extract::parse_boolean_like)
                    .collect();
                let result = match operator {
                    LogicOperator::And => !inputs.is_empty() && inputs.iter().all(|b| *b),
                    LogicOperator::Or => inputs.iter().any(|b| *b),
                };
                debug!(node_id = %node.id, ?operator, inputs = inputs.len(), result, "Logic evaluated");
                Evaluation::Settled(NodeOutcome::from_branch(result))
            }
            NodeKind::Extract(config) => match self.extract(config, ctx) {
                Ok(output) => Evaluation::Settled(NodeOutcome::success(output)),
                Err(e) => Evaluation::Settled(NodeOutcome::failed(e)),
            },
        }
    }

    fn extract(&self, config: &ExtractConfig, ctx: &RunContext<'_>) -> Result<String, String> {
        let source = if config.is_random() {
            String::new()
        } else {
            let text = self
                .resolver
                .resolve(&config.source, ctx)
                .map_err(|e| format!("source: {}", e))?;
            match (&config.source, ctx.predecessor_outputs().next()) {
                (ParameterValue::Static { .. }, Some(upstream)) if text.trim().is_empty() => {
                    upstream.to_string()
                }
                _ => text,
            }
        };

        let output = match config.mode {
            ExtractMode::Regex => {
                extract::by_regex(&source, &config.expression, config.group, &config.default_value)
            }
            ExtractMode::Json => {
                extract::by_json_path(&source, &config.expression, &config.default_value)
            }
            ExtractMode::Sub => extract::substring(
                &source,
                config.start_index,
                config.length,
                &config.default_value,
            ),
            ExtractMode::Concat => {
                let mut joined = source;
                for other in &config.others {
                    let part = self
                        .resolver
                        .resolve(other, ctx)
                        .map_err(|e| format!("concat: {}", e))?;
                    joined.push_str(&part);
                }
                joined
            }
            ExtractMode::RandomInt if config.use_fixed => {
                let fixed = config.fixed_value.trim();
                fixed
                    .parse::<i64>()
                    .map_err(|_| format!("fixed value must be an integer: {}", config.fixed_value))?
                    .to_string()
            }
            ExtractMode::RandomInt => {
                extract::random_int(config.random_min, config.random_max).to_string()
            }
            ExtractMode::RandomString if config.use_fixed => config.fixed_value.clone(),
            ExtractMode::RandomString => {
                extract::random_string(config.random_string_length, &config.random_string_charset)
            }
        };
        Ok(output)
    }

    /// Invoke an action. The returned future owns everything it needs.
    pub fn run_action(
        &self,
        action_type: String,
        params: ActionParameters,
        ctx: ActionContext,
    ) -> BoxFuture<'static, NodeOutcome> {
        let executor = Arc::clone(&self.executor);
        Box::pin(async move {
            let out = executor.execute(&action_type, params, ctx).await;
            if out.success {
                NodeOutcome::success(out.output)
            } else {
                NodeOutcome::failed(out.output)
            }
        })
    }
}
