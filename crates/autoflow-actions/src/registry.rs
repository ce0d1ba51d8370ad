use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use autoflow_core::error::{FlowError, Result};
use autoflow_core::traits::{Action, ActionExecutor};
use autoflow_core::types::{ActionContext, ActionDefinition, ActionOutput, ActionParameters};

/// Registry of available actions.
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
    default_timeout_secs: u64,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            default_timeout_secs: 30,
        }
    }

    /// Timeout used for actions that don't declare one.
    pub fn with_default_timeout(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    /// Register an action.
    pub fn register(&mut self, action: impl Action) {
        let name = action.name().to_string();
        self.actions.insert(name, Arc::new(action));
    }

    /// Unregister an action by name.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.actions.remove(name).is_some()
    }

    /// Get an action by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    /// List registered actions, sorted by name.
    pub fn definitions(&self) -> Vec<ActionDefinition> {
        let mut defs: Vec<ActionDefinition> = self
            .actions
            .values()
            .map(|a| ActionDefinition {
                name: a.name().to_string(),
                description: a.description().to_string(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Run an action by name, surfacing lookup, timeout and action errors.
    pub async fn run(
        &self,
        name: &str,
        params: ActionParameters,
        ctx: ActionContext,
    ) -> Result<ActionOutput> {
        let action = self
            .get(name)
            .ok_or_else(|| FlowError::ActionNotFound(name.to_string()))?;

        let timeout_secs = action.timeout_secs().unwrap_or(self.default_timeout_secs);
        let timeout = Duration::from_secs(timeout_secs);

        match tokio::time::timeout(timeout, action.execute(params, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(FlowError::ActionTimeout {
                action: name.to_string(),
                timeout_secs,
            }),
        }
    }

    /// Create a registry with all built-in actions registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register(crate::builtin::control::EchoAction);
        registry.register(crate::builtin::control::DelayAction);
        registry.register(crate::builtin::control::FailAction);
        registry.register(crate::builtin::data::JsonGetAction);

        registry
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor for ActionRegistry {
    fn knows(&self, action_type: &str) -> bool {
        self.actions.contains_key(action_type)
    }

    fn execute(
        &self,
        action_type: &str,
        params: ActionParameters,
        ctx: ActionContext,
    ) -> BoxFuture<'_, ActionOutput> {
        let action_type = action_type.to_string();
        Box::pin(async move {
            match self.run(&action_type, params, ctx).await {
                Ok(output) => {
                    debug!(action = %action_type, success = output.success, "Action finished");
                    output
                }
                Err(e) => {
                    warn!(action = %action_type, error = %e, "Action errored");
                    ActionOutput::failure(e.to_string())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_core::types::RunId;

    struct SlowAction;

    impl Action for SlowAction {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "sleeps forever"
        }
        fn timeout_secs(&self) -> Option<u64> {
            Some(1)
        }
        fn execute(
            &self,
            _params: ActionParameters,
            _ctx: ActionContext,
        ) -> BoxFuture<'_, Result<ActionOutput>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ActionOutput::success("never"))
            })
        }
    }

    fn ctx() -> ActionContext {
        ActionContext::new(RunId::new(), "wf", "node")
    }

    #[test]
    fn builtins_are_listed() {
        let registry = ActionRegistry::with_builtins();
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["delay", "echo", "fail", "json_get"]);
        assert!(registry.knows("echo"));
        assert!(!registry.knows(""));
    }

    #[test]
    fn unregister_removes_action() {
        let mut registry = ActionRegistry::with_builtins();
        assert!(registry.unregister("fail"));
        assert!(!registry.unregister("fail"));
        assert!(!registry.knows("fail"));
    }

    #[tokio::test]
    async fn unknown_action_reports_failure() {
        let registry = ActionRegistry::with_builtins();
        let out = ActionExecutor::execute(&registry, "launch_rocket", ActionParameters::new(), ctx()).await;
        assert!(!out.success);
        assert!(out.output.contains("launch_rocket"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_failure() {
        let mut registry = ActionRegistry::new();
        registry.register(SlowAction);
        let err = registry.run("slow", ActionParameters::new(), ctx()).await.unwrap_err();
        assert!(matches!(err, FlowError::ActionTimeout { timeout_secs: 1, .. }));

        let out = ActionExecutor::execute(&registry, "slow", ActionParameters::new(), ctx()).await;
        assert!(!out.success);
    }

    #[tokio::test]
    async fn input_error_reports_failure() {
        let registry = ActionRegistry::with_builtins();
        let out = ActionExecutor::execute(&registry, "json_get", ActionParameters::new(), ctx()).await;
        assert!(!out.success);
        assert!(out.output.contains("missing parameter"));
    }
}
