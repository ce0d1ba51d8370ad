use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;

use autoflow_core::traits::ActionExecutor;
use autoflow_core::types::{ActionContext, ActionOutput, ActionParameters};

/// One invocation seen by [`MockActionExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub action_type: String,
    pub node_id: String,
    pub params: ActionParameters,
}

/// Scripted action executor.
///
/// Only scripted action types are known. Each call is recorded before its
/// optional delay, so a call dropped mid-delay still shows up.
#[derive(Default)]
pub struct MockActionExecutor {
    outputs: HashMap<String, ActionOutput>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `action_type` succeeds with `output`.
    pub fn with_success(mut self, action_type: &str, output: &str) -> Self {
        self.outputs
            .insert(action_type.to_string(), ActionOutput::success(output));
        self
    }

    /// `action_type` fails with `error`.
    pub fn with_failure(mut self, action_type: &str, error: &str) -> Self {
        self.outputs
            .insert(action_type.to_string(), ActionOutput::failure(error));
        self
    }

    /// `action_type` sleeps for `delay` before answering.
    pub fn with_delay(mut self, action_type: &str, delay: Duration) -> Self {
        self.delays.insert(action_type.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// How many times the node `node_id` invoked an action.
    pub fn call_count(&self, node_id: &str) -> usize {
        self.calls().iter().filter(|c| c.node_id == node_id).count()
    }
}

impl ActionExecutor for MockActionExecutor {
    fn knows(&self, action_type: &str) -> bool {
        self.outputs.contains_key(action_type)
    }

    fn execute(
        &self,
        action_type: &str,
        params: ActionParameters,
        ctx: ActionContext,
    ) -> BoxFuture<'_, ActionOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                action_type: action_type.to_string(),
                node_id: ctx.node_id.clone(),
                params,
            });
        }

        let output = self
            .outputs
            .get(action_type)
            .cloned()
            .unwrap_or_else(|| ActionOutput::failure(format!("unscripted action: {}", action_type)));
        let delay = self.delays.get(action_type).copied();

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            output
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_core::types::RunId;

    #[tokio::test]
    async fn test_scripted_outputs_and_calls() {
        let mock = MockActionExecutor::new()
            .with_success("send", "sent")
            .with_failure("charge", "card declined");

        assert!(mock.knows("send"));
        assert!(!mock.knows("teleport"));

        let ctx = ActionContext::new(RunId::new(), "wf", "n1");
        let mut params = ActionParameters::new();
        params.insert("to".into(), "bob".into());
        assert_eq!(
            mock.execute("send", params.clone(), ctx.clone()).await,
            ActionOutput::success("sent")
        );
        assert!(!mock.execute("charge", ActionParameters::new(), ctx).await.success);

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].params, params);
        assert_eq!(mock.call_count("n1"), 2);
    }
}
