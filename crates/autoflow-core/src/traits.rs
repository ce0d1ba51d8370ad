use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::*;

/// Action: one registrable unit of work an Execute node can invoke.
pub trait Action: Send + Sync + 'static {
    /// Action name (the `action_type` an Execute node refers to).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Execute the action with resolved parameters.
    fn execute(
        &self,
        params: ActionParameters,
        ctx: ActionContext,
    ) -> BoxFuture<'_, Result<ActionOutput>>;

    /// Timeout in seconds for this action. `None` uses the configured default.
    fn timeout_secs(&self) -> Option<u64> {
        None
    }
}

/// Action executor: the engine's only way to cause side effects.
///
/// Implementations must not fail; any error is reported as
/// `ActionOutput { success: false, .. }`.
pub trait ActionExecutor: Send + Sync + 'static {
    /// Whether `action_type` maps to something executable.
    fn knows(&self, action_type: &str) -> bool;

    fn execute(
        &self,
        action_type: &str,
        params: ActionParameters,
        ctx: ActionContext,
    ) -> BoxFuture<'_, ActionOutput>;
}

/// Record sink: persistence for finished runs. The engine never reads records back.
pub trait RecordSink: Send + Sync + 'static {
    fn save(&self, record: &WorkflowExecutionRecord) -> BoxFuture<'_, Result<()>>;
}
