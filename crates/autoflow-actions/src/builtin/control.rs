use std::time::Duration;

use futures::future::BoxFuture;

use autoflow_core::error::{FlowError, Result};
use autoflow_core::traits::Action;
use autoflow_core::types::{ActionContext, ActionOutput, ActionParameters};

use super::required;

// ── EchoAction ──────────────────────────────────────────────────

pub struct EchoAction;

impl Action for EchoAction {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Return the 'message' parameter as output."
    }
    fn execute(
        &self,
        params: ActionParameters,
        _ctx: ActionContext,
    ) -> BoxFuture<'_, Result<ActionOutput>> {
        Box::pin(async move {
            let message = params.get("message").cloned().unwrap_or_default();
            Ok(ActionOutput::success(message))
        })
    }
}

// ── DelayAction ─────────────────────────────────────────────────

pub struct DelayAction;

/// Upper bound so a typo can't park a run for hours.
const MAX_DELAY_MS: u64 = 10 * 60 * 1000;

impl Action for DelayAction {
    fn name(&self) -> &str {
        "delay"
    }
    fn description(&self) -> &str {
        "Sleep for 'millis' milliseconds. Stops early when the run is cancelled."
    }
    fn timeout_secs(&self) -> Option<u64> {
        Some(MAX_DELAY_MS / 1000 + 5)
    }
    fn execute(
        &self,
        params: ActionParameters,
        ctx: ActionContext,
    ) -> BoxFuture<'_, Result<ActionOutput>> {
        Box::pin(async move {
            let millis: u64 = required(&params, "millis")?
                .trim()
                .parse()
                .map_err(|_| FlowError::ActionInput("'millis' must be a non-negative integer".into()))?;
            let millis = millis.min(MAX_DELAY_MS);

            tokio::select! {
                _ = ctx.cancel.cancelled() => Ok(ActionOutput::failure("delay cancelled")),
                _ = tokio::time::sleep(Duration::from_millis(millis)) => {
                    Ok(ActionOutput::success(millis.to_string()))
                }
            }
        })
    }
}

// ── FailAction ──────────────────────────────────────────────────

pub struct FailAction;

impl Action for FailAction {
    fn name(&self) -> &str {
        "fail"
    }
    fn description(&self) -> &str {
        "Always fail with the 'message' parameter. Useful for exercising error branches."
    }
    fn execute(
        &self,
        params: ActionParameters,
        _ctx: ActionContext,
    ) -> BoxFuture<'_, Result<ActionOutput>> {
        Box::pin(async move {
            let message = params
                .get("message")
                .cloned()
                .unwrap_or_else(|| "failed on purpose".to_string());
            Ok(ActionOutput::failure(message))
        })
    }
}
