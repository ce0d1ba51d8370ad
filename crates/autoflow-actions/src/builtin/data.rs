use futures::future::BoxFuture;

use autoflow_core::error::Result;
use autoflow_core::json_path;
use autoflow_core::traits::Action;
use autoflow_core::types::{ActionContext, ActionOutput, ActionParameters};

use super::required;

// ── JsonGetAction ───────────────────────────────────────────────

pub struct JsonGetAction;

impl Action for JsonGetAction {
    fn name(&self) -> &str {
        "json_get"
    }
    fn description(&self) -> &str {
        "Read a value from 'json' by dot-notation 'path' (e.g. 'items[0].name'), \
         falling back to 'default' when the path is absent."
    }
    fn execute(
        &self,
        params: ActionParameters,
        _ctx: ActionContext,
    ) -> BoxFuture<'_, Result<ActionOutput>> {
        Box::pin(async move {
            let source = required(&params, "json")?;
            let path = required(&params, "path")?;

            // Unparseable input is treated like a missing path
            match json_path::extract(source, path) {
                Some(found) => Ok(ActionOutput::success(found)),
                None => match params.get("default") {
                    Some(d) => Ok(ActionOutput::success(d.clone())),
                    None => Ok(ActionOutput::failure(format!("path not found: {}", path))),
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_core::error::FlowError;
    use autoflow_core::types::RunId;

    fn params(pairs: &[(&str, &str)]) -> ActionParameters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ctx() -> ActionContext {
        ActionContext::new(RunId::new(), "wf", "extract")
    }

    #[tokio::test]
    async fn json_get_returns_unquoted_string() {
        let p = params(&[("json", r#"{"user": {"name": "Ada"}}"#), ("path", "user.name")]);
        let out = JsonGetAction.execute(p, ctx()).await.unwrap();
        assert_eq!(out, ActionOutput::success("Ada"));
    }

    #[tokio::test]
    async fn json_get_falls_back_to_default() {
        let p = params(&[("json", "{}"), ("path", "a.b"), ("default", "none")]);
        let out = JsonGetAction.execute(p, ctx()).await.unwrap();
        assert_eq!(out, ActionOutput::success("none"));
    }

    #[tokio::test]
    async fn json_get_fails_without_default() {
        let p = params(&[("json", "[1,2]"), ("path", "[7]")]);
        let out = JsonGetAction.execute(p, ctx()).await.unwrap();
        assert!(!out.success);
    }

    #[tokio::test]
    async fn json_get_treats_invalid_json_as_missing() {
        let p = params(&[("json", "{not json"), ("path", "a"), ("default", "n/a")]);
        let out = JsonGetAction.execute(p, ctx()).await.unwrap();
        assert_eq!(out, ActionOutput::success("n/a"));

        let p = params(&[("json", "{not json"), ("path", "a")]);
        let out = JsonGetAction.execute(p, ctx()).await.unwrap();
        assert!(!out.success);
    }

    #[tokio::test]
    async fn json_get_requires_path() {
        let p = params(&[("json", "{}")]);
        let err = JsonGetAction.execute(p, ctx()).await.unwrap_err();
        assert!(matches!(err, FlowError::ActionInput(_)));
    }
}
