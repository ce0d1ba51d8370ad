use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use autoflow_core::config::EngineConfig;
use autoflow_core::error::Result;
use autoflow_core::event::EventBus;
use autoflow_core::traits::{ActionExecutor, RecordSink};
use autoflow_core::types::{
    NodeExecutionState, NodeProgress, RunEvent, RunId, SkipReason, WorkflowExecutionRecord,
};

use crate::evaluator::OutcomeEvaluator;
use crate::graph::{Node, Workflow, WorkflowGraph};
use crate::resolver::ParameterResolver;
use crate::result::{summarize, RunResult};
use crate::run_log::RunLog;
use crate::scheduler::{GraphScheduler, RunScope};

/// Per-run inputs.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Run exactly this trigger. `None` runs every manual trigger.
    pub trigger_node_id: Option<String>,
    /// Payload readable through `trigger_extra` parameters.
    pub trigger_extras: BTreeMap<String, String>,
    pub cancel: CancellationToken,
}

impl RunRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trigger(mut self, node_id: impl Into<String>) -> Self {
        self.trigger_node_id = Some(node_id.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.trigger_extras.insert(key.into(), value.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Entry point for running workflows.
pub struct WorkflowExecutor {
    evaluator: OutcomeEvaluator,
    config: EngineConfig,
    event_bus: Option<Arc<EventBus>>,
    record_sink: Option<Arc<dyn RecordSink>>,
}

impl WorkflowExecutor {
    pub fn new(executor: Arc<dyn ActionExecutor>) -> Self {
        Self {
            evaluator: OutcomeEvaluator::new(executor),
            config: EngineConfig::default(),
            event_bus: None,
            record_sink: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ParameterResolver>) -> Self {
        self.evaluator = self.evaluator.with_resolver(resolver);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Also publish node transitions as [`RunEvent`]s.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Hand every finished run's record to `sink`.
    pub fn with_record_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.record_sink = Some(sink);
        self
    }

    /// Run every manual trigger with an empty payload.
    pub async fn execute_workflow<F>(&self, workflow: &Workflow, on_progress: F) -> Result<RunResult>
    where
        F: FnMut(&str, &NodeProgress),
    {
        self.execute(workflow, RunRequest::default(), on_progress).await
    }

    /// Run a workflow to completion.
    ///
    /// Graph and trigger-selection errors are returned before any node runs.
    /// Everything that goes wrong afterwards is reported per node in the result.
    pub async fn execute<F>(
        &self,
        workflow: &Workflow,
        request: RunRequest,
        mut on_progress: F,
    ) -> Result<RunResult>
    where
        F: FnMut(&str, &NodeProgress),
    {
        let graph = WorkflowGraph::build(workflow)?;
        let triggers = graph.select_triggers(request.trigger_node_id.as_deref())?;

        let run_id = RunId::new();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            workflow_id = %workflow.id,
            nodes = graph.len(),
            triggers = triggers.len(),
            "Workflow run started"
        );
        self.publish(RunEvent::RunStarted {
            run_id: run_id.clone(),
            workflow_id: workflow.id.clone(),
        });

        let mut log = RunLog::new(run_id.clone());
        log.debug(format!("Starting workflow '{}'", workflow.name), None);

        let mut observe = |node: &Node, progress: &NodeProgress| {
            match progress {
                NodeProgress::Running => log.debug(format!("Running '{}'", node.name), Some(node)),
                NodeProgress::Settled(NodeExecutionState::Success { .. }) => {
                    log.debug("Node succeeded", Some(node))
                }
                NodeProgress::Settled(NodeExecutionState::Failed { error }) => {
                    log.error(format!("Node failed: {}", error), Some(node))
                }
                NodeProgress::Settled(NodeExecutionState::Skipped { reason }) => {
                    let message = format!("Node skipped: {}", reason);
                    if *reason == SkipReason::Cancelled {
                        log.warn(message, Some(node))
                    } else {
                        log.debug(message, Some(node))
                    }
                }
            }
            self.publish(RunEvent::NodeProgress {
                run_id: run_id.clone(),
                node_id: node.id.clone(),
                progress: progress.clone(),
            });
            on_progress(&node.id, progress);
        };

        let scope = RunScope {
            run_id: &run_id,
            trigger_extras: &request.trigger_extras,
            cancel: &request.cancel,
        };
        let outcome = GraphScheduler::new(
            &graph,
            self.config.join_mode,
            self.config.max_parallel_nodes,
        )
        .run(&self.evaluator, &triggers, scope, &mut observe)
        .await;

        let (success, message) = summarize(&outcome.states, outcome.cancelled);
        if outcome.cancelled {
            log.warn(message.clone(), None);
        } else if success {
            log.debug(message.clone(), None);
        } else {
            log.error(message.clone(), None);
        }

        let trigger_node_id = request.trigger_node_id.clone().or_else(|| match triggers.as_slice() {
            [only] => Some(graph.node_at(*only).id.clone()),
            _ => None,
        });

        let record = WorkflowExecutionRecord {
            run_id: run_id.clone(),
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            trigger_node_id,
            started_at,
            finished_at: Utc::now(),
            success,
            message: message.clone(),
            logs: log.into_entries(),
        };

        if let Some(sink) = &self.record_sink {
            if let Err(e) = sink.save(&record).await {
                warn!(run_id = %run_id, error = %e, "Failed to save run record");
            }
        }

        info!(
            run_id = %run_id,
            success,
            cancelled = outcome.cancelled,
            "Workflow run finished"
        );
        self.publish(RunEvent::RunFinished {
            run_id: run_id.clone(),
            success,
            cancelled: outcome.cancelled,
        });

        Ok(RunResult {
            run_id,
            workflow_id: workflow.id.clone(),
            success,
            cancelled: outcome.cancelled,
            message,
            node_results: outcome.states.into_iter().collect(),
            record,
        })
    }

    fn publish(&self, event: RunEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use super::*;
    use crate::graph::{Edge, ParameterValue};
    use autoflow_core::error::FlowError;
    use autoflow_core::event::collect_run;
    use autoflow_core::types::{ActionContext, ActionOutput, ActionParameters};

    /// Echoes `message`; action "bad" always fails.
    struct Echo;

    impl ActionExecutor for Echo {
        fn knows(&self, action_type: &str) -> bool {
            matches!(action_type, "echo" | "bad")
        }

        fn execute(
            &self,
            action_type: &str,
            params: ActionParameters,
            _ctx: ActionContext,
        ) -> BoxFuture<'_, ActionOutput> {
            let out = if action_type == "bad" {
                ActionOutput::failure("bad things")
            } else {
                ActionOutput::success(params.get("message").cloned().unwrap_or_default())
            };
            Box::pin(async move { out })
        }
    }

    #[derive(Default)]
    struct Collect {
        records: Mutex<Vec<WorkflowExecutionRecord>>,
    }

    impl RecordSink for Collect {
        fn save(&self, record: &WorkflowExecutionRecord) -> BoxFuture<'_, Result<()>> {
            self.records.lock().unwrap().push(record.clone());
            Box::pin(async { Ok(()) })
        }
    }

    fn greeting() -> Workflow {
        Workflow::new("wf", "Greeting")
            .with_node(Node::trigger("t", "Start"))
            .with_node(
                Node::execute("hello", "Hello", "echo")
                    .with_param("message", ParameterValue::extra("name")),
            )
            .with_node(
                Node::execute("again", "Again", "echo")
                    .with_param("message", ParameterValue::node("hello")),
            )
            .with_edge(Edge::always("t", "hello"))
            .with_edge(Edge::on_success("hello", "again"))
    }

    #[tokio::test]
    async fn test_outputs_flow_between_nodes() {
        let executor = WorkflowExecutor::new(Arc::new(Echo));
        let request = RunRequest::new().with_extra("name", "Ada");
        let result = executor.execute(&greeting(), request, |_, _| {}).await.unwrap();

        assert!(result.success);
        assert!(!result.cancelled);
        assert_eq!(
            result.state("again"),
            Some(&NodeExecutionState::Success {
                output: "Ada".into()
            })
        );
        assert_eq!(result.record.trigger_node_id.as_deref(), Some("t"));
        assert!(result.failed_nodes().is_empty());
    }

    #[tokio::test]
    async fn test_configuration_error_fires_no_progress() {
        let wf = greeting().with_edge(Edge::always("again", "ghost"));
        let executor = WorkflowExecutor::new(Arc::new(Echo));

        let mut calls = 0;
        let err = executor
            .execute_workflow(&wf, |_, _| calls += 1)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::DanglingEdge { .. }));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_record_reaches_sink_and_matches_result() {
        let sink = Arc::new(Collect::default());
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let executor = WorkflowExecutor::new(Arc::new(Echo))
            .with_record_sink(sink.clone())
            .with_event_bus(bus);

        let wf = greeting()
            .with_node(Node::execute("oops", "Oops", "bad"))
            .with_edge(Edge::always("t", "oops"));
        let result = executor
            .execute(&wf, RunRequest::new().with_extra("name", "Bo"), |_, _| {})
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.message, "1 node(s) failed");
        assert_eq!(result.failed_nodes(), vec!["oops"]);

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].success, result.success);
        assert!(records[0]
            .logs
            .iter()
            .any(|e| e.node_id.as_deref() == Some("oops") && e.message.contains("bad things")));

        drop(records);

        let events = collect_run(&mut rx, &result.run_id).await.unwrap();
        assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(RunEvent::RunFinished { success: false, cancelled: false, .. })
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            RunEvent::NodeProgress { node_id, progress: NodeProgress::Settled(_), .. } if node_id == "oops"
        )));
    }

    #[tokio::test]
    async fn test_missing_manual_trigger() {
        let wf = Workflow::new("wf", "Timer")
            .with_node(Node::trigger("timer", "Hourly").with_trigger_type("schedule"));
        let executor = WorkflowExecutor::new(Arc::new(Echo));

        let err = executor.execute_workflow(&wf, |_, _| {}).await.unwrap_err();
        assert!(matches!(err, FlowError::NoManualTrigger));

        let result = executor
            .execute(&wf, RunRequest::new().with_trigger("timer"), |_, _| {})
            .await
            .unwrap();
        assert!(result.success);
    }
}
