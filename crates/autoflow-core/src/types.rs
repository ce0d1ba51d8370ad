use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique identifier of one workflow run.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved parameters handed to an action, keyed by parameter name.
pub type ActionParameters = BTreeMap<String, String>;

/// What an action reports back. Actions never raise; failure is `success = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    pub success: bool,
    pub output: String,
}

impl ActionOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Listing entry for a registered action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub name: String,
    pub description: String,
}

/// Context passed to actions during execution.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub run_id: RunId,
    pub workflow_id: String,
    pub node_id: String,
    /// Cancelled when the run is cancelled; long actions should observe it.
    pub cancel: CancellationToken,
}

impl ActionContext {
    pub fn new(run_id: RunId, workflow_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            run_id,
            workflow_id: workflow_id.into(),
            node_id: node_id.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Why a node never executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A trigger node that was not selected as an entry for this run.
    TriggerNotSelected,
    /// Every predecessor settled without a transmitting edge.
    GateNotSatisfied,
    /// No path from a selected trigger reaches the node.
    Unreachable,
    /// The run was cancelled before the node settled.
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TriggerNotSelected => "trigger not selected",
            Self::GateNotSatisfied => "gate condition not satisfied",
            Self::Unreachable => "unreachable from trigger",
            Self::Cancelled => "run cancelled",
        };
        f.write_str(s)
    }
}

/// Final status of a node within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeExecutionState {
    Success { output: String },
    Failed { error: String },
    Skipped { reason: SkipReason },
}

impl NodeExecutionState {
    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Short label used in logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// A node lifecycle transition reported to progress sinks.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeProgress {
    Running,
    Settled(NodeExecutionState),
}

/// Severity of a run log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

/// One ordered line of a run's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecutionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
}

/// Summary of a finished run, handed to a [`crate::traits::RecordSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecutionRecord {
    pub run_id: RunId,
    pub workflow_id: String,
    pub workflow_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_node_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub logs: Vec<WorkflowExecutionLogEntry>,
}

/// Run event broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A run started.
    RunStarted { run_id: RunId, workflow_id: String },
    /// A node transitioned.
    NodeProgress {
        run_id: RunId,
        node_id: String,
        progress: NodeProgress,
    },
    /// A run finished (normally or by cancellation).
    RunFinished {
        run_id: RunId,
        success: bool,
        cancelled: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_state_serialization() {
        let state = NodeExecutionState::skipped(SkipReason::GateNotSatisfied);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"state":"skipped","reason":"gate_not_satisfied"}"#);

        let state = NodeExecutionState::Failed {
            error: "boom".into(),
        };
        assert!(serde_json::to_string(&state).unwrap().contains("\"failed\""));
    }

    #[test]
    fn test_log_entry_skips_empty_node_fields() {
        let entry = WorkflowExecutionLogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Warn,
            message: "no manual trigger".into(),
            node_id: None,
            node_name: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"warn\""));
        assert!(!json.contains("node_id"));
        assert!(!json.contains("node_name"));
    }

    #[test]
    fn test_action_output_constructors() {
        assert!(ActionOutput::success("ok").success);
        assert!(!ActionOutput::failure("nope").success);
    }
}
