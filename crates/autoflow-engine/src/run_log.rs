use chrono::Utc;
use tracing::{debug, error, warn};

use autoflow_core::types::{LogLevel, RunId, WorkflowExecutionLogEntry};

use crate::graph::Node;

/// Ordered log of one run, attached to its record.
///
/// Every entry is mirrored to `tracing` with the run and node as fields.
pub struct RunLog {
    run_id: RunId,
    entries: Vec<WorkflowExecutionLogEntry>,
}

impl RunLog {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            entries: Vec::new(),
        }
    }

    pub fn debug(&mut self, message: impl Into<String>, node: Option<&Node>) {
        self.push(LogLevel::Debug, message.into(), node);
    }

    pub fn warn(&mut self, message: impl Into<String>, node: Option<&Node>) {
        self.push(LogLevel::Warn, message.into(), node);
    }

    pub fn error(&mut self, message: impl Into<String>, node: Option<&Node>) {
        self.push(LogLevel::Error, message.into(), node);
    }

    fn push(&mut self, level: LogLevel, message: String, node: Option<&Node>) {
        let node_id = node.map(|n| n.id.as_str()).unwrap_or("");
        match level {
            LogLevel::Debug => debug!(run_id = %self.run_id, node_id, "{}", message),
            LogLevel::Warn => warn!(run_id = %self.run_id, node_id, "{}", message),
            LogLevel::Error => error!(run_id = %self.run_id, node_id, "{}", message),
        }

        self.entries.push(WorkflowExecutionLogEntry {
            timestamp: Utc::now(),
            level,
            message,
            node_id: node.map(|n| n.id.clone()),
            node_name: node.map(|n| n.name.clone()),
        });
    }

    pub fn entries(&self) -> &[WorkflowExecutionLogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<WorkflowExecutionLogEntry> {
        self.entries
    }
}
