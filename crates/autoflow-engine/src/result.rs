use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use autoflow_core::types::{NodeExecutionState, RunId, WorkflowExecutionRecord};

/// Outcome of one run: one final state per node, plus the persisted record.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub workflow_id: String,
    /// True unless some node failed. Skipped nodes do not count.
    pub success: bool,
    pub cancelled: bool,
    pub message: String,
    pub node_results: BTreeMap<String, NodeExecutionState>,
    pub record: WorkflowExecutionRecord,
}

impl RunResult {
    pub fn state(&self, node_id: &str) -> Option<&NodeExecutionState> {
        self.node_results.get(node_id)
    }

    /// Ids of failed nodes, sorted.
    pub fn failed_nodes(&self) -> Vec<&str> {
        self.node_results
            .iter()
            .filter(|(_, s)| s.is_failed())
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Overall success flag and summary message for a finished run.
pub fn summarize(states: &HashMap<String, NodeExecutionState>, cancelled: bool) -> (bool, String) {
    let failed = states.values().filter(|s| s.is_failed()).count();
    let success = failed == 0;

    let message = if cancelled {
        "Workflow cancelled".to_string()
    } else if success {
        "Workflow completed successfully".to_string()
    } else {
        format!("{} node(s) failed", failed)
    };

    (success, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoflow_core::types::SkipReason;

    fn states(entries: &[(&str, NodeExecutionState)]) -> HashMap<String, NodeExecutionState> {
        entries
            .iter()
            .map(|(id, s)| (id.to_string(), s.clone()))
            .collect()
    }

    #[test]
    fn test_skipped_does_not_fail_run() {
        let s = states(&[
            ("a", NodeExecutionState::Success { output: "x".into() }),
            ("b", NodeExecutionState::skipped(SkipReason::GateNotSatisfied)),
        ]);
        assert_eq!(
            summarize(&s, false),
            (true, "Workflow completed successfully".to_string())
        );
    }

    #[test]
    fn test_failures_are_counted() {
        let s = states(&[
            ("a", NodeExecutionState::Failed { error: "x".into() }),
            ("b", NodeExecutionState::Failed { error: "y".into() }),
            ("c", NodeExecutionState::Success { output: "z".into() }),
        ]);
        assert_eq!(summarize(&s, false), (false, "2 node(s) failed".to_string()));
    }

    #[test]
    fn test_cancelled_message() {
        let s = states(&[("a", NodeExecutionState::skipped(SkipReason::Cancelled))]);
        assert_eq!(summarize(&s, true), (true, "Workflow cancelled".to_string()));
    }
}
