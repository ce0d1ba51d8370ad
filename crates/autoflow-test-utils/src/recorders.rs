use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use autoflow_core::error::Result;
use autoflow_core::traits::RecordSink;
use autoflow_core::types::{NodeProgress, WorkflowExecutionRecord};

/// Keeps every saved record in memory.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<WorkflowExecutionRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<WorkflowExecutionRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl RecordSink for RecordingSink {
    fn save(&self, record: &WorkflowExecutionRecord) -> BoxFuture<'_, Result<()>> {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        Box::pin(async { Ok(()) })
    }
}

/// Collects progress callbacks in arrival order.
#[derive(Clone, Default)]
pub struct ProgressRecorder {
    events: Arc<Mutex<Vec<(String, NodeProgress)>>>,
}

impl ProgressRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A progress callback feeding this recorder.
    pub fn callback(&self) -> impl FnMut(&str, &NodeProgress) + 'static {
        let events = Arc::clone(&self.events);
        move |node_id: &str, progress: &NodeProgress| {
            if let Ok(mut events) = events.lock() {
                events.push((node_id.to_string(), progress.clone()));
            }
        }
    }

    pub fn events(&self) -> Vec<(String, NodeProgress)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Transitions reported for one node.
    pub fn for_node(&self, node_id: &str) -> Vec<NodeProgress> {
        self.events()
            .into_iter()
            .filter(|(id, _)| id == node_id)
            .map(|(_, p)| p)
            .collect()
    }

    /// Index of the first event matching `node_id` and `pred`.
    pub fn position(&self, node_id: &str, pred: impl Fn(&NodeProgress) -> bool) -> Option<usize> {
        self.events()
            .iter()
            .position(|(id, p)| id == node_id && pred(p))
    }
}
