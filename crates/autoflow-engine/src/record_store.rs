use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use autoflow_core::error::Result;
use autoflow_core::traits::RecordSink;
use autoflow_core::types::WorkflowExecutionRecord;

/// Append-only JSONL store of run records.
///
/// Records for a workflow go to `{dir}/{workflow_id}.jsonl`, one JSON object
/// per line. Lines written before a crash stay intact.
pub struct JsonlRecordStore {
    dir: PathBuf,
}

impl JsonlRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the records of `workflow_id`.
    pub fn path_for(&self, workflow_id: &str) -> PathBuf {
        let safe: String = workflow_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.jsonl", safe))
    }

    /// Read back every record of a workflow, oldest first.
    ///
    /// Distinct ids can share a file after sanitizing, so records are
    /// filtered by their own workflow id.
    pub async fn load(&self, workflow_id: &str) -> Result<Vec<WorkflowExecutionRecord>> {
        let path = self.path_for(workflow_id);
        if !path.exists() {
            return Ok(vec![]);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let mut records = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let record: WorkflowExecutionRecord = serde_json::from_str(line)?;
            if record.workflow_id == workflow_id {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn append(&self, record: &WorkflowExecutionRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(&record.workflow_id);
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut writer = tokio::io::BufWriter::new(file);
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;

        debug!(run_id = %record.run_id, path = %path.display(), "Run record saved");
        Ok(())
    }
}

impl RecordSink for JsonlRecordStore {
    fn save(&self, record: &WorkflowExecutionRecord) -> BoxFuture<'_, Result<()>> {
        let record = record.clone();
        Box::pin(async move { self.append(&record).await })
    }
}
