use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    // Graph configuration errors
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Edge {source_id} -> {target_id} references unknown node: {missing}")]
    DanglingEdge {
        source_id: String,
        target_id: String,
        missing: String,
    },

    #[error("Edge {source_id} -> {target_id} targets a trigger node")]
    EdgeIntoTrigger { source_id: String, target_id: String },

    #[error("Node {node} references unknown node: {missing}")]
    DanglingReference { node: String, missing: String },

    #[error("Workflow contains a cycle through node: {0}")]
    Cycle(String),

    // Trigger selection errors
    #[error("Workflow has no trigger node")]
    NoTrigger,

    #[error("Trigger node not found: {0}")]
    TriggerNotFound(String),

    #[error("Node is not a trigger: {0}")]
    NotATrigger(String),

    #[error("Workflow has no manual trigger node")]
    NoManualTrigger,

    // Action errors
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    #[error("Action timeout after {timeout_secs}s: {action}")]
    ActionTimeout { action: String, timeout_secs: u64 },

    #[error("Action input validation failed: {0}")]
    ActionInput(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    /// Whether this error describes a malformed workflow rather than a runtime problem.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateNode(_)
                | Self::DanglingEdge { .. }
                | Self::EdgeIntoTrigger { .. }
                | Self::DanglingReference { .. }
                | Self::Cycle(_)
                | Self::NoTrigger
                | Self::TriggerNotFound(_)
                | Self::NotATrigger(_)
                | Self::NoManualTrigger
        )
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
