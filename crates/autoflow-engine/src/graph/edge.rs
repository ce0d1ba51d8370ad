use serde::{Deserialize, Deserializer, Serialize};

use crate::evaluator::NodeOutcome;

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    #[serde(alias = "source_node_id")]
    pub source: String,
    /// Target node id.
    #[serde(alias = "target_node_id")]
    pub target: String,
    /// When this edge transmits. Absent or `null` means unconditional.
    #[serde(default, alias = "condition", deserialize_with = "nullable_gate")]
    pub gate: GateCondition,
}

fn nullable_gate<'de, D>(deserializer: D) -> Result<GateCondition, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<GateCondition>::deserialize(deserializer)?.unwrap_or_default())
}

/// Gate restricting when an edge transmits, keyed off the source's outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCondition {
    /// Always transmit.
    #[default]
    #[serde(alias = "always")]
    Unconditional,
    /// Transmit only if the source succeeded.
    #[serde(alias = "success", alias = "ok")]
    OnSuccess,
    /// Transmit only if the source failed.
    #[serde(alias = "error", alias = "failed", alias = "on_failure")]
    OnError,
    /// Transmit only if the source is a condition or logic node that evaluated true.
    #[serde(alias = "true")]
    OnTrue,
    /// Transmit only if the source is a condition or logic node that evaluated false.
    #[serde(alias = "false")]
    OnFalse,
}

impl Edge {
    /// Create an unconditional edge.
    pub fn always(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::gated(source, target, GateCondition::Unconditional)
    }

    /// Create an edge that fires on success.
    pub fn on_success(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::gated(source, target, GateCondition::OnSuccess)
    }

    /// Create an edge that fires on failure.
    pub fn on_error(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::gated(source, target, GateCondition::OnError)
    }

    /// Create an edge that fires when a condition source evaluated true.
    pub fn on_true(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::gated(source, target, GateCondition::OnTrue)
    }

    /// Create an edge that fires when a condition source evaluated false.
    pub fn on_false(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::gated(source, target, GateCondition::OnFalse)
    }

    pub fn gated(
        source: impl Into<String>,
        target: impl Into<String>,
        gate: GateCondition,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            gate,
        }
    }
}

/// Decide whether an edge with `gate` transmits given its source's outcome.
pub fn should_transmit(gate: GateCondition, outcome: &NodeOutcome) -> bool {
    match gate {
        GateCondition::Unconditional => true,
        GateCondition::OnSuccess => outcome.is_success(),
        GateCondition::OnError => !outcome.is_success(),
        GateCondition::OnTrue => outcome.branch() == Some(true),
        GateCondition::OnFalse => outcome.branch() == Some(false),
    }
}
