use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A node in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Workflow-unique identifier.
    pub id: String,
    /// Display name. Not used for execution.
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Editor layout. Carries no execution semantics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NodePosition>,
}

/// Editor canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f32,
    pub y: f32,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point of a run. Never has incoming edges.
    Trigger {
        #[serde(default = "default_trigger_type")]
        trigger_type: String,
    },
    /// Invokes an action from the executor's registry.
    Execute {
        #[serde(default)]
        action_type: String,
        #[serde(default)]
        parameters: BTreeMap<String, ParameterValue>,
    },
    /// Compares two resolved values.
    Condition {
        left: ParameterValue,
        operator: ConditionOperator,
        right: ParameterValue,
    },
    /// Combines the boolean-like outputs of its predecessors.
    Logic { operator: LogicOperator },
    /// Derives a string from another value, or generates one.
    Extract(ExtractConfig),
}

fn default_trigger_type() -> String {
    "manual".to_string()
}

/// A declared value, resolved at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterValue {
    /// A literal.
    Static { value: String },
    /// The output of another node in the same run.
    NodeReference { node_id: String },
    /// A value from the trigger payload.
    TriggerExtra { key: String },
}

impl ParameterValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Static {
            value: value.into(),
        }
    }

    pub fn node(node_id: impl Into<String>) -> Self {
        Self::NodeReference {
            node_id: node_id.into(),
        }
    }

    pub fn extra(key: impl Into<String>) -> Self {
        Self::TriggerExtra { key: key.into() }
    }
}

/// Comparison applied by a condition node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[serde(alias = "==")]
    Eq,
    #[serde(alias = "!=")]
    Ne,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Gte,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Lte,
    Contains,
    NotContains,
    In,
    NotIn,
    Matches,
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Matches => "matches",
        };
        f.write_str(s)
    }
}

/// Combinator applied by a logic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOperator {
    /// True when there is at least one input and every input is true.
    #[serde(alias = "AND")]
    And,
    /// True when any input is true.
    #[serde(alias = "OR")]
    Or,
}

/// How an extract node produces its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// Capture group `group` of the first match of `expression`.
    #[default]
    Regex,
    /// Dot-notation path `expression` into JSON.
    Json,
    /// `length` characters starting at `start_index`.
    #[serde(alias = "substring")]
    Sub,
    /// The source followed by every value in `others`.
    Concat,
    RandomInt,
    RandomString,
}

/// Settings of an extract node. Which fields matter depends on `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub mode: ExtractMode,
    /// Input text. A blank literal falls back to the first predecessor's output.
    #[serde(default = "empty_source")]
    pub source: ParameterValue,
    /// Regex pattern or JSON path.
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub group: usize,
    /// Output when the regex, JSON or substring lookup finds nothing.
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub start_index: i64,
    /// Negative means "to the end".
    #[serde(default = "to_end")]
    pub length: i64,
    #[serde(default)]
    pub others: Vec<ParameterValue>,
    /// Random modes emit `fixed_value` instead of generating.
    #[serde(default)]
    pub use_fixed: bool,
    #[serde(default)]
    pub fixed_value: String,
    #[serde(default)]
    pub random_min: i64,
    #[serde(default = "default_random_max")]
    pub random_max: i64,
    #[serde(default = "default_random_string_length")]
    pub random_string_length: usize,
    /// Empty means ASCII letters and digits.
    #[serde(default)]
    pub random_string_charset: String,
}

fn empty_source() -> ParameterValue {
    ParameterValue::literal("")
}

fn to_end() -> i64 {
    -1
}

fn default_random_max() -> i64 {
    100
}

fn default_random_string_length() -> usize {
    8
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            mode: ExtractMode::default(),
            source: empty_source(),
            expression: String::new(),
            group: 0,
            default_value: String::new(),
            start_index: 0,
            length: to_end(),
            others: Vec::new(),
            use_fixed: false,
            fixed_value: String::new(),
            random_min: 0,
            random_max: default_random_max(),
            random_string_length: default_random_string_length(),
            random_string_charset: String::new(),
        }
    }
}

impl ExtractConfig {
    pub fn regex(source: ParameterValue, pattern: impl Into<String>, group: usize) -> Self {
        Self {
            mode: ExtractMode::Regex,
            source,
            expression: pattern.into(),
            group,
            ..Self::default()
        }
    }

    pub fn json(source: ParameterValue, path: impl Into<String>) -> Self {
        Self {
            mode: ExtractMode::Json,
            source,
            expression: path.into(),
            ..Self::default()
        }
    }

    pub fn substring(source: ParameterValue, start_index: i64, length: i64) -> Self {
        Self {
            mode: ExtractMode::Sub,
            source,
            start_index,
            length,
            ..Self::default()
        }
    }

    pub fn concat(source: ParameterValue, others: Vec<ParameterValue>) -> Self {
        Self {
            mode: ExtractMode::Concat,
            source,
            others,
            ..Self::default()
        }
    }

    pub fn random_int(min: i64, max: i64) -> Self {
        Self {
            mode: ExtractMode::RandomInt,
            random_min: min,
            random_max: max,
            ..Self::default()
        }
    }

    pub fn random_string(length: usize, charset: impl Into<String>) -> Self {
        Self {
            mode: ExtractMode::RandomString,
            random_string_length: length,
            random_string_charset: charset.into(),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    /// Emit `value` instead of a random one.
    pub fn with_fixed(mut self, value: impl Into<String>) -> Self {
        self.use_fixed = true;
        self.fixed_value = value.into();
        self
    }

    pub fn is_random(&self) -> bool {
        matches!(self.mode, ExtractMode::RandomInt | ExtractMode::RandomString)
    }
}

impl Node {
    /// Create a manual trigger node.
    pub fn trigger(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            id,
            name,
            NodeKind::Trigger {
                trigger_type: default_trigger_type(),
            },
        )
    }

    /// Create an execute node without parameters.
    pub fn execute(
        id: impl Into<String>,
        name: impl Into<String>,
        action_type: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            name,
            NodeKind::Execute {
                action_type: action_type.into(),
                parameters: BTreeMap::new(),
            },
        )
    }

    /// Create a condition node.
    pub fn condition(
        id: impl Into<String>,
        name: impl Into<String>,
        left: ParameterValue,
        operator: ConditionOperator,
        right: ParameterValue,
    ) -> Self {
        Self::new(id, name, NodeKind::Condition { left, operator, right })
    }

    /// Create a logic node.
    pub fn logic(id: impl Into<String>, name: impl Into<String>, operator: LogicOperator) -> Self {
        Self::new(id, name, NodeKind::Logic { operator })
    }

    /// Create an extract node.
    pub fn extract(id: impl Into<String>, name: impl Into<String>, config: ExtractConfig) -> Self {
        Self::new(id, name, NodeKind::Extract(config))
    }

    fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position: None,
        }
    }

    /// Set the trigger type. No-op for non-trigger nodes.
    pub fn with_trigger_type(mut self, ty: impl Into<String>) -> Self {
        if let NodeKind::Trigger { trigger_type } = &mut self.kind {
            *trigger_type = ty.into();
        }
        self
    }

    /// Add a parameter. No-op for non-execute nodes.
    pub fn with_param(mut self, key: impl Into<String>, value: ParameterValue) -> Self {
        if let NodeKind::Execute { parameters, .. } = &mut self.kind {
            parameters.insert(key.into(), value);
        }
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(NodePosition { x, y });
        self
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self.kind, NodeKind::Trigger { .. })
    }

    pub fn is_manual_trigger(&self) -> bool {
        matches!(&self.kind, NodeKind::Trigger { trigger_type } if trigger_type == "manual")
    }

    /// Whether the node needs every incoming edge settled before it runs,
    /// whatever the join mode.
    pub fn joins_all_inputs(&self) -> bool {
        matches!(self.kind, NodeKind::Logic { .. })
    }

    /// Ids of nodes whose output this node reads, deduplicated, in
    /// declaration order.
    pub fn references(&self) -> Vec<&str> {
        let values: Vec<&ParameterValue> = match &self.kind {
            NodeKind::Trigger { .. } | NodeKind::Logic { .. } => vec![],
            NodeKind::Execute { parameters, .. } => parameters.values().collect(),
            NodeKind::Condition { left, right, .. } => vec![left, right],
            NodeKind::Extract(config) if config.is_random() => vec![],
            NodeKind::Extract(config) => std::iter::once(&config.source)
                .chain(config.others.iter())
                .collect(),
        };
        let mut ids: Vec<&str> = Vec::new();
        for value in values {
            if let ParameterValue::NodeReference { node_id } = value {
                if !ids.contains(&node_id.as_str()) {
                    ids.push(node_id);
                }
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_builders() {
        let node = Node::execute("send", "Send message", "echo")
            .with_param("message", ParameterValue::literal("hi"))
            .with_position(1.0, 2.0);

        assert_eq!(node.id, "send");
        assert!(!node.is_trigger());
        assert_eq!(node.position, Some(NodePosition { x: 1.0, y: 2.0 }));
        match &node.kind {
            NodeKind::Execute {
                action_type,
                parameters,
            } => {
                assert_eq!(action_type, "echo");
                assert_eq!(parameters["message"], ParameterValue::literal("hi"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_trigger_type() {
        let manual = Node::trigger("t", "Tap");
        assert!(manual.is_manual_trigger());

        let timer = Node::trigger("t2", "Every hour").with_trigger_type("schedule");
        assert!(timer.is_trigger());
        assert!(!timer.is_manual_trigger());
    }

    #[test]
    fn test_references() {
        let node = Node::condition(
            "c",
            "Check",
            ParameterValue::node("fetch"),
            ConditionOperator::Eq,
            ParameterValue::extra("expected"),
        );
        assert_eq!(node.references(), vec!["fetch"]);
    }

    #[test]
    fn test_extract_references() {
        let node = Node::extract(
            "x",
            "Join",
            ExtractConfig::concat(
                ParameterValue::node("a"),
                vec![ParameterValue::literal("-"), ParameterValue::node("b"), ParameterValue::node("a")],
            ),
        );
        assert_eq!(node.references(), vec!["a", "b"]);

        let random = Node::extract("r", "Dice", ExtractConfig::random_int(1, 6));
        assert!(random.references().is_empty());
        assert!(Node::logic("l", "All", LogicOperator::And).references().is_empty());
    }

    #[test]
    fn test_deserialize_logic_and_extract() {
        let json = r#"{"id": "l", "name": "Both", "type": "logic", "operator": "AND"}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert!(matches!(node.kind, NodeKind::Logic { operator: LogicOperator::And }));
        assert!(node.joins_all_inputs());

        let json = r#"{
            "id": "x",
            "name": "Code",
            "type": "extract",
            "mode": "regex",
            "source": {"type": "node_reference", "node_id": "fetch"},
            "expression": "code=(\\d+)",
            "group": 1
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        match &node.kind {
            NodeKind::Extract(config) => {
                assert_eq!(config.mode, ExtractMode::Regex);
                assert_eq!(config.expression, "code=(\\d+)");
                assert_eq!(config.group, 1);
                assert_eq!(config.length, -1);
                assert_eq!(config.random_max, 100);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert_eq!(node.references(), vec!["fetch"]);
    }

    #[test]
    fn test_deserialize_execute_node() {
        let json = r#"{
            "id": "n1",
            "name": "Lookup",
            "type": "execute",
            "action_type": "json_get",
            "parameters": {
                "json": {"type": "node_reference", "node_id": "fetch"},
                "path": {"type": "static", "value": "user.name"}
            },
            "position": {"x": 10.0, "y": 20.0}
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.references(), vec!["fetch"]);
    }

    #[test]
    fn test_deserialize_condition_operator_alias() {
        let json = r#"{
            "id": "c",
            "name": "Check",
            "type": "condition",
            "left": {"type": "static", "value": "1"},
            "operator": ">=",
            "right": {"type": "static", "value": "0"}
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert!(matches!(
            node.kind,
            NodeKind::Condition {
                operator: ConditionOperator::Gte,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_node_kind_rejected() {
        let json = r#"{"id": "x", "name": "X", "type": "teleport"}"#;
        assert!(serde_json::from_str::<Node>(json).is_err());
    }

    #[test]
    fn test_trigger_type_defaults_to_manual() {
        let json = r#"{"id": "t", "name": "Start", "type": "trigger"}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert!(node.is_manual_trigger());
    }
}
