//! Operator semantics for condition nodes.

use std::cmp::Ordering;

use regex::Regex;

use crate::graph::ConditionOperator;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompareError {
    #[error("cannot compare numeric and non-numeric values: '{left}' {operator} '{right}'")]
    TypeMismatch {
        left: String,
        operator: ConditionOperator,
        right: String,
    },

    #[error("list mixes numeric and non-numeric items: {0}")]
    MixedList(String),

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Apply `operator` to two resolved values.
pub fn compare(left: &str, operator: ConditionOperator, right: &str) -> Result<bool, CompareError> {
    use ConditionOperator::*;

    match operator {
        Eq | Ne | Gt | Gte | Lt | Lte => {
            let ordering = order(left, operator, right)?;
            Ok(match operator {
                Eq => ordering == Ordering::Equal,
                Ne => ordering != Ordering::Equal,
                Gt => ordering == Ordering::Greater,
                Gte => ordering != Ordering::Less,
                Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            })
        }
        Contains => Ok(left.contains(right)),
        NotContains => Ok(!left.contains(right)),
        In => member_of(left, operator, right),
        NotIn => member_of(left, operator, right).map(|found| !found),
        Matches => {
            let re = Regex::new(right).map_err(|e| CompareError::InvalidPattern {
                pattern: right.to_string(),
                message: e.to_string(),
            })?;
            Ok(re.is_match(left))
        }
    }
}

fn as_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn order(left: &str, operator: ConditionOperator, right: &str) -> Result<Ordering, CompareError> {
    match (as_number(left), as_number(right)) {
        // Finite floats always have a total order
        (Some(l), Some(r)) => Ok(l.partial_cmp(&r).unwrap_or(Ordering::Equal)),
        (None, None) => Ok(left.cmp(right)),
        _ => Err(CompareError::TypeMismatch {
            left: left.to_string(),
            operator,
            right: right.to_string(),
        }),
    }
}

/// Split the right side of `in` / `not_in` into list items.
fn list_items(raw: &str) -> Vec<String> {
    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        return values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn member_of(left: &str, operator: ConditionOperator, right: &str) -> Result<bool, CompareError> {
    let items = list_items(right);
    if items.is_empty() {
        return Ok(false);
    }

    let numeric: Vec<Option<f64>> = items.iter().map(|i| as_number(i)).collect();
    let all_numeric = numeric.iter().all(Option::is_some);
    let none_numeric = numeric.iter().all(Option::is_none);
    if !all_numeric && !none_numeric {
        return Err(CompareError::MixedList(right.to_string()));
    }

    match (as_number(left), all_numeric) {
        (Some(l), true) => Ok(numeric.into_iter().flatten().any(|n| n == l)),
        (None, false) => Ok(items.iter().any(|i| i == left)),
        _ => Err(CompareError::TypeMismatch {
            left: left.to_string(),
            operator,
            right: right.to_string(),
        }),
    }
}
