pub mod control;
pub mod data;

use autoflow_core::error::{FlowError, Result};
use autoflow_core::types::ActionParameters;

/// Fetch a required parameter or fail input validation.
pub(crate) fn required<'a>(params: &'a ActionParameters, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .map(|s| s.as_str())
        .ok_or_else(|| FlowError::ActionInput(format!("missing parameter '{}'", key)))
}
