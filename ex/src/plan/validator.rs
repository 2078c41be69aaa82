//! PlanValidator - structural checks on advisor plans

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::PlanError;
use crate::domain::{ActionKind, ActionSpec, ParamValue, Plan, RawAction};

/// The single installer InstallPackage supports
pub const SUPPORTED_INSTALLER: &str = "pip";

/// Validates raw advisor actions against the action vocabulary
///
/// Purely structural: no execution, no subprocesses, no filesystem access.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanValidator;

impl PlanValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate every action in order, failing on the first problem
    pub fn validate(&self, raw: &[RawAction]) -> Result<Plan, PlanError> {
        debug!(action_count = raw.len(), "PlanValidator::validate: called");
        raw.iter()
            .enumerate()
            .map(|(index, action)| self.validate_one(index, action))
            .collect()
    }

    fn validate_one(&self, index: usize, raw: &RawAction) -> Result<ActionSpec, PlanError> {
        debug!(%index, "PlanValidator::validate_one: called");
        let object = raw.as_object().ok_or_else(|| PlanError::MalformedAction {
            index,
            reason: "action is not a JSON object".to_string(),
        })?;

        let kind = match object.get("type") {
            Some(Value::String(tag)) => ActionKind::from_tag(tag.trim()).ok_or_else(|| PlanError::UnknownActionKind {
                index,
                kind: tag.clone(),
            })?,
            Some(other) => {
                return Err(PlanError::UnknownActionKind {
                    index,
                    kind: other.to_string(),
                });
            }
            None => {
                return Err(PlanError::UnknownActionKind {
                    index,
                    kind: String::new(),
                });
            }
        };

        let params = match object.get("params") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(params)) => convert_params(index, params)?,
            Some(_) => {
                return Err(PlanError::MalformedAction {
                    index,
                    reason: "params is not a JSON object".to_string(),
                });
            }
        };

        let action = ActionSpec { kind, params };
        check_required(index, &action)?;
        debug!(%index, action = %action.summary(), "PlanValidator::validate_one: accepted");
        Ok(action)
    }
}

fn convert_params(
    index: usize,
    params: &serde_json::Map<String, Value>,
) -> Result<BTreeMap<String, ParamValue>, PlanError> {
    let mut converted = BTreeMap::new();
    for (key, value) in params {
        let value = match value {
            Value::Null => continue,
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::String(s) => ParamValue::String(s.clone()),
            // Numbers are rejected: a bare 3.10 would arrive as 3.1
            Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                return Err(PlanError::MalformedAction {
                    index,
                    reason: format!("parameter '{}' must be a string or boolean", key),
                });
            }
        };
        converted.insert(key.clone(), value);
    }
    Ok(converted)
}

/// Required parameters per kind; everything else is defaulted at execution
fn check_required(index: usize, action: &ActionSpec) -> Result<(), PlanError> {
    match action.kind {
        ActionKind::InstallPackage => {
            if action.str_param("name").is_none() {
                return Err(PlanError::MissingParameter {
                    index,
                    kind: action.kind,
                    param: "name",
                });
            }
            if let Some(method) = action.str_param("method") {
                if !method.eq_ignore_ascii_case(SUPPORTED_INSTALLER) {
                    return Err(PlanError::UnsupportedInstaller { index, method });
                }
            }
            Ok(())
        }
        ActionKind::CreateVenv | ActionKind::CreateCondaEnv | ActionKind::CreateDockerfile => Ok(()),
    }
}
