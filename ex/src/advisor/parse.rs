//! Parsing advisor replies into manifests and raw plans
//!
//! Replies must be a single JSON object. Surrounding whitespace and one
//! enclosing Markdown code fence are tolerated; anything else around the
//! object (explanatory prose, multiple objects) is rejected.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use super::AdvisorError;
use crate::domain::{DependencyManifest, RawAction};

/// Strip one enclosing ```` ``` ```` / ```` ```json ```` fence, if present
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        debug!("strip_code_fence: opening fence without closing fence");
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    match body.find('\n') {
        Some(newline) if body[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            body[newline + 1..].trim()
        }
        Some(_) => body.trim(),
        None => strip_inline_info(body.trim()),
    }
}

/// Single-line fence: `json{...}` keeps only the JSON
fn strip_inline_info(body: &str) -> &str {
    let rest = body.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    if rest.len() < body.len() && rest.trim_start().starts_with(['{', '[']) {
        rest.trim_start()
    } else {
        body
    }
}

/// Parse a reply into a JSON object
pub fn extract_object(text: &str) -> Result<Map<String, Value>, AdvisorError> {
    debug!(text_len = text.len(), "extract_object: called");
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(AdvisorError::Response("empty reply".to_string()));
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| AdvisorError::Response(format!("invalid JSON: {}", e)))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(AdvisorError::Response(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Parse an `analyze` reply into a dependency manifest
pub fn parse_manifest(text: &str) -> Result<DependencyManifest, AdvisorError> {
    debug!("parse_manifest: called");
    let object = extract_object(text)?;

    let python_version = match object.get("python_version") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        // A bare 3.10 parses as the float 3.1
        Some(Value::Number(n)) => {
            return Err(AdvisorError::Response(format!(
                "python_version must be a quoted string, got the number {}",
                n
            )));
        }
        Some(other) => {
            return Err(AdvisorError::Response(format!(
                "python_version must be a non-empty string, got {}",
                json_type_name(other)
            )));
        }
        None => return Err(AdvisorError::Response("missing python_version".to_string())),
    };

    let mut dependencies = BTreeMap::new();
    match object.get("dependencies") {
        None | Some(Value::Null) => {
            debug!("parse_manifest: no dependencies key");
        }
        Some(Value::Object(deps)) => {
            for (name, constraint) in deps {
                let name = name.trim();
                if name.is_empty() {
                    return Err(AdvisorError::Response("dependency with empty package name".to_string()));
                }
                let constraint = match constraint {
                    Value::String(s) => s.trim().to_string(),
                    Value::Null => String::new(),
                    other => {
                        return Err(AdvisorError::Response(format!(
                            "version constraint for '{}' must be a string, got {}",
                            name,
                            json_type_name(other)
                        )));
                    }
                };
                dependencies.insert(name.to_string(), constraint);
            }
        }
        Some(other) => {
            return Err(AdvisorError::Response(format!(
                "dependencies must be an object, got {}",
                json_type_name(other)
            )));
        }
    }

    debug!(%python_version, dependency_count = dependencies.len(), "parse_manifest: parsed");
    Ok(DependencyManifest {
        python_version,
        dependencies,
    })
}

/// Parse a `plan` reply into untyped candidate actions
///
/// A reply without a `steps` key is an empty plan.
pub fn parse_plan(text: &str) -> Result<Vec<RawAction>, AdvisorError> {
    debug!("parse_plan: called");
    let mut object = extract_object(text)?;

    match object.remove("steps") {
        None | Some(Value::Null) => {
            debug!("parse_plan: no steps key, empty plan");
            Ok(Vec::new())
        }
        Some(Value::Array(steps)) => {
            debug!(step_count = steps.len(), "parse_plan: parsed");
            Ok(steps)
        }
        Some(other) => Err(AdvisorError::Response(format!(
            "steps must be an array, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
