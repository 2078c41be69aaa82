//! ActionSpec domain type
//!
//! One typed provisioning instruction produced by the advisor and checked by
//! the plan validator before execution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// The closed set of provisioning actions envx knows how to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Install one Python package with pip
    InstallPackage,
    /// Create a virtual environment with `python -m venv`
    CreateVenv,
    /// Create a named conda environment
    CreateCondaEnv,
    /// Write a Dockerfile and optionally build it
    CreateDockerfile,
}

impl ActionKind {
    /// All recognized kinds, in declaration order
    pub const ALL: [ActionKind; 4] = [
        ActionKind::InstallPackage,
        ActionKind::CreateVenv,
        ActionKind::CreateCondaEnv,
        ActionKind::CreateDockerfile,
    ];

    /// Wire tag used in advisor plans
    pub fn tag(&self) -> &'static str {
        match self {
            Self::InstallPackage => "install_package",
            Self::CreateVenv => "create_venv",
            Self::CreateCondaEnv => "create_conda_env",
            Self::CreateDockerfile => "create_dockerfile",
        }
    }

    /// Parse a wire tag, returning None for anything unrecognized
    pub fn from_tag(tag: &str) -> Option<Self> {
        debug!(%tag, "ActionKind::from_tag: called");
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A single action parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    String(String),
}

impl ParamValue {
    /// String view of the value; booleans render as "true"/"false"
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::String(s) => std::borrow::Cow::Borrowed(s),
            Self::Bool(b) => std::borrow::Cow::Owned(b.to_string()),
        }
    }

    /// Truthiness used for flags like `build`
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One validated provisioning action
///
/// Never mutated after creation; executors only read `params`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl ActionSpec {
    /// Create an action with no parameters
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter insertion
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Non-empty string parameter, if present
    pub fn str_param(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .map(|v| v.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// String parameter or a default
    pub fn str_param_or(&self, key: &str, default: &str) -> String {
        self.str_param(key).unwrap_or_else(|| default.to_string())
    }

    /// Flag parameter; absent means false
    pub fn flag(&self, key: &str) -> bool {
        self.params.get(key).map(ParamValue::is_truthy).unwrap_or(false)
    }

    /// Compact single-line rendering for logs and error messages
    pub fn summary(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}{{{}}}", self.kind, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip_for_all_kinds() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ActionKind::from_tag("run_shell"), None);
        assert_eq!(ActionKind::from_tag("InstallPackage"), None);
    }

    #[test]
    fn test_deserialize_wire_format() {
        let json = r#"{"type": "create_dockerfile", "params": {"python_version": "3.11", "build": true}}"#;
        let action: ActionSpec = serde_json::from_str(json).unwrap();

        assert_eq!(action.kind, ActionKind::CreateDockerfile);
        assert_eq!(action.str_param("python_version").as_deref(), Some("3.11"));
        assert!(action.flag("build"));
    }

    #[test]
    fn test_string_flags() {
        let action = ActionSpec::new(ActionKind::CreateDockerfile)
            .with_param("build", "yes")
            .with_param("push", "no");

        assert!(action.flag("build"));
        assert!(!action.flag("push"));
        assert!(!action.flag("missing"));
    }

    #[test]
    fn test_blank_string_param_is_absent() {
        let action = ActionSpec::new(ActionKind::InstallPackage)
            .with_param("name", "numpy")
            .with_param("version", "  ");

        assert_eq!(action.str_param("version"), None);
        assert_eq!(action.str_param_or("method", "pip"), "pip");
    }

    #[test]
    fn test_summary() {
        let action = ActionSpec::new(ActionKind::InstallPackage)
            .with_param("name", "numpy")
            .with_param("version", ">=1.20");

        assert_eq!(action.summary(), "install_package{name=numpy, version=>=1.20}");
    }
}
