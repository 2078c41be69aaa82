//! pip requirement specifiers from a package name and version constraint

/// Comparison operators that mark a version as already carrying its own
/// constraint. Two-character operators come first so `>=` is not read as `>`.
const OPERATORS: [&str; 7] = ["~=", ">=", "<=", "==", "!=", ">", "<"];

/// Build the argument passed to `pip install`
///
/// - no version (or blank): `name`
/// - version with an operator: `name` + version as given
/// - bare version: `name==version`
pub fn resolve_specifier(name: &str, version: Option<&str>) -> String {
    let name = name.trim();
    match version.map(str::trim).filter(|v| !v.is_empty()) {
        None => name.to_string(),
        Some(version) if has_operator(version) => format!("{}{}", name, version),
        Some(version) => format!("{}=={}", name, version),
    }
}

/// Whether a version string already contains a comparison operator
pub fn has_operator(version: &str) -> bool {
    OPERATORS.iter().any(|op| version.contains(op))
}
