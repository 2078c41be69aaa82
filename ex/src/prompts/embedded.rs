//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Shared system prompt constraining replies to bare JSON
pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");

/// Dependency manifest extraction prompt
pub const ANALYZE: &str = include_str!("../../prompts/analyze.pmt");

/// Provisioning plan prompt
pub const PLAN: &str = include_str!("../../prompts/plan.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "system" => Some(SYSTEM),
        "analyze" => Some(ANALYZE),
        "plan" => Some(PLAN),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
