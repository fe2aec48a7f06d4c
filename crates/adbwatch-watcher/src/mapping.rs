//! Prefix-rewrite path mapping
//!
//! Translates device-local content paths into playback paths the
//! downstream consumer understands. Rules are evaluated in configuration
//! order; the first matching prefix wins and the remaining suffix is
//! preserved verbatim.

use crate::config::MappingRule;

/// Apply the first matching rule, or pass the path through unchanged.
///
/// Callers observe "unmapped" as the output being identical to the input;
/// it is an explicit pass-through, not an error.
pub fn map_path(source_path: &str, rules: &[MappingRule]) -> String {
    for rule in rules {
        if let Some(suffix) = source_path.strip_prefix(&rule.source) {
            return format!("{}{}", rule.target, suffix);
        }
    }
    source_path.to_string()
}
