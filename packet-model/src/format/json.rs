use crate::configuration::Configuration;

/// Format a compiled configuration as JSON.
pub fn format_json(config: &Configuration) -> String {
    serde_json::to_string_pretty(config).unwrap_or_else(|_| "{}".to_string())
}
