//! Environment helpers.

use std::sync::OnceLock;

fn env_pattern() -> Option<&'static regex_lite::Regex> {
    static PATTERN: OnceLock<Option<regex_lite::Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| regex_lite::Regex::new(r"\$\{([^}]+)\}").ok())
        .as_ref()
}

/// Expand ${VAR_NAME} patterns with environment variable values.
///
/// Unset variables are left in place so validation can report them.
pub fn expand_env(s: &str) -> String {
    let Some(re) = env_pattern() else {
        return s.to_string();
    };
    let mut result = s.to_string();

    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            if let Ok(value) = std::env::var(var_match.as_str()) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }

    result
}

/// Split a comma separated list, dropping empty entries.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_bool(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
