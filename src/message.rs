//! Title resolution shared by all handlers.

use std::env;

/// Title used when neither configuration nor environment provides one.
pub const DEFAULT_TITLE: &str = "statewatch";

/// Resolves a notification title.
///
/// An explicitly configured title wins, then the handler-specific
/// environment variable `env_var`, then [`DEFAULT_TITLE`].
pub fn get_title(configured: &str, env_var: &str) -> String {
    if !configured.is_empty() {
        return configured.to_string();
    }
    match env::var(env_var) {
        Ok(title) if !title.is_empty() => title,
        _ => DEFAULT_TITLE.to_string(),
    }
}
