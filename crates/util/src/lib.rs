pub mod config;

use std::env;

pub use config::{AppConfig, ConfigError, DatabaseDriver, Environment, LogLevel};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DB_NAME: &str = "issue_desk";

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Reads a variable, treating unset and empty values alike.
pub(crate) fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Reads an optional variable, mapping empty values to `None`.
pub(crate) fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn env_or_falls_back_on_empty_values() {
        let _lock = config::tests::ENV_GUARD.lock().expect("env guard poisoned");
        env::set_var("ISSUE_DESK_TEST_EMPTY", "  ");
        assert_eq!(env_or("ISSUE_DESK_TEST_EMPTY", "fallback"), "fallback");
        assert_eq!(env_opt("ISSUE_DESK_TEST_EMPTY"), None);
        env::remove_var("ISSUE_DESK_TEST_EMPTY");
    }

    #[test]
    fn env_opt_trims_values() {
        let _lock = config::tests::ENV_GUARD.lock().expect("env guard poisoned");
        env::set_var("ISSUE_DESK_TEST_TRIM", " http://notify:9000 ");
        assert_eq!(
            env_opt("ISSUE_DESK_TEST_TRIM").as_deref(),
            Some("http://notify:9000")
        );
        env::remove_var("ISSUE_DESK_TEST_TRIM");
    }
}
