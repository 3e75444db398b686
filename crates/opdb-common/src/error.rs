//! Error types shared across OmniPath DB crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while reading the process environment
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Missing environment variable(s): {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },
}

impl CommonError {
    pub fn invalid_env(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidEnv {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Read an optional env var and parse it, reporting unparsable values instead of
/// silently falling back to a default.
pub fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CommonError::invalid_env(key, raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_parse_env_absent_and_blank() {
        std::env::remove_var("OPDB_TEST_PARSE_ENV");
        assert_eq!(parse_env::<u32>("OPDB_TEST_PARSE_ENV").unwrap(), None);

        std::env::set_var("OPDB_TEST_PARSE_ENV", "  ");
        assert_eq!(parse_env::<u32>("OPDB_TEST_PARSE_ENV").unwrap(), None);
        std::env::remove_var("OPDB_TEST_PARSE_ENV");
    }

    #[test]
    #[serial]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("OPDB_TEST_PARSE_ENV", "ten");
        let err = parse_env::<u32>("OPDB_TEST_PARSE_ENV").unwrap_err();
        assert!(err.to_string().contains("OPDB_TEST_PARSE_ENV"));

        std::env::set_var("OPDB_TEST_PARSE_ENV", "10");
        assert_eq!(parse_env::<u32>("OPDB_TEST_PARSE_ENV").unwrap(), Some(10));
        std::env::remove_var("OPDB_TEST_PARSE_ENV");
    }

    #[test]
    fn test_missing_env_message_lists_keys() {
        let err = CommonError::MissingEnv(vec!["DB_HOST".into(), "DB_NAME".into()]);
        assert_eq!(err.to_string(), "Missing environment variable(s): DB_HOST, DB_NAME");
    }
}
