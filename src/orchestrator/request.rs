use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::ConfigOverrides;

use super::errors::{OrchestratorError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub catalog_id: String,
    pub hostname: String,
    #[serde(default)]
    pub config_overrides: ConfigOverrides,
    pub owner: String,
    #[serde(default)]
    pub delete_on_failure: bool,
}

static HOSTNAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn hostname_regex() -> &'static Regex {
    HOSTNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
            .expect("valid hostname regex")
    })
}

/// RFC 952/1123 label validation: alphanumeric labels, hyphens allowed
/// in the middle, dot-separated, 253 characters overall.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.len() > 253 || !hostname_regex().is_match(hostname) {
        return Err(OrchestratorError::InvalidRequest(format!(
            "hostname '{hostname}' is not a valid RFC 952/1123 label"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_standard_hostname() {
        assert!(validate_hostname("web01").is_ok());
        assert!(validate_hostname("my-app.prox.local").is_ok());
    }

    #[test]
    fn rejects_hostname_with_invalid_characters() {
        assert!(validate_hostname("my_app!.local").is_err());
        assert!(validate_hostname("-leadinghyphen").is_err());
    }
}
