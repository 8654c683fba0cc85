use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_base: String,
    /// Service-account key file.
    pub credentials_path: Option<PathBuf>,
    /// Pre-issued bearer token, used instead of the key file when set.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            credentials_path: None,
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SheetsConfig {
    pub fn from_env() -> Self {
        let timeout = parse_timeout(non_empty_var("GOOGLE_SHEETS_TIMEOUT_SECS").as_deref());
        Self {
            api_base: env::var("GOOGLE_SHEETS_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            credentials_path: non_empty_var("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
            access_token: non_empty_var("GOOGLE_ACCESS_TOKEN"),
            timeout,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.access_token.is_some() || self.credentials_path.is_some()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Request timeout from a seconds value. Anything other than a positive whole
/// number of seconds is reported and replaced by the default.
fn parse_timeout(raw: Option<&str>) -> Duration {
    let default = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!(
                value = raw,
                default_secs = DEFAULT_TIMEOUT_SECS,
                "GOOGLE_SHEETS_TIMEOUT_SECS is not a positive number of seconds; using the default"
            );
            default
        }
    }
}
