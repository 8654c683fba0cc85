use std::env;
use std::path::PathBuf;

use reconcile_sheets::SheetsConfig;

pub const DEFAULT_DB_PATH: &str = "reconcile.db";

/// Runtime settings gathered from the environment (and `.env`, loaded by the
/// binary before this is built).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Explicit locale; when unset the `locale` setting, then English, applies.
    pub locale: Option<String>,
    pub sheets: SheetsConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("RECONCILE_DB_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            locale: env::var("RECONCILE_LOCALE")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            sheets: SheetsConfig::from_env(),
        }
    }

    pub fn with_db_override(mut self, db: Option<PathBuf>) -> Self {
        if let Some(path) = db {
            self.db_path = path;
        }
        self
    }
}
