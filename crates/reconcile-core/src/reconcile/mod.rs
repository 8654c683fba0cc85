pub mod assets;
pub mod maintenance;
pub mod sheet;

pub use assets::AssetLinker;
pub use maintenance::MaintenanceReconciler;
pub use sheet::{ProjectRoutes, SheetTaskSync};

use chrono::{DateTime, Utc};

use crate::ReconciliationResult;
use crate::persistence::{SettingScope, SettingsStore, StoreResult};

/// Settings key holding a workspace's branch-to-project routes (JSON object).
pub const ROUTES_SETTING: &str = "sheet_sync.routes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    MaintenanceTasks,
    InvoiceAssets,
    SheetTasks,
}

impl Job {
    pub fn as_str(&self) -> &'static str {
        match self {
            Job::MaintenanceTasks => "maintenance",
            Job::InvoiceAssets => "asset_sync",
            Job::SheetTasks => "sheet_sync",
        }
    }

    pub fn last_run_key(&self) -> String {
        format!("{}.last_run_at", self.as_str())
    }

    pub fn last_result_key(&self) -> String {
        format!("{}.last_result", self.as_str())
    }
}

/// Stores when a job last ran and what it reported.
pub fn record_run(
    settings: &dyn SettingsStore,
    job: Job,
    scope: &SettingScope,
    ran_at: DateTime<Utc>,
    result: &ReconciliationResult,
) -> StoreResult<()> {
    settings.set(&job.last_run_key(), &ran_at.to_rfc3339(), scope)?;
    settings.set(&job.last_result_key(), &serde_json::to_string(result)?, scope)?;
    Ok(())
}
