use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

pub const DEFAULT_SHEET: &str = "Sheet1";

/// Reconciliation jobs for maintenance schedules, invoice assets and
/// spreadsheet task imports.
#[derive(Parser, Debug)]
#[command(name = "reconcile", version, about = "Workspace reconciliation jobs")]
pub struct Cli {
    /// SQLite database file. Falls back to RECONCILE_DB_PATH, then reconcile.db.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create tasks for maintenance schedules that have come due.
    #[command(name = "equipment:generate-maintenance-tasks")]
    GenerateMaintenanceTasks {
        /// Evaluate due dates as of this day instead of today (YYYY-MM-DD).
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Link asset-type invoice items to asset records.
    #[command(name = "assets:sync-from-invoices")]
    SyncAssetsFromInvoices,

    /// Import tasks from a Google spreadsheet into a workspace.
    #[command(name = "tasks:sync-from-google-sheet")]
    SyncTasksFromSheet {
        spreadsheet_id: String,
        workspace_id: i64,
        /// Sheet (tab) to read.
        #[arg(long, default_value = DEFAULT_SHEET)]
        sheet: String,
        /// Project for rows whose branch has no route.
        #[arg(long)]
        project: Option<i64>,
        /// User the imported tasks are attributed to.
        #[arg(long)]
        user: Option<i64>,
        /// Read `<DIR>/<spreadsheet_id>/<sheet>.csv` instead of calling the API.
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },

    /// Store a setting value.
    #[command(name = "settings:set")]
    SetSetting {
        key: String,
        value: String,
        /// Scope the value to one workspace instead of globally.
        #[arg(long)]
        workspace: Option<i64>,
    },

    /// Print a setting value.
    #[command(name = "settings:get")]
    GetSetting {
        key: String,
        #[arg(long)]
        workspace: Option<i64>,
    },
}
