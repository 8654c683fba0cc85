//! Command runners behind the `reconcile` binary.
//!
//! Each job prints one summary line on stdout and one `warning:` line per
//! recorded error on stderr. Only precondition failures surface as
//! [`CommandError`], which the binary turns into exit status 1.

use std::path::PathBuf;

use chrono::{Local, NaiveDate, Utc};
use reconcile_core::reconcile::{ROUTES_SETTING, record_run};
use reconcile_core::translate::DEFAULT_LOCALE;
use reconcile_core::{
    AssetLinker, Catalog, CsvRowSource, ExternalRow, Job, MaintenanceReconciler, ProjectRoutes,
    ReconciliationResult, RowSource, SettingScope, SettingsStore, SheetTaskSync, SourceError,
    SqliteStore, StoreError, WorkspaceRepository,
};
use reconcile_sheets::GoogleSheetsSource;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

/// Global setting consulted when RECONCILE_LOCALE is unset.
pub const LOCALE_SETTING: &str = "locale";

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("workspace {0} not found")]
    WorkspaceNotFound(i64),
    #[error("could not read spreadsheet {spreadsheet}: {source}")]
    Fetch {
        spreadsheet: String,
        source: SourceError,
        principal: Option<String>,
    },
    #[error("{key} is not set for {scope}")]
    SettingMissing { key: String, scope: String },
    #[error("invalid value for {key}: {reason}")]
    InvalidSetting { key: String, reason: String },
}

impl CommandError {
    /// Remediation advice printed after the error message.
    pub fn hint(&self) -> Option<String> {
        match self {
            CommandError::WorkspaceNotFound(id) => Some(format!(
                "no workspace with id {id} exists in this database; check the id or --db"
            )),
            CommandError::Store(StoreError::NotFound {
                entity: "project", ..
            }) => Some("--project must name a project of the target workspace".to_string()),
            CommandError::Fetch {
                source, principal, ..
            } => match source {
                SourceError::Credentials(_) => Some(match principal {
                    Some(account) => format!(
                        "share the spreadsheet with {account} (view access is enough)"
                    ),
                    None => "set GOOGLE_APPLICATION_CREDENTIALS to a service-account key file or GOOGLE_ACCESS_TOKEN to a bearer token"
                        .to_string(),
                }),
                SourceError::SheetNotFound(_) => {
                    Some("--sheet must match the tab title exactly".to_string())
                }
                SourceError::Http(_) => Some(
                    "check the spreadsheet id and network access, then re-run the command"
                        .to_string(),
                ),
                _ => None,
            },
            CommandError::InvalidSetting { key, .. } if key == ROUTES_SETTING => Some(
                r#"routes are a JSON object of branch to project name, e.g. {"North": "North Store"}"#
                    .to_string(),
            ),
            _ => None,
        }
    }
}

pub fn run(cli: Cli, config: AppConfig) -> Result<(), CommandError> {
    let config = config.with_db_override(cli.db);
    let store = SqliteStore::open(&config.db_path)?;

    match cli.command {
        Commands::GenerateMaintenanceTasks { as_of } => {
            let today = as_of.unwrap_or_else(today);
            generate_maintenance_tasks(&store, &catalog(&config, &store)?, today)
        }
        Commands::SyncAssetsFromInvoices => sync_assets_from_invoices(&store),
        Commands::SyncTasksFromSheet {
            spreadsheet_id,
            workspace_id,
            sheet,
            project,
            user,
            csv_dir,
        } => {
            let request = SheetRequest {
                spreadsheet_id,
                workspace_id,
                sheet,
                project,
                user,
                csv_dir,
            };
            sync_tasks_from_sheet(&store, &config, &request)
        }
        Commands::SetSetting {
            key,
            value,
            workspace,
        } => set_setting(&store, &key, &value, &scope(workspace)),
        Commands::GetSetting { key, workspace } => get_setting(&store, &key, &scope(workspace)),
    }
}

pub fn generate_maintenance_tasks(
    store: &SqliteStore,
    catalog: &Catalog,
    today: NaiveDate,
) -> Result<(), CommandError> {
    info!(%today, "generating maintenance tasks");
    let result = MaintenanceReconciler::new(store, store, store, catalog).run_due(today)?;
    finish(store, Job::MaintenanceTasks, &SettingScope::Global, &result)
}

pub fn sync_assets_from_invoices(store: &SqliteStore) -> Result<(), CommandError> {
    info!("linking invoice items to assets");
    let result = AssetLinker::new(store, store).run_pending()?;
    finish(store, Job::InvoiceAssets, &SettingScope::Global, &result)
}

#[derive(Debug, Clone)]
pub struct SheetRequest {
    pub spreadsheet_id: String,
    pub workspace_id: i64,
    pub sheet: String,
    pub project: Option<i64>,
    pub user: Option<i64>,
    pub csv_dir: Option<PathBuf>,
}

pub fn sync_tasks_from_sheet(
    store: &SqliteStore,
    config: &AppConfig,
    request: &SheetRequest,
) -> Result<(), CommandError> {
    if store.find_workspace(request.workspace_id)?.is_none() {
        return Err(CommandError::WorkspaceNotFound(request.workspace_id));
    }

    let rows = match &request.csv_dir {
        Some(dir) => fetch_rows(&CsvRowSource::new(dir), request, None)?,
        None => {
            let source = GoogleSheetsSource::from_config(&config.sheets)
                .map_err(|source| fetch_error(request, source, None))?;
            fetch_rows(&source, request, source.principal())?
        }
    };
    info!(
        spreadsheet = %request.spreadsheet_id,
        sheet = %request.sheet,
        rows = rows.len(),
        "syncing sheet rows"
    );

    let catalog = catalog(config, store)?;
    let result = SheetTaskSync::new(store, store, store, &catalog, today()).sync_to_project(
        rows,
        request.workspace_id,
        request.project,
        request.user,
    )?;
    finish(
        store,
        Job::SheetTasks,
        &SettingScope::Workspace(request.workspace_id),
        &result,
    )
}

pub fn set_setting(
    store: &SqliteStore,
    key: &str,
    value: &str,
    scope: &SettingScope,
) -> Result<(), CommandError> {
    if key == ROUTES_SETTING {
        ProjectRoutes::from_json(value).map_err(|err| CommandError::InvalidSetting {
            key: key.to_string(),
            reason: err.to_string(),
        })?;
    }
    store.set(key, value, scope)?;
    println!("{key} set for {}", scope.as_key());
    Ok(())
}

pub fn get_setting(store: &SqliteStore, key: &str, scope: &SettingScope) -> Result<(), CommandError> {
    let value = store
        .get(key, scope)?
        .ok_or_else(|| CommandError::SettingMissing {
            key: key.to_string(),
            scope: scope.as_key(),
        })?;
    match serde_json::from_str::<serde_json::Value>(&value) {
        Ok(json) if json.is_object() || json.is_array() => {
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or(value));
        }
        _ => println!("{value}"),
    }
    Ok(())
}

fn finish(
    store: &SqliteStore,
    job: Job,
    scope: &SettingScope,
    result: &ReconciliationResult,
) -> Result<(), CommandError> {
    record_run(store, job, scope, Utc::now(), result)?;
    for error in &result.errors {
        eprintln!("warning: {error}");
    }
    info!(job = job.as_str(), summary = %result.to_cli_summary(), "job finished");
    println!("{}", result.to_cli_summary());
    Ok(())
}

fn fetch_rows(
    source: &dyn RowSource,
    request: &SheetRequest,
    principal: Option<&str>,
) -> Result<Vec<ExternalRow>, CommandError> {
    source
        .fetch(&request.spreadsheet_id, &request.sheet)
        .map_err(|err| fetch_error(request, err, principal))
}

fn fetch_error(request: &SheetRequest, source: SourceError, principal: Option<&str>) -> CommandError {
    CommandError::Fetch {
        spreadsheet: request.spreadsheet_id.clone(),
        source,
        principal: principal.map(str::to_string),
    }
}

fn catalog(config: &AppConfig, settings: &dyn SettingsStore) -> Result<Catalog, CommandError> {
    let locale = match &config.locale {
        Some(locale) => locale.clone(),
        None => settings
            .get(LOCALE_SETTING, &SettingScope::Global)?
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
    };
    Ok(Catalog::builtin(&locale))
}

fn scope(workspace: Option<i64>) -> SettingScope {
    workspace.map_or(SettingScope::Global, SettingScope::Workspace)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
