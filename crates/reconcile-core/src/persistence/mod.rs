use crate::{
    Asset, Equipment, Invoice, InvoiceItem, MaintenanceSchedule, NewAsset, NewTask, Project,
    Stage, Task, Workspace,
};
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored schedule row that could not be turned into a valid schedule.
#[derive(Debug, thiserror::Error)]
#[error("schedule {schedule_id}: {source}")]
pub struct RejectedSchedule {
    pub schedule_id: i64,
    pub source: StoreError,
}

/// One row of a candidate query; bad rows are reported without hiding the
/// rest.
pub type Candidate = Result<MaintenanceSchedule, RejectedSchedule>;

pub trait WorkspaceRepository {
    fn find_workspace(&self, id: i64) -> StoreResult<Option<Workspace>>;
    fn find_project(&self, id: i64) -> StoreResult<Option<Project>>;
    fn find_project_by_name(&self, workspace_id: i64, name: &str) -> StoreResult<Option<Project>>;
    /// Stage new tasks are placed in; `None` when the workspace has no workflow.
    fn first_stage(&self, workspace_id: i64) -> StoreResult<Option<Stage>>;
}

pub trait ScheduleRepository {
    /// Schedules whose task due date is on or before `as_of`, one entry per
    /// stored row.
    fn find_due_candidates(&self, as_of: NaiveDate) -> StoreResult<Vec<Candidate>>;
    fn find_equipment(&self, id: i64) -> StoreResult<Option<Equipment>>;
    fn save_schedule(&self, schedule: &MaintenanceSchedule) -> StoreResult<()>;
}

pub trait TaskRepository {
    /// Whether a task generated from this schedule is still below 100%.
    fn has_open_for_schedule(&self, schedule_id: i64) -> StoreResult<bool>;
    /// Most recent completion date among tasks generated from this schedule.
    fn latest_completion_for_schedule(&self, schedule_id: i64) -> StoreResult<Option<NaiveDate>>;
    fn find_by_external_ref(&self, workspace_id: i64, external_ref: &str)
    -> StoreResult<Option<Task>>;
    fn create_task(&self, task: NewTask) -> StoreResult<Task>;
    fn update_task(&self, task: &Task) -> StoreResult<()>;
}

pub trait InvoiceRepository {
    /// Asset-type invoice items with no asset linked, ordered by invoice then
    /// sort order.
    fn unlinked_asset_items(&self) -> StoreResult<Vec<InvoiceItem>>;
    fn find_invoice(&self, id: i64) -> StoreResult<Option<Invoice>>;
    /// Assets recorded against the invoice that no invoice item points at yet,
    /// oldest first.
    fn unclaimed_assets_for_invoice(&self, invoice_id: i64) -> StoreResult<Vec<Asset>>;
    fn create_asset(&self, asset: NewAsset) -> StoreResult<Asset>;
    fn link_item_to_asset(&self, item_id: i64, asset_id: i64) -> StoreResult<()>;
}

/// Key/value settings, each value scoped globally or to one workspace.
pub trait SettingsStore {
    fn get(&self, key: &str, scope: &SettingScope) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str, scope: &SettingScope) -> StoreResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingScope {
    Global,
    Workspace(i64),
}

impl SettingScope {
    pub fn as_key(&self) -> String {
        match self {
            SettingScope::Global => "global".to_string(),
            SettingScope::Workspace(id) => format!("workspace:{id}"),
        }
    }

    pub fn parse(raw: &str) -> StoreResult<Self> {
        let raw = raw.trim();
        if raw == "global" {
            return Ok(SettingScope::Global);
        }
        raw.strip_prefix("workspace:")
            .and_then(|id| id.parse::<i64>().ok())
            .map(SettingScope::Workspace)
            .ok_or_else(|| StoreError::InvalidData(format!("invalid setting scope '{raw}'")))
    }
}

#[cfg(feature = "sqlite")]
pub mod sqlite;
