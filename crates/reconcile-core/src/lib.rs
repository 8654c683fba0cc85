pub mod asset;
pub mod guard;
pub mod persistence;
pub mod reconcile;
pub mod schedule;
pub mod source;
pub mod summary;
pub mod task;
pub mod threshold;
pub mod translate;
pub mod workspace;

pub use asset::{Asset, Invoice, InvoiceItem, NewAsset};
pub use guard::IdempotencyGuard;
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteStore;
pub use persistence::{
    Candidate, InvoiceRepository, RejectedSchedule, ScheduleRepository, SettingScope,
    SettingsStore, StoreError, StoreResult, TaskRepository, WorkspaceRepository,
};
pub use reconcile::{AssetLinker, Job, MaintenanceReconciler, ProjectRoutes, SheetTaskSync};
pub use schedule::{MaintenanceSchedule, ScheduleError};
pub use source::{CsvRowSource, ExternalRow, RowSource, SourceError, SourceResult};
pub use summary::ReconciliationResult;
pub use task::{COMPLETE_PROGRESS, NewTask, Task};
pub use threshold::is_due;
pub use translate::{Catalog, Translator};
pub use workspace::{Equipment, Project, Stage, Workspace};
