use super::{
    Candidate, InvoiceRepository, RejectedSchedule, ScheduleRepository, SettingScope,
    SettingsStore, StoreError, StoreResult, TaskRepository, WorkspaceRepository,
};
use crate::{
    Asset, Equipment, Invoice, InvoiceItem, MaintenanceSchedule, NewAsset, NewTask, Project,
    Stage, Task, Workspace,
};
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed implementation of every repository the reconcilers use.
pub struct SqliteStore {
    connection: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS workspaces (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                owner_id INTEGER
            );
            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY,
                workspace_id INTEGER NOT NULL REFERENCES workspaces(id),
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS stages (
                id INTEGER PRIMARY KEY,
                workspace_id INTEGER NOT NULL REFERENCES workspaces(id),
                name TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS equipment (
                id INTEGER PRIMARY KEY,
                workspace_id INTEGER NOT NULL REFERENCES workspaces(id),
                name TEXT NOT NULL,
                project_id INTEGER REFERENCES projects(id),
                created_by INTEGER
            );
            CREATE TABLE IF NOT EXISTS maintenance_schedules (
                id INTEGER PRIMARY KEY,
                equipment_id INTEGER NOT NULL REFERENCES equipment(id),
                title TEXT NOT NULL,
                interval_days INTEGER NOT NULL,
                advance_days INTEGER NOT NULL DEFAULT 0,
                last_service_date TEXT,
                next_service_date TEXT,
                task_due_date TEXT
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                workspace_id INTEGER NOT NULL REFERENCES workspaces(id),
                project_id INTEGER NOT NULL REFERENCES projects(id),
                stage_id INTEGER NOT NULL REFERENCES stages(id),
                title TEXT NOT NULL,
                description TEXT,
                progress INTEGER NOT NULL DEFAULT 0,
                start_date TEXT,
                due_date TEXT,
                completed_on TEXT,
                maintenance_schedule_id INTEGER REFERENCES maintenance_schedules(id),
                external_ref TEXT,
                created_by INTEGER
            );
            CREATE INDEX IF NOT EXISTS tasks_schedule_idx ON tasks (maintenance_schedule_id);
            CREATE INDEX IF NOT EXISTS tasks_external_ref_idx ON tasks (workspace_id, external_ref);
            CREATE TABLE IF NOT EXISTS invoices (
                id INTEGER PRIMARY KEY,
                workspace_id INTEGER NOT NULL REFERENCES workspaces(id),
                number TEXT NOT NULL,
                issued_on TEXT NOT NULL,
                created_by INTEGER
            );
            CREATE TABLE IF NOT EXISTS assets (
                id INTEGER PRIMARY KEY,
                workspace_id INTEGER NOT NULL REFERENCES workspaces(id),
                invoice_id INTEGER REFERENCES invoices(id),
                name TEXT NOT NULL,
                purchased_on TEXT NOT NULL,
                purchase_cost REAL NOT NULL DEFAULT 0,
                created_by INTEGER
            );
            CREATE TABLE IF NOT EXISTS invoice_items (
                id INTEGER PRIMARY KEY,
                invoice_id INTEGER NOT NULL REFERENCES invoices(id),
                item_type TEXT NOT NULL,
                description TEXT NOT NULL,
                unit_price REAL NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                asset_id INTEGER REFERENCES assets(id)
            );
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT NOT NULL,
                scope TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (key, scope)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    pub fn insert_workspace(&self, name: &str, owner_id: Option<i64>) -> StoreResult<Workspace> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO workspaces (name, owner_id) VALUES (?1, ?2)",
            params![name, owner_id],
        )?;
        Ok(Workspace {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            owner_id,
        })
    }

    pub fn insert_project(&self, workspace_id: i64, name: &str) -> StoreResult<Project> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO projects (workspace_id, name) VALUES (?1, ?2)",
            params![workspace_id, name],
        )?;
        Ok(Project {
            id: conn.last_insert_rowid(),
            workspace_id,
            name: name.to_string(),
        })
    }

    pub fn insert_stage(&self, workspace_id: i64, name: &str, position: i64) -> StoreResult<Stage> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO stages (workspace_id, name, position) VALUES (?1, ?2, ?3)",
            params![workspace_id, name, position],
        )?;
        Ok(Stage {
            id: conn.last_insert_rowid(),
            workspace_id,
            name: name.to_string(),
            position,
        })
    }

    pub fn insert_equipment(
        &self,
        workspace_id: i64,
        name: &str,
        project_id: Option<i64>,
        created_by: Option<i64>,
    ) -> StoreResult<Equipment> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO equipment (workspace_id, name, project_id, created_by) VALUES (?1, ?2, ?3, ?4)",
            params![workspace_id, name, project_id, created_by],
        )?;
        Ok(Equipment {
            id: conn.last_insert_rowid(),
            workspace_id,
            name: name.to_string(),
            project_id,
            created_by,
        })
    }

    /// Stores a new schedule; the `id` of the argument is ignored.
    pub fn insert_schedule(&self, schedule: &MaintenanceSchedule) -> StoreResult<MaintenanceSchedule> {
        schedule
            .validate()
            .map_err(|err| StoreError::InvalidData(err.to_string()))?;
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO maintenance_schedules
                (equipment_id, title, interval_days, advance_days, last_service_date, next_service_date, task_due_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                schedule.equipment_id,
                schedule.title,
                schedule.interval_days,
                schedule.advance_days,
                format_date(schedule.last_service_date()),
                format_date(schedule.next_service_date()),
                format_date(schedule.task_due_date()),
            ],
        )?;
        let mut stored = schedule.clone();
        stored.id = conn.last_insert_rowid();
        Ok(stored)
    }

    pub fn find_schedule(&self, id: i64) -> StoreResult<Option<MaintenanceSchedule>> {
        let conn = self.connection.lock();
        let raw = conn
            .query_row(
                &format!("{SCHEDULE_SELECT} WHERE id = ?1"),
                params![id],
                RawSchedule::from_row,
            )
            .optional()?;
        raw.map(|raw| {
            raw.into_schedule()
                .map_err(|rejected| StoreError::InvalidData(rejected.to_string()))
        })
        .transpose()
    }

    pub fn insert_invoice(
        &self,
        workspace_id: i64,
        number: &str,
        issued_on: NaiveDate,
        created_by: Option<i64>,
    ) -> StoreResult<Invoice> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO invoices (workspace_id, number, issued_on, created_by) VALUES (?1, ?2, ?3, ?4)",
            params![workspace_id, number, format_date(Some(issued_on)), created_by],
        )?;
        Ok(Invoice {
            id: conn.last_insert_rowid(),
            workspace_id,
            number: number.to_string(),
            issued_on,
            created_by,
        })
    }

    pub fn insert_invoice_item(
        &self,
        invoice_id: i64,
        item_type: &str,
        description: &str,
        unit_price: f64,
        sort_order: i64,
    ) -> StoreResult<InvoiceItem> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO invoice_items (invoice_id, item_type, description, unit_price, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![invoice_id, item_type, description, unit_price, sort_order],
        )?;
        Ok(InvoiceItem {
            id: conn.last_insert_rowid(),
            invoice_id,
            item_type: item_type.to_string(),
            description: description.to_string(),
            unit_price,
            sort_order,
            asset_id: None,
        })
    }

    pub fn invoice_items(&self, invoice_id: i64) -> StoreResult<Vec<InvoiceItem>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!(
            "{ITEM_SELECT} WHERE invoice_id = ?1 ORDER BY sort_order ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![invoice_id], item_from_row)?;
        let items = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn assets_for_invoice(&self, invoice_id: i64) -> StoreResult<Vec<Asset>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!(
            "{ASSET_SELECT} WHERE invoice_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![invoice_id], RawAsset::from_row)?;
        let records = rows
            .map(|raw| raw.map_err(StoreError::from).and_then(|raw| raw.into_asset()))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(records)
    }

    pub fn find_task(&self, id: i64) -> StoreResult<Option<Task>> {
        let conn = self.connection.lock();
        let raw = conn
            .query_row(&format!("{TASK_SELECT} WHERE id = ?1"), params![id], RawTask::from_row)
            .optional()?;
        raw.map(RawTask::into_task).transpose()
    }

    pub fn tasks_for_workspace(&self, workspace_id: i64) -> StoreResult<Vec<Task>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!(
            "{TASK_SELECT} WHERE workspace_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![workspace_id], RawTask::from_row)?;
        let records = rows
            .map(|raw| raw.map_err(StoreError::from).and_then(|raw| raw.into_task()))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(records)
    }

    pub fn tasks_for_schedule(&self, schedule_id: i64) -> StoreResult<Vec<Task>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!(
            "{TASK_SELECT} WHERE maintenance_schedule_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![schedule_id], RawTask::from_row)?;
        let records = rows
            .map(|raw| raw.map_err(StoreError::from).and_then(|raw| raw.into_task()))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(records)
    }
}

impl WorkspaceRepository for SqliteStore {
    fn find_workspace(&self, id: i64) -> StoreResult<Option<Workspace>> {
        let conn = self.connection.lock();
        let workspace = conn
            .query_row(
                "SELECT id, name, owner_id FROM workspaces WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Workspace {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        owner_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(workspace)
    }

    fn find_project(&self, id: i64) -> StoreResult<Option<Project>> {
        let conn = self.connection.lock();
        let project = conn
            .query_row(
                "SELECT id, workspace_id, name FROM projects WHERE id = ?1",
                params![id],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    fn find_project_by_name(&self, workspace_id: i64, name: &str) -> StoreResult<Option<Project>> {
        let conn = self.connection.lock();
        let project = conn
            .query_row(
                "SELECT id, workspace_id, name FROM projects
                 WHERE workspace_id = ?1 AND name = ?2 ORDER BY id ASC LIMIT 1",
                params![workspace_id, name],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    fn first_stage(&self, workspace_id: i64) -> StoreResult<Option<Stage>> {
        let conn = self.connection.lock();
        let stage = conn
            .query_row(
                "SELECT id, workspace_id, name, position FROM stages
                 WHERE workspace_id = ?1 ORDER BY position ASC, id ASC LIMIT 1",
                params![workspace_id],
                |row| {
                    Ok(Stage {
                        id: row.get(0)?,
                        workspace_id: row.get(1)?,
                        name: row.get(2)?,
                        position: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(stage)
    }
}

impl ScheduleRepository for SqliteStore {
    fn find_due_candidates(&self, as_of: NaiveDate) -> StoreResult<Vec<Candidate>> {
        let conn = self.connection.lock();
        // ISO dates compare correctly as text.
        let mut stmt = conn.prepare(&format!(
            "{SCHEDULE_SELECT} WHERE task_due_date IS NOT NULL AND task_due_date <= ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(
            params![as_of.format(DATE_FORMAT).to_string()],
            RawSchedule::candidate_from_row,
        )?;
        let candidates = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    fn find_equipment(&self, id: i64) -> StoreResult<Option<Equipment>> {
        let conn = self.connection.lock();
        let equipment = conn
            .query_row(
                "SELECT id, workspace_id, name, project_id, created_by FROM equipment WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Equipment {
                        id: row.get(0)?,
                        workspace_id: row.get(1)?,
                        name: row.get(2)?,
                        project_id: row.get(3)?,
                        created_by: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(equipment)
    }

    fn save_schedule(&self, schedule: &MaintenanceSchedule) -> StoreResult<()> {
        schedule
            .validate()
            .map_err(|err| StoreError::InvalidData(err.to_string()))?;
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE maintenance_schedules
             SET equipment_id = ?2, title = ?3, interval_days = ?4, advance_days = ?5,
                 last_service_date = ?6, next_service_date = ?7, task_due_date = ?8
             WHERE id = ?1",
            params![
                schedule.id,
                schedule.equipment_id,
                schedule.title,
                schedule.interval_days,
                schedule.advance_days,
                format_date(schedule.last_service_date()),
                format_date(schedule.next_service_date()),
                format_date(schedule.task_due_date()),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("maintenance schedule", schedule.id));
        }
        Ok(())
    }
}

impl TaskRepository for SqliteStore {
    fn has_open_for_schedule(&self, schedule_id: i64) -> StoreResult<bool> {
        let conn = self.connection.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE maintenance_schedule_id = ?1 AND progress < 100)",
            params![schedule_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn latest_completion_for_schedule(&self, schedule_id: i64) -> StoreResult<Option<NaiveDate>> {
        let conn = self.connection.lock();
        let latest: Option<String> = conn.query_row(
            "SELECT MAX(completed_on) FROM tasks
             WHERE maintenance_schedule_id = ?1 AND progress >= 100 AND completed_on IS NOT NULL",
            params![schedule_id],
            |row| row.get(0),
        )?;
        parse_date(latest)
    }

    fn find_by_external_ref(
        &self,
        workspace_id: i64,
        external_ref: &str,
    ) -> StoreResult<Option<Task>> {
        let conn = self.connection.lock();
        let raw = conn
            .query_row(
                &format!("{TASK_SELECT} WHERE workspace_id = ?1 AND external_ref = ?2 ORDER BY id ASC LIMIT 1"),
                params![workspace_id, external_ref],
                RawTask::from_row,
            )
            .optional()?;
        raw.map(RawTask::into_task).transpose()
    }

    fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO tasks
                (workspace_id, project_id, stage_id, title, description, progress, start_date,
                 due_date, completed_on, maintenance_schedule_id, external_ref, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                task.workspace_id,
                task.project_id,
                task.stage_id,
                task.title,
                task.description,
                task.progress,
                format_date(task.start_date),
                format_date(task.due_date),
                format_date(task.completed_on),
                task.maintenance_schedule_id,
                task.external_ref,
                task.created_by,
            ],
        )?;
        Ok(task.into_task(conn.last_insert_rowid()))
    }

    fn update_task(&self, task: &Task) -> StoreResult<()> {
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE tasks
             SET workspace_id = ?2, project_id = ?3, stage_id = ?4, title = ?5, description = ?6,
                 progress = ?7, start_date = ?8, due_date = ?9, completed_on = ?10,
                 maintenance_schedule_id = ?11, external_ref = ?12, created_by = ?13
             WHERE id = ?1",
            params![
                task.id,
                task.workspace_id,
                task.project_id,
                task.stage_id,
                task.title,
                task.description,
                task.progress,
                format_date(task.start_date),
                format_date(task.due_date),
                format_date(task.completed_on),
                task.maintenance_schedule_id,
                task.external_ref,
                task.created_by,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("task", task.id));
        }
        Ok(())
    }
}

impl InvoiceRepository for SqliteStore {
    fn unlinked_asset_items(&self) -> StoreResult<Vec<InvoiceItem>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!(
            "{ITEM_SELECT} WHERE asset_id IS NULL AND lower(item_type) = ?1
             ORDER BY invoice_id ASC, sort_order ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![crate::asset::ASSET_ITEM_TYPE], item_from_row)?;
        let items = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn find_invoice(&self, id: i64) -> StoreResult<Option<Invoice>> {
        let conn = self.connection.lock();
        let raw = conn
            .query_row(
                "SELECT id, workspace_id, number, issued_on, created_by FROM invoices WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, workspace_id, number, issued_on, created_by)) = raw else {
            return Ok(None);
        };
        let issued_on = parse_date(Some(issued_on))?
            .ok_or_else(|| StoreError::InvalidData(format!("invoice {id} has no issue date")))?;
        Ok(Some(Invoice {
            id,
            workspace_id,
            number,
            issued_on,
            created_by,
        }))
    }

    fn unclaimed_assets_for_invoice(&self, invoice_id: i64) -> StoreResult<Vec<Asset>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!(
            "{ASSET_SELECT} WHERE invoice_id = ?1
               AND id NOT IN (SELECT asset_id FROM invoice_items WHERE asset_id IS NOT NULL)
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![invoice_id], RawAsset::from_row)?;
        let records = rows
            .map(|raw| raw.map_err(StoreError::from).and_then(|raw| raw.into_asset()))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(records)
    }

    fn create_asset(&self, asset: NewAsset) -> StoreResult<Asset> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO assets (workspace_id, invoice_id, name, purchased_on, purchase_cost, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                asset.workspace_id,
                asset.invoice_id,
                asset.name,
                format_date(Some(asset.purchased_on)),
                asset.purchase_cost,
                asset.created_by,
            ],
        )?;
        Ok(Asset {
            id: conn.last_insert_rowid(),
            workspace_id: asset.workspace_id,
            invoice_id: asset.invoice_id,
            name: asset.name,
            purchased_on: asset.purchased_on,
            purchase_cost: asset.purchase_cost,
            created_by: asset.created_by,
        })
    }

    fn link_item_to_asset(&self, item_id: i64, asset_id: i64) -> StoreResult<()> {
        let conn = self.connection.lock();
        let changed = conn.execute(
            "UPDATE invoice_items SET asset_id = ?2 WHERE id = ?1",
            params![item_id, asset_id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("invoice item", item_id));
        }
        Ok(())
    }
}

impl SettingsStore for SqliteStore {
    fn get(&self, key: &str, scope: &SettingScope) -> StoreResult<Option<String>> {
        let conn = self.connection.lock();
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1 AND scope = ?2",
                params![key, scope.as_key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, scope: &SettingScope) -> StoreResult<()> {
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO settings (key, scope, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (key, scope) DO UPDATE SET value = excluded.value",
            params![key, scope.as_key(), value],
        )?;
        Ok(())
    }
}

const SCHEDULE_SELECT: &str = "SELECT id, equipment_id, title, interval_days, advance_days, last_service_date
     FROM maintenance_schedules";

const TASK_SELECT: &str = "SELECT id, workspace_id, project_id, stage_id, title, description, progress,
            start_date, due_date, completed_on, maintenance_schedule_id, external_ref, created_by
     FROM tasks";

const ITEM_SELECT: &str =
    "SELECT id, invoice_id, item_type, description, unit_price, sort_order, asset_id FROM invoice_items";

const ASSET_SELECT: &str = "SELECT id, workspace_id, invoice_id, name, purchased_on, purchase_cost, created_by
     FROM assets";

struct RawSchedule {
    id: i64,
    equipment_id: i64,
    title: String,
    interval_days: i64,
    advance_days: i64,
    last_service_date: Option<String>,
}

impl RawSchedule {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            equipment_id: row.get(1)?,
            title: row.get(2)?,
            interval_days: row.get(3)?,
            advance_days: row.get(4)?,
            last_service_date: row.get(5)?,
        })
    }

    /// Only an unreadable id fails the query; any other bad column rejects
    /// just this row.
    fn candidate_from_row(row: &Row<'_>) -> rusqlite::Result<Candidate> {
        let id: i64 = row.get(0)?;
        Ok(match Self::from_row(row) {
            Ok(raw) => raw.into_schedule(),
            Err(err) => Err(RejectedSchedule {
                schedule_id: id,
                source: err.into(),
            }),
        })
    }

    // Derived dates are recomputed rather than trusted from the row.
    fn into_schedule(self) -> Candidate {
        let schedule_id = self.id;
        let reject = move |source: StoreError| RejectedSchedule {
            schedule_id,
            source,
        };
        let last = parse_date(self.last_service_date).map_err(reject)?;
        MaintenanceSchedule::new(
            self.id,
            self.equipment_id,
            self.title,
            self.interval_days,
            self.advance_days,
            last,
        )
        .map_err(|err| reject(StoreError::InvalidData(err.to_string())))
    }
}

struct RawTask {
    id: i64,
    workspace_id: i64,
    project_id: i64,
    stage_id: i64,
    title: String,
    description: Option<String>,
    progress: i64,
    start_date: Option<String>,
    due_date: Option<String>,
    completed_on: Option<String>,
    maintenance_schedule_id: Option<i64>,
    external_ref: Option<String>,
    created_by: Option<i64>,
}

impl RawTask {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workspace_id: row.get(1)?,
            project_id: row.get(2)?,
            stage_id: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            progress: row.get(6)?,
            start_date: row.get(7)?,
            due_date: row.get(8)?,
            completed_on: row.get(9)?,
            maintenance_schedule_id: row.get(10)?,
            external_ref: row.get(11)?,
            created_by: row.get(12)?,
        })
    }

    fn into_task(self) -> StoreResult<Task> {
        let progress = u8::try_from(self.progress.clamp(0, 100)).map_err(|err| {
            StoreError::InvalidData(format!("task {} progress: {err}", self.id))
        })?;
        Ok(Task {
            id: self.id,
            workspace_id: self.workspace_id,
            project_id: self.project_id,
            stage_id: self.stage_id,
            title: self.title,
            description: self.description,
            progress,
            start_date: parse_date(self.start_date)?,
            due_date: parse_date(self.due_date)?,
            completed_on: parse_date(self.completed_on)?,
            maintenance_schedule_id: self.maintenance_schedule_id,
            external_ref: self.external_ref,
            created_by: self.created_by,
        })
    }
}

struct RawAsset {
    id: i64,
    workspace_id: i64,
    invoice_id: Option<i64>,
    name: String,
    purchased_on: String,
    purchase_cost: f64,
    created_by: Option<i64>,
}

impl RawAsset {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workspace_id: row.get(1)?,
            invoice_id: row.get(2)?,
            name: row.get(3)?,
            purchased_on: row.get(4)?,
            purchase_cost: row.get(5)?,
            created_by: row.get(6)?,
        })
    }

    fn into_asset(self) -> StoreResult<Asset> {
        let purchased_on = parse_date(Some(self.purchased_on))?.ok_or_else(|| {
            StoreError::InvalidData(format!("asset {} has no purchase date", self.id))
        })?;
        Ok(Asset {
            id: self.id,
            workspace_id: self.workspace_id,
            invoice_id: self.invoice_id,
            name: self.name,
            purchased_on,
            purchase_cost: self.purchase_cost,
            created_by: self.created_by,
        })
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        name: row.get(2)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<InvoiceItem> {
    Ok(InvoiceItem {
        id: row.get(0)?,
        invoice_id: row.get(1)?,
        item_type: row.get(2)?,
        description: row.get(3)?,
        unit_price: row.get(4)?,
        sort_order: row.get(5)?,
        asset_id: row.get(6)?,
    })
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_date(input: Option<String>) -> StoreResult<Option<NaiveDate>> {
    match input {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|e| StoreError::InvalidData(format!("invalid date '{raw}': {e}"))),
    }
}
