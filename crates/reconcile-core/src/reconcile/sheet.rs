use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use super::ROUTES_SETTING;
use crate::persistence::{
    SettingScope, SettingsStore, StoreError, StoreResult, TaskRepository, WorkspaceRepository,
};
use crate::source::ExternalRow;
use crate::translate::Translator;
use crate::workspace::attribute_actor;
use crate::{COMPLETE_PROGRESS, NewTask, Project, ReconciliationResult, Stage, Task, Workspace};

const ID_COLUMNS: &[&str] = &["id", "row id", "ref", "reference"];
const TITLE_COLUMNS: &[&str] = &["title", "task", "task name", "name"];
const DESCRIPTION_COLUMNS: &[&str] = &["description", "details", "notes"];
const BRANCH_COLUMNS: &[&str] = &["branch", "location", "site"];
const DUE_COLUMNS: &[&str] = &["due date", "due", "deadline"];
const PROGRESS_COLUMNS: &[&str] = &["progress", "status"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y"];

/// Literal branch value to project name mapping for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectRoutes {
    routes: BTreeMap<String, String>,
}

impl ProjectRoutes {
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let routes: BTreeMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self {
            routes: routes
                .into_iter()
                .map(|(branch, project)| (branch.trim().to_string(), project.trim().to_string()))
                .collect(),
        })
    }

    pub fn load(settings: &dyn SettingsStore, workspace_id: i64) -> StoreResult<Self> {
        match settings.get(ROUTES_SETTING, &SettingScope::Workspace(workspace_id))? {
            Some(raw) => Self::from_json(&raw),
            None => Ok(Self::default()),
        }
    }

    pub fn insert(&mut self, branch: impl Into<String>, project: impl Into<String>) {
        self.routes.insert(branch.into(), project.into());
    }

    pub fn project_for(&self, branch: &str) -> Option<&str> {
        self.routes.get(branch.trim()).map(String::as_str)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.routes).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Row values after parsing, before they are applied to a task.
#[derive(Debug, Clone, PartialEq)]
struct ParsedRow {
    natural_key: String,
    title: String,
    description: Option<String>,
    branch: Option<String>,
    due_date: Option<NaiveDate>,
    progress: u8,
}

enum RowOutcome {
    Created(i64),
    Updated(i64),
    Unchanged(i64),
}

/// Creates or updates workspace tasks from spreadsheet rows.
pub struct SheetTaskSync<'a> {
    workspaces: &'a dyn WorkspaceRepository,
    tasks: &'a dyn TaskRepository,
    settings: &'a dyn SettingsStore,
    translator: &'a dyn Translator,
    today: NaiveDate,
}

struct SyncContext {
    workspace: Workspace,
    routes: ProjectRoutes,
    default_project: Option<Project>,
    stage: Option<Stage>,
    created_by: Option<i64>,
    projects_by_name: RefCell<HashMap<String, Option<Project>>>,
}

impl<'a> SheetTaskSync<'a> {
    pub fn new(
        workspaces: &'a dyn WorkspaceRepository,
        tasks: &'a dyn TaskRepository,
        settings: &'a dyn SettingsStore,
        translator: &'a dyn Translator,
        today: NaiveDate,
    ) -> Self {
        Self {
            workspaces,
            tasks,
            settings,
            translator,
            today,
        }
    }

    /// Errors only when the workspace or the default project cannot be used;
    /// problems with individual rows end up in the result's error list.
    pub fn sync_to_project(
        &self,
        rows: impl IntoIterator<Item = ExternalRow>,
        workspace_id: i64,
        default_project_id: Option<i64>,
        user_id: Option<i64>,
    ) -> StoreResult<ReconciliationResult> {
        let workspace = self
            .workspaces
            .find_workspace(workspace_id)?
            .ok_or_else(|| StoreError::not_found("workspace", workspace_id))?;
        let default_project = match default_project_id {
            Some(id) => {
                let project = self
                    .workspaces
                    .find_project(id)?
                    .ok_or_else(|| StoreError::not_found("project", id))?;
                if project.workspace_id != workspace.id {
                    return Err(StoreError::InvalidData(format!(
                        "project {id} does not belong to workspace {}",
                        workspace.id
                    )));
                }
                Some(project)
            }
            None => None,
        };
        let routes = ProjectRoutes::load(self.settings, workspace.id)?;
        let stage = self.workspaces.first_stage(workspace.id)?;
        let created_by = attribute_actor(user_id, &workspace);

        let ctx = SyncContext {
            workspace,
            routes,
            default_project,
            stage,
            created_by,
            projects_by_name: RefCell::new(HashMap::new()),
        };

        let mut result = ReconciliationResult::default();
        for row in rows {
            let row_number = row.row_number;
            match self.sync_row(&ctx, &row) {
                Ok(RowOutcome::Created(id)) => {
                    debug!(row = row_number, task = id, "created task from sheet row");
                    result.created += 1;
                }
                Ok(RowOutcome::Updated(id)) => {
                    debug!(row = row_number, task = id, "updated task from sheet row");
                    result.updated += 1;
                }
                Ok(RowOutcome::Unchanged(_)) => result.skipped += 1,
                Err(message) => {
                    warn!(row = row_number, %message, "sheet row rejected");
                    result.record_error(format!("row {row_number}: {message}"));
                }
            }
        }
        info!(
            workspace = ctx.workspace.id,
            created = result.created,
            updated = result.updated,
            errors = result.errors.len(),
            "sheet sync finished"
        );
        Ok(result)
    }

    fn sync_row(&self, ctx: &SyncContext, row: &ExternalRow) -> Result<RowOutcome, String> {
        let parsed = parse_row(row)?;
        let project = self.route(ctx, parsed.branch.as_deref())?;

        let existing = self
            .tasks
            .find_by_external_ref(ctx.workspace.id, &parsed.natural_key)
            .map_err(|err| err.to_string())?;

        match existing {
            Some(task) => self.update_existing(task, &parsed, &project),
            None => self.create_new(ctx, row, parsed, &project),
        }
    }

    fn route(&self, ctx: &SyncContext, branch: Option<&str>) -> Result<Project, String> {
        if let Some(name) = branch.and_then(|b| ctx.routes.project_for(b)) {
            return self
                .project_by_name(ctx, name)?
                .ok_or_else(|| format!("project '{name}' not found in workspace {}", ctx.workspace.id));
        }
        if let Some(project) = &ctx.default_project {
            return Ok(project.clone());
        }
        Err(match branch {
            Some(value) => format!("no project mapping for branch '{value}'"),
            None => "no branch value and no default project".to_string(),
        })
    }

    fn project_by_name(&self, ctx: &SyncContext, name: &str) -> Result<Option<Project>, String> {
        if let Some(cached) = ctx.projects_by_name.borrow().get(name) {
            return Ok(cached.clone());
        }
        let found = self
            .workspaces
            .find_project_by_name(ctx.workspace.id, name)
            .map_err(|err| err.to_string())?;
        ctx.projects_by_name
            .borrow_mut()
            .insert(name.to_string(), found.clone());
        Ok(found)
    }

    fn create_new(
        &self,
        ctx: &SyncContext,
        row: &ExternalRow,
        parsed: ParsedRow,
        project: &Project,
    ) -> Result<RowOutcome, String> {
        let stage = ctx
            .stage
            .as_ref()
            .ok_or_else(|| format!("workspace {} has no workflow stage", ctx.workspace.id))?;
        let description = parsed.description.unwrap_or_else(|| {
            let row_number = row.row_number.to_string();
            self.translator
                .format("sheet.task_description_fallback", &[("row", row_number.as_str())])
        });

        let mut task = NewTask::new(ctx.workspace.id, project.id, stage.id, parsed.title);
        task.description = Some(description);
        task.progress = parsed.progress;
        task.start_date = Some(self.today);
        task.due_date = parsed.due_date;
        task.completed_on = (parsed.progress >= COMPLETE_PROGRESS).then_some(self.today);
        task.external_ref = Some(parsed.natural_key);
        task.created_by = ctx.created_by;

        let created = self.tasks.create_task(task).map_err(|err| err.to_string())?;
        Ok(RowOutcome::Created(created.id))
    }

    fn update_existing(
        &self,
        task: Task,
        parsed: &ParsedRow,
        project: &Project,
    ) -> Result<RowOutcome, String> {
        let mut updated = task.clone();
        updated.title = parsed.title.clone();
        if parsed.description.is_some() {
            updated.description = parsed.description.clone();
        }
        updated.due_date = parsed.due_date;
        updated.project_id = project.id;
        updated.progress = parsed.progress;
        if updated.is_complete() && !task.is_complete() {
            updated.completed_on = Some(self.today);
        } else if !updated.is_complete() {
            updated.completed_on = None;
        }

        if updated == task {
            return Ok(RowOutcome::Unchanged(task.id));
        }
        self.tasks
            .update_task(&updated)
            .map_err(|err| err.to_string())?;
        Ok(RowOutcome::Updated(updated.id))
    }
}

fn parse_row(row: &ExternalRow) -> Result<ParsedRow, String> {
    let title = row
        .get(TITLE_COLUMNS)
        .ok_or_else(|| "missing task title".to_string())?
        .to_string();
    let due_date = row.get(DUE_COLUMNS).map(parse_sheet_date).transpose()?;
    let progress = parse_progress(row.get(PROGRESS_COLUMNS).unwrap_or_default())?;
    let natural_key = match row.get(ID_COLUMNS) {
        Some(id) => format!("id:{id}"),
        None => format!(
            "{title}|{}",
            due_date.map(|d| d.to_string()).unwrap_or_default()
        ),
    };
    Ok(ParsedRow {
        natural_key,
        title,
        description: row.get(DESCRIPTION_COLUMNS).map(str::to_string),
        branch: row.get(BRANCH_COLUMNS).map(str::to_string),
        due_date,
        progress,
    })
}

pub fn parse_sheet_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .ok_or_else(|| format!("invalid date '{raw}'"))
}

/// Maps a progress or status cell to a completion percentage.
pub fn parse_progress(raw: &str) -> Result<u8, String> {
    let value = raw.trim().to_lowercase();
    match value.as_str() {
        "" | "todo" | "to do" | "open" | "not started" => return Ok(0),
        "in progress" | "doing" => return Ok(50),
        "done" | "complete" | "completed" => return Ok(COMPLETE_PROGRESS),
        _ => {}
    }
    let numeric = value.strip_suffix('%').unwrap_or(&value).trim();
    numeric
        .parse::<f64>()
        .ok()
        .filter(|pct| pct.is_finite())
        .map(|pct| pct.round().clamp(0.0, 100.0) as u8)
        .ok_or_else(|| format!("invalid progress '{}'", raw.trim()))
}
