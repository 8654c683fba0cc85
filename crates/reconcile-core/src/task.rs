use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const COMPLETE_PROGRESS: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub workspace_id: i64,
    pub project_id: i64,
    pub stage_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completion percentage, 0..=100.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_schedule_id: Option<i64>,
    /// Natural key of the spreadsheet row this task was imported from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
}

impl Task {
    pub fn is_complete(&self) -> bool {
        self.progress >= COMPLETE_PROGRESS
    }
}

/// Fields for a task that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub workspace_id: i64,
    pub project_id: i64,
    pub stage_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub progress: u8,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub completed_on: Option<NaiveDate>,
    pub maintenance_schedule_id: Option<i64>,
    pub external_ref: Option<String>,
    pub created_by: Option<i64>,
}

impl NewTask {
    pub fn new(workspace_id: i64, project_id: i64, stage_id: i64, title: impl Into<String>) -> Self {
        Self {
            workspace_id,
            project_id,
            stage_id,
            title: title.into(),
            description: None,
            progress: 0,
            start_date: None,
            due_date: None,
            completed_on: None,
            maintenance_schedule_id: None,
            external_ref: None,
            created_by: None,
        }
    }

    pub fn into_task(self, id: i64) -> Task {
        Task {
            id,
            workspace_id: self.workspace_id,
            project_id: self.project_id,
            stage_id: self.stage_id,
            title: self.title,
            description: self.description,
            progress: self.progress,
            start_date: self.start_date,
            due_date: self.due_date,
            completed_on: self.completed_on,
            maintenance_schedule_id: self.maintenance_schedule_id,
            external_ref: self.external_ref,
            created_by: self.created_by,
        }
    }
}
