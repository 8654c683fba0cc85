use chrono::NaiveDate;
use std::fmt;
use tracing::{debug, info, warn};

use crate::guard::IdempotencyGuard;
use crate::persistence::{
    ScheduleRepository, StoreError, StoreResult, TaskRepository, WorkspaceRepository,
};
use crate::threshold::is_due;
use crate::translate::Translator;
use crate::workspace::attribute_actor;
use crate::{Equipment, MaintenanceSchedule, NewTask, ReconciliationResult};

/// Generates maintenance tasks for schedules whose due date has arrived.
pub struct MaintenanceReconciler<'a> {
    workspaces: &'a dyn WorkspaceRepository,
    schedules: &'a dyn ScheduleRepository,
    tasks: &'a dyn TaskRepository,
    translator: &'a dyn Translator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SkipReason {
    EquipmentMissing(i64),
    NoProject,
    NoStage(i64),
    NotDue,
    OpenTaskExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EquipmentMissing(id) => write!(f, "equipment {id} not found"),
            SkipReason::NoProject => write!(f, "equipment has no linked project"),
            SkipReason::NoStage(workspace) => {
                write!(f, "workspace {workspace} has no workflow stage")
            }
            SkipReason::NotDue => write!(f, "not due yet"),
            SkipReason::OpenTaskExists => write!(f, "an open maintenance task already exists"),
        }
    }
}

enum Action {
    Created(i64),
    Skipped(SkipReason),
}

struct Outcome {
    serviced: bool,
    action: Action,
}

impl<'a> MaintenanceReconciler<'a> {
    pub fn new(
        workspaces: &'a dyn WorkspaceRepository,
        schedules: &'a dyn ScheduleRepository,
        tasks: &'a dyn TaskRepository,
        translator: &'a dyn Translator,
    ) -> Self {
        Self {
            workspaces,
            schedules,
            tasks,
            translator,
        }
    }

    /// Loads the schedules due on `today` and reconciles them. Stored rows
    /// that do not form a valid schedule are recorded as errors.
    pub fn run_due(&self, today: NaiveDate) -> StoreResult<ReconciliationResult> {
        let candidates = self.schedules.find_due_candidates(today)?;
        debug!(count = candidates.len(), %today, "loaded maintenance candidates");

        let mut rejected = ReconciliationResult::default();
        let mut schedules = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match candidate {
                Ok(schedule) => schedules.push(schedule),
                Err(err) => {
                    warn!(schedule = err.schedule_id, error = %err.source, "skipping unreadable schedule");
                    rejected.record_error(err.to_string());
                }
            }
        }

        let mut result = self.run(schedules, today);
        result.merge(rejected);
        Ok(result)
    }

    /// Processes each schedule independently; a failure on one schedule is
    /// recorded and the sweep moves on.
    pub fn run(
        &self,
        candidates: impl IntoIterator<Item = MaintenanceSchedule>,
        today: NaiveDate,
    ) -> ReconciliationResult {
        let mut result = ReconciliationResult::default();
        for mut schedule in candidates {
            match self.reconcile_schedule(&mut schedule, today) {
                Ok(outcome) => {
                    if outcome.serviced {
                        result.updated += 1;
                    }
                    match outcome.action {
                        Action::Created(task_id) => {
                            info!(schedule = schedule.id, task = task_id, "created maintenance task");
                            result.created += 1;
                        }
                        Action::Skipped(reason) => {
                            debug!(schedule = schedule.id, %reason, "skipped schedule");
                            result.skipped += 1;
                        }
                    }
                }
                Err(err) => {
                    warn!(schedule = schedule.id, error = %err, "schedule reconciliation failed");
                    result.record_error(format!("schedule {}: {err}", schedule.id));
                }
            }
        }
        result
    }

    fn reconcile_schedule(
        &self,
        schedule: &mut MaintenanceSchedule,
        today: NaiveDate,
    ) -> StoreResult<Outcome> {
        let serviced = self.apply_completed_service(schedule)?;
        let action = self.generate_task(schedule, today)?;
        Ok(Outcome { serviced, action })
    }

    /// Advances the last service date when a generated task was completed
    /// after it.
    fn apply_completed_service(&self, schedule: &mut MaintenanceSchedule) -> StoreResult<bool> {
        let Some(completed_on) = self.tasks.latest_completion_for_schedule(schedule.id)? else {
            return Ok(false);
        };
        let advanced = schedule
            .record_service(completed_on)
            .map_err(|err| StoreError::InvalidData(err.to_string()))?;
        if !advanced {
            return Ok(false);
        }
        self.schedules.save_schedule(schedule)?;
        info!(
            schedule = schedule.id,
            %completed_on,
            next_service = ?schedule.next_service_date(),
            "recorded completed maintenance"
        );
        Ok(true)
    }

    fn generate_task(&self, schedule: &MaintenanceSchedule, today: NaiveDate) -> StoreResult<Action> {
        let Some(equipment) = self.schedules.find_equipment(schedule.equipment_id)? else {
            return Ok(Action::Skipped(SkipReason::EquipmentMissing(
                schedule.equipment_id,
            )));
        };
        let Some(project_id) = equipment.project_id else {
            return Ok(Action::Skipped(SkipReason::NoProject));
        };
        let Some(stage) = self.workspaces.first_stage(equipment.workspace_id)? else {
            return Ok(Action::Skipped(SkipReason::NoStage(equipment.workspace_id)));
        };

        if !is_due(schedule, today) {
            return Ok(Action::Skipped(SkipReason::NotDue));
        }
        if IdempotencyGuard::new(self.tasks).has_open_derivative(schedule)? {
            return Ok(Action::Skipped(SkipReason::OpenTaskExists));
        }

        let workspace = self
            .workspaces
            .find_workspace(equipment.workspace_id)?
            .ok_or_else(|| StoreError::not_found("workspace", equipment.workspace_id))?;
        let actor = attribute_actor(equipment.created_by, &workspace).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "no user to attribute the task to (equipment {} has no creator and workspace {} has no owner)",
                equipment.id, workspace.id
            ))
        })?;

        let mut task = NewTask::new(workspace.id, project_id, stage.id, self.title(schedule, &equipment));
        task.description = Some(self.description(schedule, &equipment));
        task.start_date = Some(today);
        task.due_date = schedule.next_service_date();
        task.maintenance_schedule_id = Some(schedule.id);
        task.created_by = Some(actor);

        let created = self.tasks.create_task(task)?;
        Ok(Action::Created(created.id))
    }

    fn title(&self, schedule: &MaintenanceSchedule, equipment: &Equipment) -> String {
        self.translator.format(
            "maintenance.task_title",
            &[
                ("schedule", schedule.title.as_str()),
                ("equipment", equipment.name.as_str()),
            ],
        )
    }

    fn description(&self, schedule: &MaintenanceSchedule, equipment: &Equipment) -> String {
        let next_service = schedule
            .next_service_date()
            .map(|d| d.to_string())
            .unwrap_or_default();
        let interval = schedule.interval_days.to_string();
        self.translator.format(
            "maintenance.task_description",
            &[
                ("schedule", schedule.title.as_str()),
                ("equipment", equipment.name.as_str()),
                ("next_service", next_service.as_str()),
                ("interval", interval.as_str()),
            ],
        )
    }
}
