use chrono::NaiveDate;

use crate::MaintenanceSchedule;

/// A schedule is due once its task due date is today or earlier. Schedules
/// that were never serviced have no due date and are never due.
pub fn is_due(schedule: &MaintenanceSchedule, today: NaiveDate) -> bool {
    schedule
        .task_due_date()
        .is_some_and(|due| due <= today)
}
