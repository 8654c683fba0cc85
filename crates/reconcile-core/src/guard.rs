use crate::MaintenanceSchedule;
use crate::persistence::{StoreResult, TaskRepository};

/// Existence check that keeps repeated runs from generating a second open
/// task for the same schedule. The check and the insert are not atomic, so
/// two concurrent runs can still race.
pub struct IdempotencyGuard<'a> {
    tasks: &'a dyn TaskRepository,
}

impl<'a> IdempotencyGuard<'a> {
    pub fn new(tasks: &'a dyn TaskRepository) -> Self {
        Self { tasks }
    }

    pub fn has_open_derivative(&self, schedule: &MaintenanceSchedule) -> StoreResult<bool> {
        self.tasks.has_open_for_schedule(schedule.id)
    }
}
