use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Recurring maintenance cadence for a piece of equipment.
///
/// `next_service_date` and `task_due_date` are derived from the last service
/// date and are never set directly; use [`MaintenanceSchedule::record_service`]
/// to move the cadence forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceSchedule {
    pub id: i64,
    pub equipment_id: i64,
    pub title: String,
    pub interval_days: i64,
    pub advance_days: i64,
    last_service_date: Option<NaiveDate>,
    next_service_date: Option<NaiveDate>,
    task_due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedule interval must be at least one day (got {0})")]
    NonPositiveInterval(i64),
    #[error("advance notice cannot be negative (got {0})")]
    NegativeAdvance(i64),
    #[error("schedule title must not be empty")]
    EmptyTitle,
    #[error("next service after {last} with a {interval_days}-day interval is outside the calendar")]
    DateOutOfRange { last: NaiveDate, interval_days: i64 },
}

impl MaintenanceSchedule {
    pub fn new(
        id: i64,
        equipment_id: i64,
        title: impl Into<String>,
        interval_days: i64,
        advance_days: i64,
        last_service_date: Option<NaiveDate>,
    ) -> Result<Self, ScheduleError> {
        let mut schedule = Self {
            id,
            equipment_id,
            title: title.into(),
            interval_days,
            advance_days,
            last_service_date: None,
            next_service_date: None,
            task_due_date: None,
        };
        schedule.validate()?;
        schedule.set_last_service_date(last_service_date)?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.title.trim().is_empty() {
            return Err(ScheduleError::EmptyTitle);
        }
        if self.interval_days <= 0 {
            return Err(ScheduleError::NonPositiveInterval(self.interval_days));
        }
        if self.advance_days < 0 {
            return Err(ScheduleError::NegativeAdvance(self.advance_days));
        }
        Ok(())
    }

    pub fn last_service_date(&self) -> Option<NaiveDate> {
        self.last_service_date
    }

    pub fn next_service_date(&self) -> Option<NaiveDate> {
        self.next_service_date
    }

    pub fn task_due_date(&self) -> Option<NaiveDate> {
        self.task_due_date
    }

    /// Replaces the last service date and recomputes the derived dates.
    /// Leaves the schedule untouched when the next service date cannot be
    /// represented.
    pub fn set_last_service_date(&mut self, date: Option<NaiveDate>) -> Result<(), ScheduleError> {
        let (next, due) = match date {
            Some(last) => {
                let (next, due) = self.derive_dates(last)?;
                (Some(next), Some(due))
            }
            None => (None, None),
        };
        self.last_service_date = date;
        self.next_service_date = next;
        self.task_due_date = due;
        Ok(())
    }

    fn derive_dates(&self, last: NaiveDate) -> Result<(NaiveDate, NaiveDate), ScheduleError> {
        let out_of_range = || ScheduleError::DateOutOfRange {
            last,
            interval_days: self.interval_days,
        };
        let interval = u64::try_from(self.interval_days).map_err(|_| out_of_range())?;
        let advance = self.advance_days.max(0).unsigned_abs();
        let next = last
            .checked_add_days(Days::new(interval))
            .ok_or_else(out_of_range)?;
        let due = next
            .checked_sub_days(Days::new(advance))
            .ok_or_else(out_of_range)?;
        Ok((next, due))
    }

    /// Moves the cadence forward to `serviced_on` when it is newer than the
    /// recorded last service. Returns whether anything changed.
    pub fn record_service(&mut self, serviced_on: NaiveDate) -> Result<bool, ScheduleError> {
        match self.last_service_date {
            Some(last) if last >= serviced_on => Ok(false),
            _ => {
                self.set_last_service_date(Some(serviced_on))?;
                Ok(true)
            }
        }
    }
}
