use chrono::NaiveDate;
use reconcile_core::{MaintenanceSchedule, ScheduleError, is_due};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn monthly_filter(last: Option<NaiveDate>) -> MaintenanceSchedule {
    MaintenanceSchedule::new(1, 10, "Filter change", 30, 7, last).expect("valid schedule")
}

#[test]
fn derived_dates_follow_interval_and_advance_notice() {
    let schedule = monthly_filter(Some(d(2024, 1, 1)));

    assert_eq!(schedule.next_service_date(), Some(d(2024, 1, 31)));
    assert_eq!(schedule.task_due_date(), Some(d(2024, 1, 24)));
}

#[test]
fn due_on_and_after_the_task_due_date() {
    let schedule = monthly_filter(Some(d(2024, 1, 1)));

    assert!(!is_due(&schedule, d(2024, 1, 23)));
    assert!(is_due(&schedule, d(2024, 1, 24)));
    assert!(is_due(&schedule, d(2024, 1, 25)));
}

#[test]
fn never_serviced_schedule_is_not_due() {
    let schedule = monthly_filter(None);

    assert_eq!(schedule.next_service_date(), None);
    assert_eq!(schedule.task_due_date(), None);
    assert!(!is_due(&schedule, d(2030, 1, 1)));
}

#[test]
fn zero_advance_makes_task_due_on_service_date() {
    let schedule =
        MaintenanceSchedule::new(2, 10, "Inspection", 14, 0, Some(d(2024, 3, 1))).unwrap();
    assert_eq!(schedule.task_due_date(), schedule.next_service_date());
    assert_eq!(schedule.task_due_date(), Some(d(2024, 3, 15)));
}

#[test]
fn record_service_only_moves_forward() {
    let mut schedule = monthly_filter(Some(d(2024, 1, 1)));

    assert!(!schedule.record_service(d(2023, 12, 20)).unwrap());
    assert!(!schedule.record_service(d(2024, 1, 1)).unwrap());
    assert_eq!(schedule.last_service_date(), Some(d(2024, 1, 1)));

    assert!(schedule.record_service(d(2024, 2, 2)).unwrap());
    assert_eq!(schedule.next_service_date(), Some(d(2024, 3, 3)));
    assert_eq!(schedule.task_due_date(), Some(d(2024, 2, 25)));
}

#[test]
fn first_service_on_unserviced_schedule_sets_dates() {
    let mut schedule = monthly_filter(None);
    assert!(schedule.record_service(d(2024, 5, 1)).unwrap());
    assert_eq!(schedule.next_service_date(), Some(d(2024, 5, 31)));
}

#[test]
fn invalid_cadence_is_rejected() {
    assert_eq!(
        MaintenanceSchedule::new(1, 1, "Oil", 0, 0, None).unwrap_err(),
        ScheduleError::NonPositiveInterval(0)
    );
    assert_eq!(
        MaintenanceSchedule::new(1, 1, "Oil", 30, -1, None).unwrap_err(),
        ScheduleError::NegativeAdvance(-1)
    );
    assert_eq!(
        MaintenanceSchedule::new(1, 1, "  ", 30, 0, None).unwrap_err(),
        ScheduleError::EmptyTitle
    );
}

#[test]
fn interval_past_the_calendar_is_an_error() {
    let err = MaintenanceSchedule::new(1, 1, "Overhaul", 1_000_000_000, 0, Some(d(2024, 1, 1)))
        .unwrap_err();
    assert_eq!(
        err,
        ScheduleError::DateOutOfRange {
            last: d(2024, 1, 1),
            interval_days: 1_000_000_000,
        }
    );

    // Unserviced schedules have nothing to derive yet.
    assert!(MaintenanceSchedule::new(1, 1, "Overhaul", i64::MAX, 0, None).is_ok());
}

#[test]
fn failed_service_update_leaves_dates_unchanged() {
    let mut schedule = monthly_filter(Some(d(2024, 1, 1)));

    let err = schedule.record_service(NaiveDate::MAX).unwrap_err();
    assert!(matches!(err, ScheduleError::DateOutOfRange { .. }));
    assert_eq!(schedule.last_service_date(), Some(d(2024, 1, 1)));
    assert_eq!(schedule.next_service_date(), Some(d(2024, 1, 31)));
}
