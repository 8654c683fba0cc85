#![cfg(feature = "sqlite")]

use chrono::{NaiveDate, TimeZone, Utc};
use reconcile_core::reconcile::record_run;
use reconcile_core::{
    Job, MaintenanceSchedule, NewTask, ReconciliationResult, ScheduleRepository, SettingScope,
    SettingsStore, SqliteStore, TaskRepository, WorkspaceRepository,
};
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn data_survives_reopening_the_file() {
    let file = NamedTempFile::new().unwrap();
    let schedule_id = {
        let store = SqliteStore::open(file.path()).expect("open store");
        let workspace = store.insert_workspace("Depot", Some(1)).unwrap();
        let equipment = store.insert_equipment(workspace.id, "Lift", None, None).unwrap();
        store
            .insert_schedule(&MaintenanceSchedule::new(0, equipment.id, "Hydraulics", 60, 10, Some(d(2024, 1, 1))).unwrap())
            .unwrap()
            .id
    };

    let store = SqliteStore::open(file.path()).expect("reopen store");
    let schedule = store.find_schedule(schedule_id).unwrap().expect("schedule exists");
    assert_eq!(schedule.title, "Hydraulics");
    assert_eq!(schedule.next_service_date(), Some(d(2024, 3, 1)));
    assert_eq!(schedule.task_due_date(), Some(d(2024, 2, 20)));
}

#[test]
fn due_candidates_are_filtered_by_task_due_date() {
    let store = SqliteStore::open_in_memory().unwrap();
    let workspace = store.insert_workspace("Depot", None).unwrap();
    let equipment = store.insert_equipment(workspace.id, "Lift", None, None).unwrap();
    let due = store
        .insert_schedule(&MaintenanceSchedule::new(0, equipment.id, "Weekly", 7, 0, Some(d(2024, 1, 1))).unwrap())
        .unwrap();
    store
        .insert_schedule(&MaintenanceSchedule::new(0, equipment.id, "Yearly", 365, 0, Some(d(2024, 1, 1))).unwrap())
        .unwrap();
    store
        .insert_schedule(&MaintenanceSchedule::new(0, equipment.id, "Never serviced", 30, 0, None).unwrap())
        .unwrap();

    let candidates = store.find_due_candidates(d(2024, 1, 8)).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].as_ref().unwrap().id, due.id);
}

#[test]
fn saving_a_schedule_persists_recomputed_dates() {
    let store = SqliteStore::open_in_memory().unwrap();
    let workspace = store.insert_workspace("Depot", None).unwrap();
    let equipment = store.insert_equipment(workspace.id, "Lift", None, None).unwrap();
    let mut schedule = store
        .insert_schedule(&MaintenanceSchedule::new(0, equipment.id, "Weekly", 7, 2, Some(d(2024, 1, 1))).unwrap())
        .unwrap();

    assert!(schedule.record_service(d(2024, 1, 9)).unwrap());
    store.save_schedule(&schedule).unwrap();

    let stored = store.find_schedule(schedule.id).unwrap().unwrap();
    assert_eq!(stored, schedule);
    assert!(store.find_due_candidates(d(2024, 1, 13)).unwrap().is_empty());
    assert_eq!(store.find_due_candidates(d(2024, 1, 14)).unwrap().len(), 1);
}

#[test]
fn open_task_and_latest_completion_queries() {
    let store = SqliteStore::open_in_memory().unwrap();
    let workspace = store.insert_workspace("Depot", None).unwrap();
    let project = store.insert_project(workspace.id, "Fleet").unwrap();
    let stage = store.insert_stage(workspace.id, "Queue", 0).unwrap();
    let equipment = store.insert_equipment(workspace.id, "Van", Some(project.id), None).unwrap();
    let schedule = store
        .insert_schedule(&MaintenanceSchedule::new(0, equipment.id, "Tyres", 90, 0, Some(d(2024, 1, 1))).unwrap())
        .unwrap();

    assert!(!store.has_open_for_schedule(schedule.id).unwrap());
    assert_eq!(store.latest_completion_for_schedule(schedule.id).unwrap(), None);

    let mut new_task = NewTask::new(workspace.id, project.id, stage.id, "Tyres");
    new_task.maintenance_schedule_id = Some(schedule.id);
    let mut task = store.create_task(new_task).unwrap();
    assert!(store.has_open_for_schedule(schedule.id).unwrap());

    task.progress = 100;
    task.completed_on = Some(d(2024, 3, 28));
    store.update_task(&task).unwrap();
    assert!(!store.has_open_for_schedule(schedule.id).unwrap());
    assert_eq!(
        store.latest_completion_for_schedule(schedule.id).unwrap(),
        Some(d(2024, 3, 28))
    );
    assert_eq!(store.find_task(task.id).unwrap(), Some(task));
}

#[test]
fn first_stage_is_lowest_position() {
    let store = SqliteStore::open_in_memory().unwrap();
    let workspace = store.insert_workspace("Depot", None).unwrap();
    store.insert_stage(workspace.id, "Done", 3).unwrap();
    let todo = store.insert_stage(workspace.id, "Todo", 1).unwrap();

    assert_eq!(store.first_stage(workspace.id).unwrap(), Some(todo));
    assert_eq!(store.first_stage(workspace.id + 1).unwrap(), None);
}

#[test]
fn settings_are_scoped_and_overwritten() {
    let store = SqliteStore::open_in_memory().unwrap();
    let global = SettingScope::Global;
    let scoped = SettingScope::Workspace(4);

    store.set("locale", "en", &global).unwrap();
    store.set("locale", "fr", &scoped).unwrap();
    store.set("locale", "de", &scoped).unwrap();

    assert_eq!(store.get("locale", &global).unwrap().as_deref(), Some("en"));
    assert_eq!(store.get("locale", &scoped).unwrap().as_deref(), Some("de"));
    assert_eq!(store.get("missing", &global).unwrap(), None);
}

#[test]
fn setting_scope_round_trips_through_text() {
    assert_eq!(SettingScope::parse("global").unwrap(), SettingScope::Global);
    assert_eq!(SettingScope::parse("workspace:12").unwrap(), SettingScope::Workspace(12));
    assert_eq!(SettingScope::Workspace(12).as_key(), "workspace:12");
    assert!(SettingScope::parse("team:3").is_err());
}

#[test]
fn record_run_stamps_time_and_result() {
    let store = SqliteStore::open_in_memory().unwrap();
    let ran_at = Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap();
    let result = ReconciliationResult {
        created: 2,
        updated: 1,
        skipped: 0,
        errors: vec!["row 4: missing task title".into()],
    };

    record_run(&store, Job::SheetTasks, &SettingScope::Workspace(3), ran_at, &result).unwrap();

    let scope = SettingScope::Workspace(3);
    assert_eq!(
        store.get("sheet_sync.last_run_at", &scope).unwrap().as_deref(),
        Some("2024-05-01T06:30:00+00:00")
    );
    let stored: ReconciliationResult =
        serde_json::from_str(&store.get("sheet_sync.last_result", &scope).unwrap().unwrap()).unwrap();
    assert_eq!(stored, result);
}
