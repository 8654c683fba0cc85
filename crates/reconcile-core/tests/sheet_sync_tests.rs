#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use reconcile_core::reconcile::ROUTES_SETTING;
use reconcile_core::{
    Catalog, ExternalRow, Project, ProjectRoutes, SettingScope, SettingsStore, SheetTaskSync,
    SqliteStore, StoreError, Workspace,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const TODAY: (i32, u32, u32) = (2024, 4, 2);

struct Fixture {
    store: SqliteStore,
    workspace: Workspace,
    north: Project,
    general: Project,
}

fn fixture() -> Fixture {
    let store = SqliteStore::open_in_memory().unwrap();
    let workspace = store.insert_workspace("Retail", Some(11)).unwrap();
    let north = store.insert_project(workspace.id, "North Store").unwrap();
    let general = store.insert_project(workspace.id, "General").unwrap();
    store.insert_stage(workspace.id, "To do", 0).unwrap();

    let mut routes = ProjectRoutes::default();
    routes.insert("North", "North Store");
    routes.insert("East", "East Store");
    store
        .set(ROUTES_SETTING, &routes.to_json(), &SettingScope::Workspace(workspace.id))
        .unwrap();

    Fixture {
        store,
        workspace,
        north,
        general,
    }
}

fn row(number: usize, cells: &[(&str, &str)]) -> ExternalRow {
    cells
        .iter()
        .fold(ExternalRow::new(number), |row, (header, value)| row.with_cell(header, *value))
}

fn run(
    fx: &Fixture,
    catalog: &Catalog,
    rows: Vec<ExternalRow>,
    default_project: Option<i64>,
) -> reconcile_core::ReconciliationResult {
    let (y, m, day) = TODAY;
    SheetTaskSync::new(&fx.store, &fx.store, &fx.store, catalog, d(y, m, day))
        .sync_to_project(rows, fx.workspace.id, default_project, None)
        .unwrap()
}

#[test]
fn routed_branch_creates_task_in_mapped_project() {
    let fx = fixture();
    let catalog = Catalog::default();
    let rows = vec![row(
        2,
        &[("ID", "T-1"), ("Title", "Restock shelves"), ("Branch", " North "), ("Due Date", "2024-04-10")],
    )];

    let result = run(&fx, &catalog, rows, None);
    assert_eq!(result.created, 1);
    assert!(result.errors.is_empty());

    let tasks = fx.store.tasks_for_workspace(fx.workspace.id).unwrap();
    assert_eq!(tasks[0].project_id, fx.north.id);
    assert_eq!(tasks[0].due_date, Some(d(2024, 4, 10)));
    assert_eq!(tasks[0].external_ref.as_deref(), Some("id:T-1"));
    assert_eq!(tasks[0].created_by, Some(11));
    assert_eq!(tasks[0].description.as_deref(), Some("Imported from spreadsheet row 2."));
}

#[test]
fn unmatched_branch_without_default_is_a_row_error() {
    let fx = fixture();
    let catalog = Catalog::default();
    let rows = vec![
        row(2, &[("Title", "Count till"), ("Branch", "South")]),
        row(3, &[("Title", "Clean windows"), ("Branch", "North")]),
    ];

    let result = run(&fx, &catalog, rows, None);
    assert_eq!(result.created, 1);
    assert_eq!(result.errors, vec!["row 2: no project mapping for branch 'South'".to_string()]);
}

#[test]
fn unmatched_branch_falls_back_to_default_project() {
    let fx = fixture();
    let catalog = Catalog::default();
    let rows = vec![
        row(2, &[("Title", "Count till"), ("Branch", "South")]),
        row(3, &[("Title", "Order supplies")]),
    ];

    let result = run(&fx, &catalog, rows, Some(fx.general.id));
    assert_eq!(result.created, 2);
    let tasks = fx.store.tasks_for_workspace(fx.workspace.id).unwrap();
    assert!(tasks.iter().all(|task| task.project_id == fx.general.id));
}

#[test]
fn route_to_unknown_project_is_a_row_error() {
    let fx = fixture();
    let catalog = Catalog::default();
    let rows = vec![row(5, &[("Title", "Fix door"), ("Branch", "East")])];

    let result = run(&fx, &catalog, rows, Some(fx.general.id));
    assert_eq!(result.created, 0);
    assert!(result.errors[0].starts_with("row 5: project 'East Store' not found"));
}

#[test]
fn second_run_updates_changed_rows_and_skips_unchanged() {
    let fx = fixture();
    let catalog = Catalog::default();
    let first = vec![
        row(2, &[("ID", "A"), ("Title", "Paint wall"), ("Branch", "North"), ("Progress", "0")]),
        row(3, &[("ID", "B"), ("Title", "Fix sign"), ("Branch", "North"), ("Progress", "10%")]),
    ];
    assert_eq!(run(&fx, &catalog, first, None).created, 2);

    let second = vec![
        row(2, &[("ID", "A"), ("Title", "Paint wall"), ("Branch", "North"), ("Progress", "0")]),
        row(3, &[("ID", "B"), ("Title", "Fix sign"), ("Branch", "North"), ("Progress", "Done")]),
    ];
    let result = run(&fx, &catalog, second, None);
    assert_eq!(result.created, 0);
    assert_eq!(result.updated, 1);
    assert_eq!(result.skipped, 1);

    let tasks = fx.store.tasks_for_workspace(fx.workspace.id).unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].progress, 100);
    assert_eq!(tasks[1].completed_on, Some(d(2024, 4, 2)));
}

#[test]
fn rows_without_id_match_on_title_and_due_date() {
    let fx = fixture();
    let catalog = Catalog::default();
    let rows = || {
        vec![row(
            2,
            &[("Task", "Deep clean"), ("Due", "15/04/2024"), ("Site", "North"), ("Notes", "Use the blue mop")],
        )]
    };

    assert_eq!(run(&fx, &catalog, rows(), None).created, 1);
    let again = run(&fx, &catalog, rows(), None);
    assert_eq!(again.created, 0);
    assert_eq!(again.skipped, 1);

    let task = fx.store.tasks_for_workspace(fx.workspace.id).unwrap().remove(0);
    assert_eq!(task.external_ref.as_deref(), Some("Deep clean|2024-04-15"));
    assert_eq!(task.description.as_deref(), Some("Use the blue mop"));
}

#[test]
fn invalid_cells_are_reported_with_row_numbers() {
    let fx = fixture();
    let catalog = Catalog::default();
    let rows = vec![
        row(2, &[("Branch", "North")]),
        row(3, &[("Title", "Audit"), ("Branch", "North"), ("Due Date", "next week")]),
        row(4, &[("Title", "Audit"), ("Branch", "North"), ("Progress", "soon")]),
    ];

    let result = run(&fx, &catalog, rows, None);
    assert_eq!(result.created, 0);
    assert_eq!(
        result.errors,
        vec![
            "row 2: missing task title".to_string(),
            "row 3: invalid date 'next week'".to_string(),
            "row 4: invalid progress 'soon'".to_string(),
        ]
    );
}

#[test]
fn missing_workspace_aborts_the_sync() {
    let fx = fixture();
    let catalog = Catalog::default();
    let err = SheetTaskSync::new(&fx.store, &fx.store, &fx.store, &catalog, d(2024, 4, 2))
        .sync_to_project(Vec::new(), 999, None, None)
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "workspace", id: 999 }));
}

#[test]
fn default_project_from_another_workspace_is_rejected() {
    let fx = fixture();
    let other = fx.store.insert_workspace("Other", None).unwrap();
    let foreign = fx.store.insert_project(other.id, "Elsewhere").unwrap();
    let catalog = Catalog::default();

    let err = SheetTaskSync::new(&fx.store, &fx.store, &fx.store, &catalog, d(2024, 4, 2))
        .sync_to_project(Vec::new(), fx.workspace.id, Some(foreign.id), None)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

#[test]
fn explicit_user_overrides_owner_attribution() {
    let fx = fixture();
    let catalog = Catalog::default();
    SheetTaskSync::new(&fx.store, &fx.store, &fx.store, &catalog, d(2024, 4, 2))
        .sync_to_project(
            vec![row(2, &[("Title", "Greet customers"), ("Branch", "North")])],
            fx.workspace.id,
            None,
            Some(5),
        )
        .unwrap();
    let task = fx.store.tasks_for_workspace(fx.workspace.id).unwrap().remove(0);
    assert_eq!(task.created_by, Some(5));
}
