use mockito::{Matcher, Server};
use reconcile_core::{RowSource, SourceError};
use reconcile_sheets::{GoogleSheetsSource, ServiceAccountKey, SheetsConfig, TokenSource};
use std::time::Duration;
use tempfile::NamedTempFile;

const TEST_KEY: &str = include_str!("fixtures/test_service_account_key.pem");

const VALUES_BODY: &str = r#"{
    "range": "Tasks!A1:E4",
    "majorDimension": "ROWS",
    "values": [
        ["ID", "Title", "Branch", "Due Date", "Progress"],
        ["T-1", "Replace filters", "North", "2024-02-01", "0"],
        [],
        ["T-2", "Inspect roof", "South", "2024-02-15", 40]
    ]
}"#;

fn static_source(server: &Server) -> GoogleSheetsSource {
    GoogleSheetsSource::new(
        &server.url(),
        TokenSource::Static("test-token".to_string()),
        Duration::from_secs(5),
    )
    .expect("build source")
}

#[test]
fn fetch_normalizes_rows_and_drops_blank_lines() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/v4/spreadsheets/sheet-123/values/Tasks")
        .match_query(Matcher::UrlEncoded("majorDimension".into(), "ROWS".into()))
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(VALUES_BODY)
        .expect(1)
        .create();

    let rows = static_source(&server).fetch("sheet-123", "Tasks").unwrap();
    mock.assert();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].row_number, 2);
    assert_eq!(rows[0].get(&["title"]), Some("Replace filters"));
    assert_eq!(rows[1].row_number, 4);
    assert_eq!(rows[1].get(&["branch"]), Some("South"));
    assert_eq!(rows[1].get(&["progress"]), Some("40"));
}

#[test]
fn sheet_names_with_spaces_are_path_encoded() {
    let mut server = Server::new();
    let mock = server
        .mock(
            "GET",
            Matcher::Regex(r"^/v4/spreadsheets/abc/values/Work(%20| )Orders".to_string()),
        )
        .with_status(200)
        .with_body(r#"{"range": "'Work Orders'!A1:A1", "majorDimension": "ROWS"}"#)
        .create();

    let rows = static_source(&server).fetch("abc", "Work Orders").unwrap();
    mock.assert();
    assert!(rows.is_empty());
}

#[test]
fn unknown_sheet_maps_to_sheet_not_found() {
    let mut server = Server::new();
    server
        .mock("GET", "/v4/spreadsheets/abc/values/Missing")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error": {"code": 400, "message": "Unable to parse range: Missing"}}"#)
        .create();

    let err = static_source(&server).fetch("abc", "Missing").unwrap_err();
    assert!(matches!(err, SourceError::SheetNotFound(name) if name == "Missing"));
}

#[test]
fn forbidden_response_is_a_credentials_error() {
    let mut server = Server::new();
    server
        .mock("GET", "/v4/spreadsheets/private/values/Tasks")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"error": {"code": 403, "status": "PERMISSION_DENIED"}}"#)
        .create();

    let err = static_source(&server).fetch("private", "Tasks").unwrap_err();
    assert!(matches!(err, SourceError::Credentials(_)), "got {err:?}");
}

#[test]
fn service_account_token_is_exchanged_once_and_reused() {
    let mut server = Server::new();
    let token_mock = server
        .mock("POST", "/token")
        .match_body(Matcher::Regex(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token": "sa-token", "expires_in": 3600, "token_type": "Bearer"}"#)
        .expect(1)
        .create();
    let values_mock = server
        .mock("GET", "/v4/spreadsheets/sheet-123/values/Tasks")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer sa-token")
        .with_status(200)
        .with_body(VALUES_BODY)
        .expect(2)
        .create();

    let key_file = NamedTempFile::new().unwrap();
    let key_json = serde_json::json!({
        "type": "service_account",
        "client_email": "sync@example-project.iam.gserviceaccount.com",
        "private_key": TEST_KEY,
        "token_uri": format!("{}/token", server.url()),
    });
    std::fs::write(key_file.path(), key_json.to_string()).unwrap();

    let config = SheetsConfig {
        api_base: server.url(),
        credentials_path: Some(key_file.path().to_path_buf()),
        access_token: None,
        timeout: Duration::from_secs(5),
    };
    let source = GoogleSheetsSource::from_config(&config).unwrap();
    assert_eq!(
        source.principal(),
        Some("sync@example-project.iam.gserviceaccount.com")
    );

    source.fetch("sheet-123", "Tasks").unwrap();
    source.fetch("sheet-123", "Tasks").unwrap();

    token_mock.assert();
    values_mock.assert();
}

#[test]
fn missing_credentials_are_rejected_up_front() {
    let config = SheetsConfig::default();
    assert!(!config.has_credentials());
    let err = GoogleSheetsSource::from_config(&config).err().expect("should fail");
    assert!(matches!(err, SourceError::Credentials(_)));
}

#[test]
fn malformed_key_file_reports_path() {
    let key_file = NamedTempFile::new().unwrap();
    std::fs::write(key_file.path(), "{\"not\": \"a key\"}").unwrap();

    let err = ServiceAccountKey::from_file(key_file.path()).unwrap_err();
    assert!(err.to_string().contains(&key_file.path().display().to_string()));
}
