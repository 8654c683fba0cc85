use reconcile_core::source::rows_from_grid;
use reconcile_core::{ExternalRow, RowSource, SourceError, SourceResult};
use reqwest::StatusCode;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::{AuthError, ServiceAccountKey, TokenSource};
use crate::config::SheetsConfig;

/// Read-only client for the Sheets v4 `values` endpoint.
pub struct GoogleSheetsSource {
    http: reqwest::blocking::Client,
    api_base: Url,
    tokens: TokenSource,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsSource {
    pub fn new(api_base: &str, tokens: TokenSource, timeout: std::time::Duration) -> SourceResult<Self> {
        let api_base = Url::parse(api_base)
            .map_err(|err| SourceError::InvalidData(format!("invalid api base '{api_base}': {err}")))?;
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SourceError::Http(err.to_string()))?;
        Ok(Self {
            http,
            api_base,
            tokens,
        })
    }

    /// Builds a client from configuration. A pre-issued access token wins over
    /// a credentials file; with neither the call fails.
    pub fn from_config(config: &SheetsConfig) -> SourceResult<Self> {
        let tokens = if let Some(token) = &config.access_token {
            TokenSource::Static(token.clone())
        } else if let Some(path) = &config.credentials_path {
            let key = ServiceAccountKey::from_file(path).map_err(credentials_error)?;
            TokenSource::service_account(key)
        } else {
            return Err(SourceError::Credentials(
                "set GOOGLE_APPLICATION_CREDENTIALS to a service-account key file or GOOGLE_ACCESS_TOKEN"
                    .to_string(),
            ));
        };
        Self::new(&config.api_base, tokens, config.timeout)
    }

    pub fn principal(&self) -> Option<&str> {
        self.tokens.principal()
    }

    fn values_url(&self, spreadsheet_id: &str, sheet_name: &str) -> SourceResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::InvalidData(format!("api base {} cannot hold a path", self.api_base)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", sheet_name]);
        url.query_pairs_mut().append_pair("majorDimension", "ROWS");
        Ok(url)
    }
}

impl RowSource for GoogleSheetsSource {
    fn fetch(&self, source_id: &str, sheet_name: &str) -> SourceResult<Vec<ExternalRow>> {
        let url = self.values_url(source_id, sheet_name)?;
        let token = self.tokens.access_token(&self.http).map_err(credentials_error)?;

        debug!(spreadsheet = source_id, sheet = sheet_name, "fetching sheet values");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .map_err(|err| SourceError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST if body.contains("Unable to parse range") => {
                    SourceError::SheetNotFound(sheet_name.to_string())
                }
                StatusCode::NOT_FOUND => {
                    SourceError::Http(format!("spreadsheet {source_id} not found"))
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Credentials(
                    format!("access to spreadsheet {source_id} denied (HTTP {status})"),
                ),
                _ => SourceError::Http(format!("HTTP {status}: {body}")),
            });
        }

        let range: ValueRange = response
            .json()
            .map_err(|err| SourceError::InvalidData(format!("unexpected sheet payload: {err}")))?;
        let grid = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        let rows = rows_from_grid(grid);
        info!(spreadsheet = source_id, sheet = sheet_name, rows = rows.len(), "fetched sheet");
        Ok(rows)
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn credentials_error(err: AuthError) -> SourceError {
    SourceError::Credentials(err.to_string())
}
