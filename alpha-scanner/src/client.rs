//! Google Drive / Sheets API client
//!
//! Implements the spreadsheet service against:
//! - Drive v3 file search (find a spreadsheet by title)
//! - Sheets v4 metadata (list worksheets)
//! - Sheets v4 values (read a whole worksheet)

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::auth::ServiceAccountAuth;
use crate::config::Credentials;
use crate::error::{Result, ScanError};
use crate::sheets::{Records, Spreadsheet, SpreadsheetService, Worksheet};
use crate::types::Cell;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Google Sheets client authenticated as a service account.
///
/// The credential bundle is parsed on the first request, so an unusable
/// bundle fails that request instead of the process.
pub struct GoogleSheetsClient {
    credentials: Credentials,
    auth: OnceCell<ServiceAccountAuth>,
    http: reqwest::Client,
}

/// File listing from Drive
#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

/// Spreadsheet metadata, limited to sheet properties
#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// Cell values of a range, row-major
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl GoogleSheetsClient {
    /// Create client; every request times out after `timeout`
    pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            credentials: credentials.clone(),
            auth: OnceCell::new(),
            http,
        })
    }

    /// Auth handler, built from the credential bundle on first use.
    /// A failed build is not kept; the next request tries again.
    async fn auth(&self) -> Result<&ServiceAccountAuth> {
        self.auth
            .get_or_try_init(|| async {
                let auth = ServiceAccountAuth::from_credentials(&self.credentials, self.http.clone())
                    .inspect_err(|e| warn!("Service-account credentials unusable: {}", e))?;
                debug!("Sheets client ready for {}", auth.client_email());
                Ok::<_, ScanError>(auth)
            })
            .await
    }

    /// Perform GET request with authentication
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T> {
        let token = self.auth().await?.access_token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        Self::handle_response(response, what).await
    }

    /// Handle API response, checking for errors
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let status = response.status();

        if status == 404 {
            return Err(ScanError::NotFound(what.to_string()));
        }

        if status == 429 {
            // Rate limited
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ScanError::Connection(format!(
                "Rate limited reading {what}, retry after {retry_after}s"
            )));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(ScanError::Connection(format!(
                "HTTP {status} reading {what}: {error_text}"
            )));
        }

        response.json().await.map_err(ScanError::from)
    }
}

#[async_trait]
impl SpreadsheetService for GoogleSheetsClient {
    async fn open(&self, title: &str) -> Result<Spreadsheet> {
        let what = format!("Spreadsheet '{title}'");
        let query = drive_query(title);
        let list: DriveFileList = self
            .get(
                DRIVE_FILES_URL,
                &[
                    ("q", query.as_str()),
                    ("fields", "files(id,name)"),
                    ("supportsAllDrives", "true"),
                    ("includeItemsFromAllDrives", "true"),
                ],
                &what,
            )
            .await?;

        let file = list.files.into_iter().next().ok_or(ScanError::NotFound(what))?;
        debug!("Opened spreadsheet '{}' ({})", file.name, file.id);
        Ok(Spreadsheet {
            id: file.id,
            title: file.name,
        })
    }

    async fn worksheet(&self, spreadsheet: &Spreadsheet, name: &str) -> Result<Worksheet> {
        let what = format!("Worksheet '{name}'");
        let url = format!("{SHEETS_URL}/{}", urlencoding::encode(&spreadsheet.id));
        let metadata: SpreadsheetMetadata = self
            .get(&url, &[("fields", "sheets.properties.title")], &what)
            .await?;

        metadata
            .sheets
            .into_iter()
            .find(|sheet| sheet.properties.title == name)
            .map(|sheet| Worksheet {
                spreadsheet_id: spreadsheet.id.clone(),
                title: sheet.properties.title,
            })
            .ok_or(ScanError::NotFound(what))
    }

    async fn get_all_records(&self, worksheet: &Worksheet) -> Result<Records> {
        let what = format!("Worksheet '{}'", worksheet.title);
        let url = format!(
            "{SHEETS_URL}/{}/values/{}",
            urlencoding::encode(&worksheet.spreadsheet_id),
            urlencoding::encode(&quote_sheet_name(&worksheet.title)),
        );
        let range: ValueRange = self
            .get(
                &url,
                &[
                    ("valueRenderOption", "UNFORMATTED_VALUE"),
                    ("majorDimension", "ROWS"),
                ],
                &what,
            )
            .await?;

        Ok(records_from_values(range.values))
    }
}

/// Drive search for a non-trashed spreadsheet with exactly this title
fn drive_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name = '{escaped}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false")
}

/// A1 range naming a whole sheet
fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// First row is the header; fully blank rows are dropped
fn records_from_values(values: Vec<Vec<serde_json::Value>>) -> Records {
    let mut rows = values.into_iter();
    let Some(header) = rows.next() else {
        return Records::default();
    };

    let header = header
        .iter()
        .map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => Cell::from_json(other).to_string(),
        })
        .collect();

    let rows = rows
        .map(|row| row.iter().map(Cell::from_json).collect::<Vec<_>>())
        .filter(|cells| !cells.iter().all(Cell::is_blank))
        .collect();

    Records { header, rows }
}
