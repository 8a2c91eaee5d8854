//! Remote sheet transport.
//!
//! `SheetClient` is the seam between the sync engine and the spreadsheet
//! service. The HTTP implementation talks to a plain JSON row API with a
//! bearer token; tests drive the engine through an in-memory client instead.

use std::time::Duration;

use anyhow::anyhow;
use serde::Deserialize;
use serde_json::json;

use crate::errors::{ConflictKind, SyncError};

/// Row-level operations the sync engine needs from the remote store.
///
/// Row indices are zero-based over data rows; the header row is the
/// implementation's concern and never visible here.
pub trait SheetClient {
    /// Fetch all data rows, lock column included.
    fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SyncError>;

    /// Overwrite a contiguous run of rows starting at `start_row`. Only the
    /// leading `cells.len()` columns of each row are written.
    fn update_rows(&self, start_row: usize, rows: &[Vec<String>]) -> Result<(), SyncError>;

    /// Append rows after the current last data row.
    fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), SyncError>;

    /// Delete one row, shifting the rows below it up.
    fn delete_row(&self, row: usize) -> Result<(), SyncError>;

    /// Write a single cell, used for lock tokens.
    fn write_cell(&self, row: usize, col: usize, value: &str) -> Result<(), SyncError>;
}

impl<T: SheetClient + ?Sized> SheetClient for &T {
    fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SyncError> {
        (**self).fetch_rows()
    }

    fn update_rows(&self, start_row: usize, rows: &[Vec<String>]) -> Result<(), SyncError> {
        (**self).update_rows(start_row, rows)
    }

    fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), SyncError> {
        (**self).append_rows(rows)
    }

    fn delete_row(&self, row: usize) -> Result<(), SyncError> {
        (**self).delete_row(row)
    }

    fn write_cell(&self, row: usize, col: usize, value: &str) -> Result<(), SyncError> {
        (**self).write_cell(row, col, value)
    }
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    rows: Vec<Vec<String>>,
}

/// HTTP implementation over a JSON sheet API.
pub struct HttpSheetClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    sheet_id: String,
    token: String,
}

impl HttpSheetClient {
    pub fn new(endpoint: &str, sheet_id: &str, token: &str) -> Result<Self, SyncError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SyncError::Initialization(format!("HTTP client: {}", err)))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            sheet_id: sheet_id.to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, action: &str) -> String {
        format!("{}/sheets/{}/{}", self.endpoint, self.sheet_id, action)
    }

    fn post(&self, action: &str, body: serde_json::Value) -> Result<(), SyncError> {
        let response = self
            .client
            .post(self.url(action))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(classify_transport)?;
        check_status(response).map(|_| ())
    }
}

impl SheetClient for HttpSheetClient {
    fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SyncError> {
        let response = self
            .client
            .get(self.url("values"))
            .bearer_auth(&self.token)
            .send()
            .map_err(classify_transport)?;
        let response = check_status(response)?;
        let values: ValuesResponse = response
            .json()
            .map_err(|err| SyncError::Unknown(anyhow!("Malformed values response: {}", err)))?;
        // Drop the header row; callers only see data rows.
        Ok(values.rows.into_iter().skip(1).collect())
    }

    fn update_rows(&self, start_row: usize, rows: &[Vec<String>]) -> Result<(), SyncError> {
        self.post("values:update", json!({ "startRow": start_row, "rows": rows }))
    }

    fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), SyncError> {
        self.post("values:append", json!({ "rows": rows }))
    }

    fn delete_row(&self, row: usize) -> Result<(), SyncError> {
        self.post("rows:delete", json!({ "row": row }))
    }

    fn write_cell(&self, row: usize, col: usize, value: &str) -> Result<(), SyncError> {
        self.post(
            "cells:update",
            json!({ "row": row, "col": col, "value": value }),
        )
    }
}

fn classify_transport(err: reqwest::Error) -> SyncError {
    if let Some(status) = err.status() {
        return classify_status(status.as_u16(), err.to_string());
    }
    SyncError::Api {
        status: 0,
        message: format!("transport failure: {}", err),
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(classify_status(status.as_u16(), message))
}

fn classify_status(status: u16, message: String) -> SyncError {
    match status {
        401 | 403 => SyncError::Authentication(message),
        409 => SyncError::Concurrency {
            kind: ConflictKind::Version,
            message,
        },
        423 => SyncError::Concurrency {
            kind: ConflictKind::Lock,
            message,
        },
        429 => SyncError::RateLimited(message),
        _ => SyncError::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use crate::remote::sheet::*;

    #[test]
    fn test_classify_status_taxonomy() {
        assert!(matches!(
            classify_status(401, String::new()),
            SyncError::Authentication(_)
        ));
        assert!(matches!(
            classify_status(403, String::new()),
            SyncError::Authentication(_)
        ));
        assert!(matches!(
            classify_status(409, String::new()),
            SyncError::Concurrency {
                kind: ConflictKind::Version,
                ..
            }
        ));
        assert!(matches!(
            classify_status(423, String::new()),
            SyncError::Concurrency {
                kind: ConflictKind::Lock,
                ..
            }
        ));
        assert!(matches!(
            classify_status(429, String::new()),
            SyncError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(500, String::new()),
            SyncError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_url_building() {
        let client = HttpSheetClient::new("https://api.example.com/", "doc1", "tok").unwrap();
        assert_eq!(
            client.url("values"),
            "https://api.example.com/sheets/doc1/values"
        );
    }
}
