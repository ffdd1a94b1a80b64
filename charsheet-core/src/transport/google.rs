//! HTTPS transport for Google Drive v3 and Sheets v4.

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    FileQuery, RemoteFile, SheetsTransport, TransportError, ValueInputOption, ValueRenderOption,
};
use crate::codec::{RawGrid, WritePayload};
use crate::range::GridRange;

pub const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4";

/// Response of `files.list`.
#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

/// Response of `spreadsheets.values.get`. `values` is absent for an empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Error envelope shared by Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Transport backed by the public Google REST APIs.
#[derive(Debug, Clone)]
pub struct GoogleTransport {
    client: reqwest::Client,
    drive_url: String,
    sheets_url: String,
}

impl Default for GoogleTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Use a preconfigured client, e.g. one with a request timeout.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            drive_url: DRIVE_API_URL.to_string(),
            sheets_url: SHEETS_API_URL.to_string(),
        }
    }

    /// Point at different API roots (proxies, emulators).
    pub fn with_base_urls(mut self, drive_url: &str, sheets_url: &str) -> Self {
        self.drive_url = drive_url.trim_end_matches('/').to_string();
        self.sheets_url = sheets_url.trim_end_matches('/').to_string();
        self
    }

    fn list_url(&self, query: &FileQuery) -> String {
        format!(
            "{}/files?q={}&fields={}&pageSize={}",
            self.drive_url,
            urlencoding::encode(&query.to_drive_query()),
            urlencoding::encode("files(id,name,mimeType)"),
            query.page_size
        )
    }

    fn copy_url(&self, source_id: &str) -> String {
        format!(
            "{}/files/{}/copy?fields={}",
            self.drive_url,
            urlencoding::encode(source_id),
            urlencoding::encode("id,name,mimeType")
        )
    }

    fn values_url(&self, spreadsheet_id: &str, range: &GridRange) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.sheets_url,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(&range.to_string())
        )
    }
}

#[async_trait]
impl SheetsTransport for GoogleTransport {
    async fn list_files(
        &self,
        token: &str,
        query: &FileQuery,
    ) -> Result<Vec<RemoteFile>, TransportError> {
        let response = self
            .client
            .get(self.list_url(query))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        let list: FileList = parse_json(response).await?;
        Ok(list.files)
    }

    async fn copy_file(
        &self,
        token: &str,
        source_id: &str,
        name: &str,
    ) -> Result<RemoteFile, TransportError> {
        let response = self
            .client
            .post(self.copy_url(source_id))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        parse_json(response).await
    }

    async fn read_range(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &GridRange,
        render: ValueRenderOption,
    ) -> Result<RawGrid, TransportError> {
        let url = format!(
            "{}?majorDimension=ROWS&valueRenderOption={}",
            self.values_url(spreadsheet_id, range),
            render.as_api_str()
        );

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        let values: ValueRange = parse_json(response).await?;
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn write_range(
        &self,
        token: &str,
        spreadsheet_id: &str,
        payload: &WritePayload,
        input: ValueInputOption,
    ) -> Result<(), TransportError> {
        let url = format!(
            "{}?valueInputOption={}",
            self.values_url(spreadsheet_id, &payload.range),
            input.as_api_str()
        );

        let response = self
            .client
            .put(url)
            .header("Authorization", format!("Bearer {}", token))
            .json(&write_body(payload))
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(())
    }
}

fn write_body(payload: &WritePayload) -> serde_json::Value {
    serde_json::json!({
        "range": payload.range.to_string(),
        "majorDimension": "ROWS",
        "values": payload.values,
    })
}

async fn parse_json<T>(response: reqwest::Response) -> Result<T, TransportError>
where
    T: serde::de::DeserializeOwned,
{
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| TransportError::network(format!("Invalid response body: {}", e)))
}

async fn error_from(response: reqwest::Response) -> TransportError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    TransportError::http(status.as_u16(), error_message(&body, status))
}

/// Message from a Google error envelope, falling back to the raw body.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}

/// Sheets returns strings for formatted values but numbers and booleans
/// for unformatted ones.
fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => String::from(if b { "TRUE" } else { "FALSE" }),
        other => other.to_string(),
    }
}
