//! REST backend for the hosted Sheets v4 API.

use std::path::Path;

use reqwest::{Client, RequestBuilder};
use runsheet_core::{CellValue, SheetRange};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use urlencoding::encode;

use super::auth::{Authenticator, ServiceAccountAuth, ServiceAccountKey};
use super::{ApiResult, BatchReply, BatchRequest, Rows, SheetsApi, Spreadsheet};
use crate::error::{ApiError, Result};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

const SPREADSHEET_FIELDS: &str = "spreadsheetId,properties.title,sheets.properties,spreadsheetUrl";

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: String,
    major_dimension: &'static str,
    values: &'a [Vec<CellValue>],
}

#[derive(Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Formatted values come back as strings, but be lenient with other scalars
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Prefer the service's own error message over the raw body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.to_string(),
    }
}

/// Client for the hosted spreadsheet service
pub struct GoogleSheetsClient {
    http: Client,
    auth: Authenticator,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(http: Client, auth: Authenticator) -> Self {
        Self {
            http,
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Authenticate with a service-account key file
    pub fn from_service_account_file(path: &Path) -> Result<Self> {
        let http = Client::new();
        let key = ServiceAccountKey::from_file(path)?;
        let auth = ServiceAccountAuth::new(key, http.clone())?;
        tracing::info!("Sheets client initialized for {}", auth.client_email());
        Ok(Self::new(http, Authenticator::ServiceAccount(auth)))
    }

    /// Authenticate with an already issued bearer token
    pub fn with_bearer_token(token: impl Into<String>) -> Self {
        Self::new(Client::new(), Authenticator::BearerToken(token.into()))
    }

    /// Point the client at another endpoint, e.g. a local emulator
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str) -> String {
        format!("{}/spreadsheets/{}", self.base_url, encode(spreadsheet_id))
    }

    fn values_url(&self, spreadsheet_id: &str, range: &SheetRange) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(spreadsheet_id),
            encode(&range.to_string())
        )
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let token = self.auth.token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::http(status.as_u16(), error_message(&body)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl SheetsApi for GoogleSheetsClient {
    async fn create_spreadsheet(&self, title: &str) -> ApiResult<Spreadsheet> {
        let url = format!("{}/spreadsheets", self.base_url);
        let body = json!({ "properties": { "title": title } });
        self.send(self.http.post(url).json(&body)).await
    }

    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> ApiResult<Spreadsheet> {
        let request = self
            .http
            .get(self.spreadsheet_url(spreadsheet_id))
            .query(&[("fields", SPREADSHEET_FIELDS)]);
        self.send(request).await
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &SheetRange) -> ApiResult<Rows> {
        let request = self.http.get(self.values_url(spreadsheet_id, range));
        let result: ValueRange = self.send(request).await?;
        Ok(result
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: &[Vec<CellValue>],
    ) -> ApiResult<()> {
        let body = ValueRangeBody {
            range: range.to_string(),
            major_dimension: "ROWS",
            values,
        };
        let request = self
            .http
            .put(self.values_url(spreadsheet_id, range))
            .query(&[("valueInputOption", "RAW")])
            .json(&body);
        self.send::<IgnoredAny>(request).await?;
        Ok(())
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: &[Vec<CellValue>],
    ) -> ApiResult<()> {
        let body = ValueRangeBody {
            range: range.to_string(),
            major_dimension: "ROWS",
            values,
        };
        let url = format!("{}:append", self.values_url(spreadsheet_id, range));
        let request = self
            .http
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&body);
        self.send::<IgnoredAny>(request).await?;
        Ok(())
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: &[BatchRequest],
    ) -> ApiResult<Vec<BatchReply>> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url(spreadsheet_id));
        let body = json!({ "requests": requests });
        let response: BatchUpdateResponse = self.send(self.http.post(url).json(&body)).await?;
        Ok(response.replies)
    }
}
