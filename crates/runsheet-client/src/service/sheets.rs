use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use runsheet_core::{CellValue, HeaderRow, SheetRange};

use crate::api::{ApiResult, BatchRequest, GoogleSheetsClient, Rows, SheetsApi, Spreadsheet};
use crate::config::Config;
use crate::error::{ApiError, Result, SheetError};
use crate::retry::RetryPolicy;

/// Sheet access layer.
///
/// Every remote call goes through the retry policy, which retries transient
/// service failures only. Cloning is cheap; clones share the backend.
pub struct SheetService<A> {
    api: Arc<A>,
    retry: RetryPolicy,
    default_spreadsheet_id: Option<String>,
}

impl<A> Clone for SheetService<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            retry: self.retry,
            default_spreadsheet_id: self.default_spreadsheet_id.clone(),
        }
    }
}

impl SheetService<GoogleSheetsClient> {
    /// Connect to the hosted service using configured credentials.
    ///
    /// `credentials_path` takes precedence over the configured path.
    pub fn from_config(config: &Config, credentials_path: Option<&Path>) -> Result<Self> {
        let path = config.resolve_credentials_path(credentials_path)?;
        let client = GoogleSheetsClient::from_service_account_file(&path)
            .inspect_err(|e| tracing::error!("Failed to initialize service: {}", e))?;

        let mut service = Self::new(client).with_retry(RetryPolicy::from(&config.retry));
        service.default_spreadsheet_id = config.default_spreadsheet_id.clone();
        Ok(service)
    }
}

impl<A: SheetsApi> SheetService<A> {
    pub fn new(api: A) -> Self {
        Self::from_shared(Arc::new(api))
    }

    pub fn from_shared(api: Arc<A>) -> Self {
        Self {
            api,
            retry: RetryPolicy::default(),
            default_spreadsheet_id: None,
        }
    }

    /// Use a different retry policy for calls made through this service
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_default_spreadsheet_id(mut self, spreadsheet_id: impl Into<String>) -> Self {
        self.default_spreadsheet_id = Some(spreadsheet_id.into());
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn default_spreadsheet_id(&self) -> Option<&str> {
        self.default_spreadsheet_id.as_deref()
    }

    async fn call<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        Ok(self.retry.run(operation, op, ApiError::is_transient).await?)
    }

    /// Create a new spreadsheet and return its ID
    pub async fn create_spreadsheet(&self, title: &str) -> Result<String> {
        let spreadsheet = self
            .call("create_spreadsheet", || self.api.create_spreadsheet(title))
            .await
            .inspect_err(|e| tracing::error!("Failed to create spreadsheet: {}", e))?;

        tracing::info!(
            "Created spreadsheet: {} with ID: {}",
            title,
            spreadsheet.spreadsheet_id
        );
        Ok(spreadsheet.spreadsheet_id)
    }

    /// Get title and sheets of an existing spreadsheet
    pub async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<Spreadsheet> {
        let spreadsheet = self
            .call("get_spreadsheet", || self.api.get_spreadsheet(spreadsheet_id))
            .await
            .inspect_err(|e| tracing::error!("Failed to get spreadsheet: {}", e))?;

        tracing::info!("Retrieved spreadsheet with ID: {}", spreadsheet_id);
        Ok(spreadsheet)
    }

    /// Sheet names in tab order
    pub async fn get_sheet_names(&self, spreadsheet_id: &str) -> Result<Vec<String>> {
        let names = self.get_spreadsheet(spreadsheet_id).await?.sheet_names();
        tracing::info!("Retrieved sheet names: {:?}", names);
        Ok(names)
    }

    /// Add a sheet to an existing spreadsheet and return its sheet ID
    pub async fn create_sheet(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<i64> {
        let requests = [BatchRequest::add_sheet(sheet_name)];
        let replies = self
            .call("create_sheet", || self.api.batch_update(spreadsheet_id, &requests))
            .await
            .inspect_err(|e| tracing::error!("Failed to create sheet: {}", e))?;

        let sheet_id = replies
            .into_iter()
            .next()
            .and_then(|reply| reply.add_sheet)
            .map(|added| added.properties.sheet_id)
            .ok_or_else(|| ApiError::Decode("batch update returned no addSheet reply".into()))?;

        tracing::info!("Created new sheet '{}' with ID: {}", sheet_name, sheet_id);
        Ok(sheet_id)
    }

    /// Read an arbitrary range
    pub async fn read_range(&self, spreadsheet_id: &str, range: &SheetRange) -> Result<Rows> {
        tracing::info!("Reading range {} from spreadsheet {}", range, spreadsheet_id);
        self.call("read_range", || self.api.get_values(spreadsheet_id, range))
            .await
            .inspect_err(|e| tracing::error!("Failed to read range: {}", e))
    }

    /// Column names from row 1 (columns A-Z)
    pub async fn get_headers(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<HeaderRow> {
        let range = SheetRange::header(sheet_name);
        let rows = self
            .call("get_headers", || self.api.get_values(spreadsheet_id, &range))
            .await
            .inspect_err(|e| tracing::error!("Failed to get headers: {}", e))?;

        match rows.into_iter().next() {
            Some(names) if !names.is_empty() => {
                tracing::info!("Retrieved headers from {}: {:?}", sheet_name, names);
                Ok(HeaderRow::new(names))
            }
            _ => {
                let e = SheetError::SheetNotFound(format!("No headers found in sheet: {}", sheet_name));
                tracing::error!("Failed to get headers: {}", e);
                Err(e)
            }
        }
    }

    /// Rows `start_row..=end_row` (1-indexed), or through the last row when
    /// `end_row` is `None`
    pub async fn get_sheet_data(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start_row: u32,
        end_row: Option<u32>,
    ) -> Result<Rows> {
        if start_row == 0 {
            return Err(SheetError::Validation("Rows are numbered from 1".into()));
        }
        if let Some(end) = end_row.filter(|end| *end < start_row) {
            return Err(SheetError::Validation(format!(
                "End row {} is before start row {}",
                end, start_row
            )));
        }
        let range = SheetRange::rows(sheet_name, start_row, end_row);
        let rows = self
            .call("get_sheet_data", || self.api.get_values(spreadsheet_id, &range))
            .await
            .inspect_err(|e| tracing::error!("Failed to get sheet data: {}", e))?;

        tracing::info!("Retrieved {} rows from {}", rows.len(), range);
        Ok(rows)
    }

    /// Write one cell, addressed by 1-indexed row and column
    pub async fn update_cell(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row: u32,
        col: u32,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        if row == 0 || col == 0 {
            return Err(SheetError::Validation(format!(
                "Cell ({}, {}) is outside the sheet; rows and columns are numbered from 1",
                row, col
            )));
        }
        let range = SheetRange::cell(sheet_name, row, col);
        let values = [vec![value.into()]];
        self.call("update_cell", || self.api.update_values(spreadsheet_id, &range, &values))
            .await
            .inspect_err(|e| tracing::error!("Failed to update cell: {}", e))?;

        tracing::info!("Updated cell {} with value: {}", range, values[0][0].as_text());
        Ok(())
    }

    /// Append rows after the sheet's data (columns A-Z)
    pub async fn append_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        rows: &[Vec<CellValue>],
    ) -> Result<()> {
        let range = SheetRange::columns(sheet_name);
        self.call("append_rows", || self.api.append_values(spreadsheet_id, &range, rows))
            .await
            .inspect_err(|e| tracing::error!("Failed to append rows: {}", e))?;

        tracing::info!("Appended {} rows to {}", rows.len(), sheet_name);
        Ok(())
    }
}
