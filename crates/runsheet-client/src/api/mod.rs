//! The remote spreadsheet service, as seen by the rest of the client.
//!
//! [`SheetsApi`] is the minimum surface the services need. Two backends
//! implement it: [`GoogleSheetsClient`] talks to the real REST API and
//! [`InMemorySheets`] keeps everything in process.

pub mod auth;
pub mod google;
pub mod memory;

use std::future::Future;

use runsheet_core::{CellValue, SheetRange};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub use auth::{Authenticator, ServiceAccountAuth, ServiceAccountKey};
pub use google::GoogleSheetsClient;
pub use memory::InMemorySheets;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Formatted cell values, row-major
pub type Rows = Vec<Vec<String>>;

/// Spreadsheet metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spreadsheet {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<SheetInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_url: Option<String>,
}

impl Spreadsheet {
    pub fn title(&self) -> &str {
        &self.properties.title
    }

    /// Sheet titles in tab order
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.properties.title.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetProperties {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub index: u32,
}

/// Properties sent when adding a sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSheetProperties {
    pub title: String,
}

/// One structural change in a batch update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchRequest {
    AddSheet { properties: NewSheetProperties },
}

impl BatchRequest {
    pub fn add_sheet(title: impl Into<String>) -> Self {
        BatchRequest::AddSheet {
            properties: NewSheetProperties { title: title.into() },
        }
    }
}

/// Reply to one [`BatchRequest`], in request order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_sheet: Option<AddSheetReply>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddSheetReply {
    pub properties: SheetProperties,
}

/// Remote spreadsheet service.
///
/// Values are always read formatted and written raw (no formula parsing).
pub trait SheetsApi: Send + Sync {
    /// Create a spreadsheet with a single default sheet
    fn create_spreadsheet(&self, title: &str) -> impl Future<Output = ApiResult<Spreadsheet>> + Send;

    fn get_spreadsheet(&self, spreadsheet_id: &str) -> impl Future<Output = ApiResult<Spreadsheet>> + Send;

    /// Read a range. Trailing empty cells and rows are omitted.
    fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
    ) -> impl Future<Output = ApiResult<Rows>> + Send;

    /// Overwrite the cells starting at the top-left of `range`
    fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: &[Vec<CellValue>],
    ) -> impl Future<Output = ApiResult<()>> + Send;

    /// Insert rows after the last row of data in `range`
    fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: &[Vec<CellValue>],
    ) -> impl Future<Output = ApiResult<()>> + Send;

    fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: &[BatchRequest],
    ) -> impl Future<Output = ApiResult<Vec<BatchReply>>> + Send;
}
