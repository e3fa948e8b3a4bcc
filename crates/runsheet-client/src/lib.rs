pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod retry;
pub mod service;

pub use api::{GoogleSheetsClient, InMemorySheets, SheetsApi, Spreadsheet};
pub use config::{Config, RetryConfig};
pub use error::{ApiError, Result, SheetError};
pub use retry::RetryPolicy;
pub use service::{
    current_timestamp, DataValidationService, RunSheetLayout, RunStatusService, SheetService,
    TIMESTAMP_FORMAT,
};

pub use runsheet_core::{CellValue, HeaderRow, RunStatusSummary, SheetRange};
