use runsheet_core::{tally_runs, HeaderRow, RunStatusSummary};

use crate::api::SheetsApi;
use crate::error::{Result, SheetError};
use crate::service::SheetService;

/// Format of the timestamp written next to a status change
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`]
pub fn current_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Where runs live: the sheet and the names of its key columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSheetLayout {
    pub sheet_name: String,
    pub run_column: String,
    pub status_column: String,
    /// Written on every status update when the sheet has this column
    pub timestamp_column: Option<String>,
}

impl Default for RunSheetLayout {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            run_column: "RUN".to_string(),
            status_column: "STATUS".to_string(),
            timestamp_column: Some("TIMESTAMP".to_string()),
        }
    }
}

impl RunSheetLayout {
    /// Default column names on another sheet
    pub fn for_sheet(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            ..Self::default()
        }
    }

    pub fn with_columns(mut self, run_column: impl Into<String>, status_column: impl Into<String>) -> Self {
        self.run_column = run_column.into();
        self.status_column = status_column.into();
        self
    }

    pub fn with_timestamp_column(mut self, timestamp_column: Option<String>) -> Self {
        self.timestamp_column = timestamp_column;
        self
    }
}

/// Run status tracking on top of [`SheetService`]
pub struct RunStatusService<A> {
    sheets: SheetService<A>,
}

impl<A> Clone for RunStatusService<A> {
    fn clone(&self) -> Self {
        Self {
            sheets: self.sheets.clone(),
        }
    }
}

impl<A: SheetsApi> RunStatusService<A> {
    pub fn new(sheets: SheetService<A>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &SheetService<A> {
        &self.sheets
    }

    /// Summarize run statuses on `Sheet1` using the default columns
    pub async fn check_run_status(&self, spreadsheet_id: &str) -> Result<RunStatusSummary> {
        self.check_run_status_in(spreadsheet_id, &RunSheetLayout::default())
            .await
    }

    /// Count completed, failed and pending runs.
    ///
    /// Any status other than `COMPLETED` or `FAILED` (in any case), including
    /// a blank one, counts as pending.
    pub async fn check_run_status_in(
        &self,
        spreadsheet_id: &str,
        layout: &RunSheetLayout,
    ) -> Result<RunStatusSummary> {
        let summary = self
            .tally(spreadsheet_id, layout)
            .await
            .inspect_err(|e| log_failure("check run status", e))?;

        tracing::info!("Run status summary: {:?}", summary);
        Ok(summary)
    }

    async fn tally(&self, spreadsheet_id: &str, layout: &RunSheetLayout) -> Result<RunStatusSummary> {
        let headers = self
            .sheets
            .get_headers(spreadsheet_id, &layout.sheet_name)
            .await?;
        headers.index_of(&layout.run_column)?;
        let status_index = headers.index_of(&layout.status_column)?;

        let rows = self
            .sheets
            .get_sheet_data(spreadsheet_id, &layout.sheet_name, 1, None)
            .await?;
        Ok(tally_runs(&rows, status_index))
    }

    /// Set the status of a run on `Sheet1` using the default columns
    pub async fn update_run_status(&self, spreadsheet_id: &str, run_id: &str, status: &str) -> Result<()> {
        self.update_run_status_in(spreadsheet_id, run_id, status, &RunSheetLayout::default())
            .await
    }

    /// Set the status of the first row whose run cell equals `run_id`.
    ///
    /// The timestamp cell is refreshed too when the layout names a timestamp
    /// column that exists in the header row. Nothing is written when the run
    /// is not found.
    pub async fn update_run_status_in(
        &self,
        spreadsheet_id: &str,
        run_id: &str,
        status: &str,
        layout: &RunSheetLayout,
    ) -> Result<()> {
        self.update(spreadsheet_id, run_id, status, layout)
            .await
            .inspect_err(|e| log_failure("update run status", e))?;

        tracing::info!("Updated run {} status to {}", run_id, status);
        Ok(())
    }

    async fn update(
        &self,
        spreadsheet_id: &str,
        run_id: &str,
        status: &str,
        layout: &RunSheetLayout,
    ) -> Result<()> {
        let headers: HeaderRow = self
            .sheets
            .get_headers(spreadsheet_id, &layout.sheet_name)
            .await?;
        let run_index = headers.index_of(&layout.run_column)?;
        let status_index = headers.index_of(&layout.status_column)?;
        let timestamp_index = headers.optional_index_of(layout.timestamp_column.as_deref());

        let rows = self
            .sheets
            .get_sheet_data(spreadsheet_id, &layout.sheet_name, 1, None)
            .await?;

        let row_num = rows
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| row.get(run_index).is_some_and(|cell| cell == run_id))
            .map(|(i, _)| i as u32 + 1)
            .ok_or_else(|| SheetError::Validation(format!("Run ID {} not found", run_id)))?;

        self.sheets
            .update_cell(
                spreadsheet_id,
                &layout.sheet_name,
                row_num,
                status_index as u32 + 1,
                status,
            )
            .await?;

        if let Some(timestamp_index) = timestamp_index {
            self.sheets
                .update_cell(
                    spreadsheet_id,
                    &layout.sheet_name,
                    row_num,
                    timestamp_index as u32 + 1,
                    current_timestamp(),
                )
                .await?;
        }

        Ok(())
    }
}

fn log_failure(action: &str, e: &SheetError) {
    tracing::error!("Failed to {}: {}", action, e);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_format() {
        let ts = current_timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok(), "{ts}");
        assert_eq!(ts.len(), "2024-01-31 08:15:00".len());
    }

    #[test]
    fn test_layout_builders() {
        let layout = RunSheetLayout::for_sheet("RunStatus")
            .with_columns("JOB", "STATE")
            .with_timestamp_column(None);
        assert_eq!(layout.sheet_name, "RunStatus");
        assert_eq!(layout.run_column, "JOB");
        assert_eq!(layout.status_column, "STATE");
        assert_eq!(layout.timestamp_column, None);
        assert_eq!(RunSheetLayout::default().timestamp_column.as_deref(), Some("TIMESTAMP"));
    }
}
