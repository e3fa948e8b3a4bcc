//! In-process backend with the read/write behaviour of the hosted service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU16, AtomicU32, AtomicUsize, Ordering};

use runsheet_core::{CellValue, SheetRange};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AddSheetReply, ApiResult, BatchReply, BatchRequest, Rows, SheetInfo, SheetProperties,
    Spreadsheet, SpreadsheetProperties, SheetsApi,
};
use crate::error::ApiError;

const DEFAULT_SHEET: &str = "Sheet1";

struct MemorySheet {
    properties: SheetProperties,
    rows: Rows,
}

impl MemorySheet {
    fn new(sheet_id: i64, title: &str, index: u32) -> Self {
        Self {
            properties: SheetProperties {
                sheet_id,
                title: title.to_string(),
                index,
            },
            rows: Vec::new(),
        }
    }

    fn set(&mut self, row: usize, col: usize, value: String) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value;
    }

    /// 0-indexed row after the last row holding any non-empty cell
    fn data_end(&self) -> usize {
        self.rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1)
    }

    fn write(&mut self, top: usize, left: usize, values: &[Vec<CellValue>]) {
        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                self.set(top + r, left + c, value.as_text());
            }
        }
    }
}

struct MemorySpreadsheet {
    title: String,
    sheets: Vec<MemorySheet>,
}

impl MemorySpreadsheet {
    fn to_metadata(&self, id: &str) -> Spreadsheet {
        Spreadsheet {
            spreadsheet_id: id.to_string(),
            properties: SpreadsheetProperties {
                title: self.title.clone(),
            },
            sheets: self
                .sheets
                .iter()
                .map(|s| SheetInfo {
                    properties: s.properties.clone(),
                })
                .collect(),
            spreadsheet_url: None,
        }
    }

    fn sheet(&self, range: &SheetRange) -> ApiResult<&MemorySheet> {
        self.sheets
            .iter()
            .find(|s| s.properties.title == range.sheet)
            .ok_or_else(|| unparsable(range))
    }

    fn sheet_mut(&mut self, range: &SheetRange) -> ApiResult<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.properties.title == range.sheet)
            .ok_or_else(|| unparsable(range))
    }
}

fn unparsable(range: &SheetRange) -> ApiError {
    ApiError::http(400, format!("Unable to parse range: {}", range))
}

fn not_found() -> ApiError {
    ApiError::http(404, "Requested entity was not found.")
}

/// Reject writes that do not fit inside a bounded range
fn check_fits(range: &SheetRange, values: &[Vec<CellValue>]) -> ApiResult<()> {
    let width = (range.last_col.saturating_sub(range.first_col) + 1) as usize;
    let too_wide = values.iter().any(|row| row.len() > width);
    let too_tall = match (range.first_row, range.last_row) {
        (Some(first), Some(last)) => values.len() > (last.saturating_sub(first) + 1) as usize,
        _ => false,
    };
    if too_wide || too_tall {
        return Err(ApiError::http(
            400,
            format!("Requested writing within range [{}], but tried writing beyond it", range),
        ));
    }
    Ok(())
}

/// Spreadsheets held in memory.
///
/// New spreadsheets get a `Sheet1` tab with sheet id 0, reads drop trailing
/// blanks and appends land after the last non-empty row, as on the hosted
/// service. [`InMemorySheets::fail_next`] injects transient failures.
pub struct InMemorySheets {
    spreadsheets: RwLock<HashMap<String, MemorySpreadsheet>>,
    next_sheet_id: AtomicI64,
    calls: AtomicUsize,
    writes: AtomicUsize,
    pending_failures: AtomicU32,
    failure_status: AtomicU16,
}

impl InMemorySheets {
    pub fn new() -> Self {
        Self {
            spreadsheets: RwLock::new(HashMap::new()),
            next_sheet_id: AtomicI64::new(1),
            calls: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            pending_failures: AtomicU32::new(0),
            failure_status: AtomicU16::new(503),
        }
    }

    /// Make the next `count` calls fail with an HTTP `status` error
    pub fn fail_next(&self, count: u32, status: u16) {
        self.failure_status.store(status, Ordering::SeqCst);
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Calls made so far, failed ones included
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successful update and append calls made so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of spreadsheets held
    pub async fn count(&self) -> usize {
        self.spreadsheets.read().await.len()
    }

    fn enter(&self) -> ApiResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            let status = self.failure_status.load(Ordering::SeqCst);
            return Err(ApiError::http(status, "Injected failure"));
        }
        Ok(())
    }
}

impl Default for InMemorySheets {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetsApi for InMemorySheets {
    async fn create_spreadsheet(&self, title: &str) -> ApiResult<Spreadsheet> {
        self.enter()?;
        let id = Uuid::new_v4().simple().to_string();
        let spreadsheet = MemorySpreadsheet {
            title: title.to_string(),
            sheets: vec![MemorySheet::new(0, DEFAULT_SHEET, 0)],
        };
        let metadata = spreadsheet.to_metadata(&id);
        self.spreadsheets.write().await.insert(id, spreadsheet);
        Ok(metadata)
    }

    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> ApiResult<Spreadsheet> {
        self.enter()?;
        let spreadsheets = self.spreadsheets.read().await;
        let spreadsheet = spreadsheets.get(spreadsheet_id).ok_or_else(not_found)?;
        Ok(spreadsheet.to_metadata(spreadsheet_id))
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &SheetRange) -> ApiResult<Rows> {
        self.enter()?;
        let spreadsheets = self.spreadsheets.read().await;
        let sheet = spreadsheets
            .get(spreadsheet_id)
            .ok_or_else(not_found)?
            .sheet(range)?;

        let top = range.first_row.unwrap_or(1).max(1) as usize - 1;
        let bottom = range
            .last_row
            .map_or(sheet.rows.len(), |r| (r as usize).min(sheet.rows.len()));
        let left = range.first_col.max(1) as usize - 1;
        let right = range.last_col as usize;

        let mut rows: Rows = sheet
            .rows
            .get(top..bottom.max(top))
            .unwrap_or_default()
            .iter()
            .map(|row| {
                let end = right.min(row.len());
                let mut cells = row.get(left..end.max(left)).unwrap_or_default().to_vec();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        Ok(rows)
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: &[Vec<CellValue>],
    ) -> ApiResult<()> {
        self.enter()?;
        check_fits(range, values)?;
        let mut spreadsheets = self.spreadsheets.write().await;
        let sheet = spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(not_found)?
            .sheet_mut(range)?;

        let top = range.first_row.unwrap_or(1).max(1) as usize - 1;
        let left = range.first_col.max(1) as usize - 1;
        sheet.write(top, left, values);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: &[Vec<CellValue>],
    ) -> ApiResult<()> {
        self.enter()?;
        let mut spreadsheets = self.spreadsheets.write().await;
        let sheet = spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(not_found)?
            .sheet_mut(range)?;

        let top = sheet.data_end();
        let left = range.first_col.max(1) as usize - 1;
        sheet.write(top, left, values);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: &[BatchRequest],
    ) -> ApiResult<Vec<BatchReply>> {
        self.enter()?;
        let mut spreadsheets = self.spreadsheets.write().await;
        let spreadsheet = spreadsheets.get_mut(spreadsheet_id).ok_or_else(not_found)?;

        // validate the whole batch before applying any of it
        let mut titles: Vec<&str> = spreadsheet
            .sheets
            .iter()
            .map(|s| s.properties.title.as_str())
            .collect();
        for request in requests {
            let BatchRequest::AddSheet { properties } = request;
            if titles.contains(&properties.title.as_str()) {
                return Err(ApiError::http(
                    400,
                    format!(
                        "Invalid requests[0].addSheet: A sheet with the name \"{}\" already exists.",
                        properties.title
                    ),
                ));
            }
            titles.push(&properties.title);
        }

        let mut replies = Vec::with_capacity(requests.len());
        for request in requests {
            let BatchRequest::AddSheet { properties } = request;
            let sheet_id = self.next_sheet_id.fetch_add(1, Ordering::SeqCst);
            let index = spreadsheet.sheets.len() as u32;
            let sheet = MemorySheet::new(sheet_id, &properties.title, index);
            replies.push(BatchReply {
                add_sheet: Some(AddSheetReply {
                    properties: sheet.properties.clone(),
                }),
            });
            spreadsheet.sheets.push(sheet);
        }
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    async fn spreadsheet_with(api: &InMemorySheets, rows: &[&[&str]]) -> String {
        let id = api.create_spreadsheet("Test").await.unwrap().spreadsheet_id;
        let values: Vec<_> = rows.iter().map(|r| row(r)).collect();
        api.update_values(&id, &SheetRange::rows(DEFAULT_SHEET, 1, None), &values)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_new_spreadsheet_has_default_sheet() {
        let api = InMemorySheets::new();
        let created = api.create_spreadsheet("Runs").await.unwrap();
        let fetched = api.get_spreadsheet(&created.spreadsheet_id).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.title(), "Runs");
        assert_eq!(fetched.sheet_names(), vec![DEFAULT_SHEET.to_string()]);
        assert_eq!(fetched.sheets[0].properties.sheet_id, 0);
    }

    #[tokio::test]
    async fn test_reads_trim_trailing_blanks() {
        let api = InMemorySheets::new();
        let id = spreadsheet_with(
            &api,
            &[&["RUN", "STATUS", ""], &["R1", "", ""], &["", "", ""], &["R3", "DONE"], &["", ""]],
        )
        .await;

        let rows = api.get_values(&id, &SheetRange::rows(DEFAULT_SHEET, 1, None)).await.unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["RUN".to_string(), "STATUS".to_string()],
                vec!["R1".to_string()],
                vec![],
                vec!["R3".to_string(), "DONE".to_string()],
            ]
        );

        let header = api.get_values(&id, &SheetRange::header(DEFAULT_SHEET)).await.unwrap();
        assert_eq!(header, vec![vec!["RUN".to_string(), "STATUS".to_string()]]);

        let tail = api.get_values(&id, &SheetRange::rows(DEFAULT_SHEET, 4, Some(9))).await.unwrap();
        assert_eq!(tail, vec![vec!["R3".to_string(), "DONE".to_string()]]);

        let past_end = api.get_values(&id, &SheetRange::rows(DEFAULT_SHEET, 20, None)).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_single_cell_update() {
        let api = InMemorySheets::new();
        let id = spreadsheet_with(&api, &[&["RUN", "STATUS"], &["R1", "PENDING"]]).await;

        api.update_values(&id, &SheetRange::cell(DEFAULT_SHEET, 2, 2), &[row(&["COMPLETED"])])
            .await
            .unwrap();
        api.update_values(&id, &SheetRange::cell(DEFAULT_SHEET, 3, 4), &[vec![CellValue::from(7i64)]])
            .await
            .unwrap();

        let rows = api.get_values(&id, &SheetRange::rows(DEFAULT_SHEET, 2, None)).await.unwrap();
        assert_eq!(rows[0], vec!["R1", "COMPLETED"]);
        assert_eq!(rows[1], vec!["", "", "", "7"]);
    }

    #[tokio::test]
    async fn test_write_outside_range_is_rejected() {
        let api = InMemorySheets::new();
        let id = spreadsheet_with(&api, &[&["RUN"]]).await;

        let err = api
            .update_values(&id, &SheetRange::cell(DEFAULT_SHEET, 2, 1), &[row(&["a", "b"])])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_append_after_last_data_row() {
        let api = InMemorySheets::new();
        let id = spreadsheet_with(&api, &[&["RUN", "STATUS"], &["R1", "PENDING"], &["", ""]]).await;

        api.append_values(&id, &SheetRange::columns(DEFAULT_SHEET), &[row(&["R2", "PENDING"]), row(&["R3", "FAILED"])])
            .await
            .unwrap();

        let rows = api.get_values(&id, &SheetRange::rows(DEFAULT_SHEET, 1, None)).await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2], vec!["R2", "PENDING"]);
        assert_eq!(rows[3], vec!["R3", "FAILED"]);
        assert_eq!(api.write_count(), 2);
    }

    #[tokio::test]
    async fn test_add_sheet() {
        let api = InMemorySheets::new();
        let id = api.create_spreadsheet("Runs").await.unwrap().spreadsheet_id;

        let replies = api.batch_update(&id, &[BatchRequest::add_sheet("RunStatus")]).await.unwrap();
        let added = &replies[0].add_sheet.as_ref().unwrap().properties;
        assert_eq!(added.title, "RunStatus");
        assert_eq!(added.index, 1);
        assert_ne!(added.sheet_id, 0);

        let err = api.batch_update(&id, &[BatchRequest::add_sheet("RunStatus")]).await.unwrap_err();
        assert_eq!(err.status(), Some(400));

        let names = api.get_spreadsheet(&id).await.unwrap().sheet_names();
        assert_eq!(names, vec!["Sheet1", "RunStatus"]);
    }

    #[tokio::test]
    async fn test_missing_spreadsheet_and_sheet() {
        let api = InMemorySheets::new();
        let err = api.get_spreadsheet("nope").await.unwrap_err();
        assert_eq!(err.status(), Some(404));

        let id = api.create_spreadsheet("Runs").await.unwrap().spreadsheet_id;
        let err = api.get_values(&id, &SheetRange::header("Missing")).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let api = InMemorySheets::new();
        api.fail_next(2, 503);

        let first = api.create_spreadsheet("a").await.unwrap_err();
        assert!(first.is_transient());
        assert!(api.create_spreadsheet("b").await.is_err());
        assert!(api.create_spreadsheet("c").await.is_ok());

        assert_eq!(api.call_count(), 3);
        assert_eq!(api.count().await, 1);
    }
}
