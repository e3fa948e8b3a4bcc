use runsheet_core::{validate_row, CellValue};

use crate::api::SheetsApi;
use crate::error::Result;
use crate::service::SheetService;

/// Row validation against a sheet's header row, and validated appends
pub struct DataValidationService<A> {
    sheets: SheetService<A>,
}

impl<A> Clone for DataValidationService<A> {
    fn clone(&self) -> Self {
        Self {
            sheets: self.sheets.clone(),
        }
    }
}

impl<A: SheetsApi> DataValidationService<A> {
    pub fn new(sheets: SheetService<A>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &SheetService<A> {
        &self.sheets
    }

    /// Check that a row has exactly one value per header
    pub fn validate_data<T>(&self, data: &[T], headers: &[String]) -> Result<()> {
        validate_row(data, headers).inspect_err(|e| tracing::error!("Data validation failed: {}", e))?;
        Ok(())
    }

    /// Append rows after validating each against the sheet's headers.
    ///
    /// All rows go in a single request. If any row has the wrong length,
    /// nothing is written.
    pub async fn batch_append_data(
        &self,
        spreadsheet_id: &str,
        rows: &[Vec<CellValue>],
        sheet_name: &str,
    ) -> Result<()> {
        let headers = self
            .sheets
            .get_headers(spreadsheet_id, sheet_name)
            .await
            .inspect_err(|e| tracing::error!("Failed to batch append data: {}", e))?;

        for row in rows {
            self.validate_data(row, headers.names())?;
        }

        if rows.is_empty() {
            tracing::info!("No rows to append to {}", sheet_name);
            return Ok(());
        }

        self.sheets
            .append_rows(spreadsheet_id, sheet_name, rows)
            .await
            .inspect_err(|e| tracing::error!("Failed to batch append data: {}", e))?;

        tracing::info!("Successfully appended {} rows", rows.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemorySheets;
    use crate::error::SheetError;

    fn headers() -> Vec<String> {
        vec!["RUN".into(), "STATUS".into(), "TIMESTAMP".into()]
    }

    async fn setup() -> (DataValidationService<InMemorySheets>, String) {
        let service = DataValidationService::new(SheetService::new(InMemorySheets::new()));
        let id = service.sheets().create_spreadsheet("Validation").await.unwrap();
        let header_row: Vec<CellValue> = headers().into_iter().map(CellValue::from).collect();
        service
            .sheets()
            .append_rows(&id, "Sheet1", &[header_row])
            .await
            .unwrap();
        (service, id)
    }

    #[test]
    fn test_validate_data() {
        let service = DataValidationService::new(SheetService::new(InMemorySheets::new()));
        assert!(service.validate_data(&["RUN001", "PENDING", ""], &headers()).is_ok());

        let err = service.validate_data(&["RUN001", "PENDING"], &headers()).unwrap_err();
        assert!(matches!(err, SheetError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation error: Data length (2) does not match headers length (3)"
        );
    }

    #[tokio::test]
    async fn test_batch_append() {
        let (service, id) = setup().await;
        let rows = vec![
            vec!["RUN001".into(), "PENDING".into(), CellValue::Empty],
            vec!["RUN002".into(), "COMPLETED".into(), "2024-01-31 08:15:00".into()],
        ];

        service.batch_append_data(&id, &rows, "Sheet1").await.unwrap();

        let data = service.sheets().get_sheet_data(&id, "Sheet1", 2, None).await.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0], vec!["RUN001", "PENDING"]);
        assert_eq!(data[1][0], "RUN002");
    }

    #[tokio::test]
    async fn test_mismatched_row_writes_nothing() {
        let (service, id) = setup().await;
        let writes = service.sheets().api().write_count();
        let rows = vec![
            vec!["RUN001".into(), "PENDING".into(), CellValue::Empty],
            vec!["RUN002".into()],
        ];

        let err = service.batch_append_data(&id, &rows, "Sheet1").await.unwrap_err();

        assert!(matches!(err, SheetError::Validation(_)));
        assert_eq!(service.sheets().api().write_count(), writes);
        assert!(service
            .sheets()
            .get_sheet_data(&id, "Sheet1", 2, None)
            .await
            .unwrap()
            .is_empty());
    }
}
