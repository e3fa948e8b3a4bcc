//! Track a handful of runs in a spreadsheet.
//!
//! Uses the in-memory backend unless `GOOGLE_CREDENTIALS_PATH` (or a config
//! file naming credentials) is available:
//!
//! ```sh
//! cargo run -p runsheet-client --example run_status_demo
//! GOOGLE_CREDENTIALS_PATH=service-account.json cargo run -p runsheet-client --example run_status_demo
//! ```

use runsheet_client::{
    logging, CellValue, Config, DataValidationService, InMemorySheets, RunStatusService, SheetService,
    SheetsApi,
};

async fn track_runs<A: SheetsApi>(sheets: SheetService<A>) -> anyhow::Result<()> {
    let run_status = RunStatusService::new(sheets.clone());
    let validation = DataValidationService::new(sheets.clone());

    let spreadsheet_id = sheets.create_spreadsheet("Test Run Status").await?;
    tracing::info!("Created spreadsheet with ID: {}", spreadsheet_id);

    let headers: Vec<CellValue> = ["RUN", "STATUS", "TIMESTAMP"].map(CellValue::from).into();
    sheets.append_rows(&spreadsheet_id, "Sheet1", &[headers]).await?;

    let rows: Vec<Vec<CellValue>> = ["RUN001", "RUN002", "RUN003"]
        .iter()
        .map(|run| vec![(*run).into(), "PENDING".into(), CellValue::Empty])
        .collect();
    validation
        .batch_append_data(&spreadsheet_id, &rows, "Sheet1")
        .await?;

    run_status
        .update_run_status(&spreadsheet_id, "RUN001", "COMPLETED")
        .await?;
    run_status
        .update_run_status(&spreadsheet_id, "RUN002", "FAILED")
        .await?;

    let summary = run_status.check_run_status(&spreadsheet_id).await?;
    tracing::info!("Run Status Summary:");
    tracing::info!("Total Runs: {}", summary.total);
    tracing::info!("Completed: {}", summary.completed);
    tracing::info!("Failed: {}", summary.failed);
    tracing::info!("Pending: {}", summary.pending);
    tracing::info!("Completion Rate: {:.2}%", summary.completion_rate);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(None)?;

    let config = Config::load()
        .unwrap_or_else(|_| Config::default().with_overrides(|key| std::env::var(key).ok()));
    match config.resolve_credentials_path(None) {
        Ok(_) => track_runs(SheetService::from_config(&config, None)?).await,
        Err(_) => {
            tracing::info!("No credentials configured, using the in-memory backend");
            track_runs(SheetService::new(InMemorySheets::new())).await
        }
    }
}
