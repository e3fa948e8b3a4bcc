pub mod run_status;
pub mod sheets;
pub mod validation;

pub use run_status::{current_timestamp, RunSheetLayout, RunStatusService, TIMESTAMP_FORMAT};
pub use sheets::SheetService;
pub use validation::DataValidationService;
