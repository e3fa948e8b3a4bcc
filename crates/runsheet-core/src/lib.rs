pub mod error;
pub mod header;
pub mod range;
pub mod status;
pub mod validation;
pub mod value;

pub use error::CoreError;
pub use header::{column_index, HeaderRow};
pub use range::{col_from_label, col_to_label, CellRef, SheetRange, MAX_SCAN_COL};
pub use status::{tally_runs, RunStatusSummary, STATUS_COMPLETED, STATUS_FAILED};
pub use validation::validate_row;
pub use value::CellValue;
