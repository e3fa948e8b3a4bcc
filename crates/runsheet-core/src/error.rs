use thiserror::Error;

/// Errors raised by the pure row/column helpers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A column name was not found in the header row
    #[error("'{0}' is not in the header row")]
    InvalidColumn(String),

    /// A row does not line up with the header row
    #[error("Data length ({row}) does not match headers length ({headers})")]
    LengthMismatch { row: usize, headers: usize },
}
