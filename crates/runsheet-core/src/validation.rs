use crate::error::CoreError;

/// Check that a row lines up positionally with the header row.
///
/// Only the length is checked; cell contents are not inspected.
pub fn validate_row<T>(row: &[T], headers: &[String]) -> Result<(), CoreError> {
    if row.len() != headers.len() {
        return Err(CoreError::LengthMismatch {
            row: row.len(),
            headers: headers.len(),
        });
    }
    Ok(())
}
