use serde::{Deserialize, Serialize};

pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_FAILED: &str = "FAILED";

/// Counts of runs by status
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStatusSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Everything that is neither completed nor failed, blanks included
    pub pending: usize,
    /// Percentage of completed runs, 0 when there are none
    pub completion_rate: f64,
}

/// Tally a sheet's rows by the status column.
///
/// `rows` is the sheet as read from row 1, so the first row is the header and
/// is skipped. A sheet holding only its header counts as empty. Rows that are
/// too short to reach the status column count as pending. Statuses are
/// compared after Unicode uppercasing.
pub fn tally_runs(rows: &[Vec<String>], status_index: usize) -> RunStatusSummary {
    let data: &[Vec<String>] = if rows.len() > 1 { &rows[1..] } else { &[] };

    let status_is = |row: &Vec<String>, wanted: &str| {
        row.get(status_index)
            .is_some_and(|s| s.to_uppercase() == wanted)
    };

    let total = data.len();
    let completed = data.iter().filter(|row| status_is(*row, STATUS_COMPLETED)).count();
    let failed = data.iter().filter(|row| status_is(*row, STATUS_FAILED)).count();

    RunStatusSummary {
        total,
        completed,
        failed,
        pending: total - completed - failed,
        completion_rate: if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_one_of_each() {
        let rows = sheet(&[
            &["RUN", "STATUS", "TIMESTAMP"],
            &["R1", "COMPLETED", "t"],
            &["R2", "FAILED", "t"],
            &["R3", "PENDING", "t"],
        ]);
        let summary = tally_runs(&rows, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pending, 1);
        assert!((summary.completion_rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_status_match_ignores_case() {
        let rows = sheet(&[
            &["RUN", "STATUS"],
            &["R1", "completed"],
            &["R2", "Failed"],
            &["R3", "COMPLETED "],
        ]);
        let summary = tally_runs(&rows, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pending, 1);
    }

    #[test]
    fn test_status_match_uses_unicode_uppercase() {
        let rows = sheet(&[&["RUN", "STATUS"], &["R1", "fa\u{131}led"], &["R2", "Completed"]]);
        let summary = tally_runs(&rows, 1);
        assert_eq!((summary.completed, summary.failed, summary.pending), (1, 1, 0));
    }

    #[test]
    fn test_short_and_blank_rows_are_pending() {
        let rows = sheet(&[&["RUN", "STATUS"], &["R1"], &[], &["R3", ""]]);
        let summary = tally_runs(&rows, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.pending, 3);
        assert_eq!(summary.completion_rate, 0.0);
    }

    #[test]
    fn test_header_only_and_empty() {
        assert_eq!(tally_runs(&sheet(&[&["RUN", "STATUS"]]), 1), RunStatusSummary::default());
        assert_eq!(tally_runs(&[], 1), RunStatusSummary::default());
    }
}
