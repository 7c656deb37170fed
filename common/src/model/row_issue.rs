use serde::{Deserialize, Serialize};

/// Validation problems found on one spreadsheet row.
///
/// `row_index` is the row number a user sees in their spreadsheet: the header
/// occupies row 1, so the first data row is row 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    #[serde(rename = "rowIndex")]
    pub row_index: usize,
    pub voter_id: Option<String>,
    pub issues: Vec<String>,
}
