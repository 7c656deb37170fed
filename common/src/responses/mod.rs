//! JSON envelopes returned by the voter endpoints.
//!
//! Every envelope carries a `status` flag; failures add a `message` and either an
//! `error` string or structured per-row detail.

use crate::model::row_issue::RowIssue;
use crate::model::voter::VoterListing;
use serde::{Deserialize, Serialize};

pub const NO_NEW_VOTERS: &str = "No new voters to insert";
pub const VOTERS_PROCESSED: &str = "Voters processed successfully";
pub const FK_VALIDATION_FAILED: &str =
    "Foreign key validation failed for some rows. Fix and re-upload.";
pub const DATABASE_INSERT_ERROR: &str = "Database insert error";
pub const UNREADABLE_SPREADSHEET: &str = "Unable to read spreadsheet";
pub const UNEXPECTED_ERROR: &str = "Unexpected server error";

/// Successful bulk import, including the "nothing new" case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCompleted {
    pub status: bool,
    pub message: String,
    pub inserted: usize,
    pub skipped_duplicates: usize,
}

/// Bulk import rejected at the validation gate. Nothing was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRejected {
    pub status: bool,
    pub message: String,
    #[serde(rename = "fkInvalidRows")]
    pub fk_invalid_rows: Vec<RowIssue>,
}

/// Any other failure with a plain error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub status: bool,
    pub message: String,
    pub error: String,
}

impl Failure {
    pub fn new(message: &str, error: impl ToString) -> Self {
        Self {
            status: false,
            message: message.to_string(),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterList {
    pub message: String,
    pub data: Vec<VoterListing>,
    pub status: bool,
}
