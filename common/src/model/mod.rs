pub mod row_issue;
pub mod voter;
