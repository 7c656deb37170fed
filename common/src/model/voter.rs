use serde::{Deserialize, Serialize};

/// Gender stored when a row leaves the column blank.
pub const DEFAULT_GENDER: &str = "male";

/// A voter row ready to be written to the `voters` table.
///
/// Produced by the bulk import once a spreadsheet row has passed reference
/// validation. All optional text fields are `None` when the cell was blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub constituency_id: Option<i64>,
    pub block_id: Option<i64>,
    pub booth_id: Option<i64>,
    pub part_id: Option<i64>,
    /// Natural key of the voter. Unique across the table.
    pub voter_id: String,
    pub name: String,
    pub father_husband_name: Option<String>,
    /// Either a URL or an inline `data:image/...` payload.
    pub photo: Option<String>,
    pub age: Option<i64>,
    /// Always lowercase.
    pub gender: String,
    pub house_no: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub polling_station: Option<String>,
    pub notes: Option<String>,
}

/// Lowercases a gender value, falling back to [`DEFAULT_GENDER`] when blank.
pub fn normalize_gender(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(g) if !g.is_empty() => g.to_lowercase(),
        _ => DEFAULT_GENDER.to_string(),
    }
}

/// An active voter as returned by `GET /api/voters`, with the code and name of
/// each referenced administrative entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterListing {
    pub id: i64,
    #[serde(flatten)]
    pub record: VoterRecord,
    pub constituencies_code: Option<String>,
    pub constituencies_name: Option<String>,
    pub block_code: Option<String>,
    pub block_name: Option<String>,
    pub booth_code: Option<String>,
    pub booth_name: Option<String>,
    pub part_code: Option<String>,
    pub part_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_is_lowercased() {
        assert_eq!(normalize_gender(Some(" FEMALE ")), "female");
    }

    #[test]
    fn blank_gender_defaults_to_male() {
        assert_eq!(normalize_gender(None), "male");
        assert_eq!(normalize_gender(Some("  ")), "male");
    }
}
