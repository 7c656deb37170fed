//! Bulk voter import.
//!
//! An upload moves through these stages, stopping at the first failure:
//!
//! 1. **Decoding** (`decode`): the spreadsheet becomes header-keyed rows.
//! 2. **Deduplicating** (`dedup`): rows whose voter id is already stored, or
//!    repeats an earlier row, are dropped. If nothing is left the import ends
//!    here as a success.
//! 3. **Validating** (`references`): required columns and the four foreign
//!    identifiers are checked against the reference tables. A single bad row
//!    aborts the import and nothing is written.
//! 4. **Writing** (`write`): the rows are inserted in chunks inside one
//!    transaction, which is either committed whole or rolled back whole.

mod candidate;
pub mod decode;
mod dedup;
mod references;
pub mod write;

use candidate::Candidate;
use common::model::row_issue::RowIssue;
use decode::DecodeError;
use dedup::{existing_voter_ids, partition_new};
use references::ReferenceSet;
use rusqlite::Connection;

/// A spreadsheet as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Every row was already stored.
    NothingNew { skipped_duplicates: usize },
    Committed {
        inserted: usize,
        skipped_duplicates: usize,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("{} row(s) failed validation", .0.len())]
    Validation(Vec<RowIssue>),
    /// A read before the write phase failed.
    #[error("lookup failed: {0}")]
    Lookup(#[source] rusqlite::Error),
    /// The write transaction failed and was rolled back.
    #[error("{0}")]
    Write(#[source] rusqlite::Error),
}

/// Runs the whole import on `conn`.
pub fn run(
    conn: &mut Connection,
    upload: &Upload,
    chunk_size: usize,
) -> Result<ImportOutcome, ImportError> {
    let rows = decode::decode(upload.filename.as_deref(), &upload.bytes)?;
    let candidates: Vec<Candidate> = rows.iter().map(Candidate::from_row).collect();
    log::info!("Decoded {} voter rows", candidates.len());

    let split = partition_new(candidates, |keys| existing_voter_ids(conn, keys))
        .map_err(ImportError::Lookup)?;
    if split.repeated > 0 {
        log::warn!("Ignoring {} repeated voter ids in upload", split.repeated);
    }
    log::info!(
        "{} new voters, {} already stored",
        split.fresh.len(),
        split.already_stored
    );
    if split.fresh.is_empty() {
        return Ok(ImportOutcome::NothingNew {
            skipped_duplicates: split.already_stored,
        });
    }

    let references = ReferenceSet::fetch(conn, &split.fresh).map_err(ImportError::Lookup)?;
    let records = references::validate(split.fresh, &references).map_err(|invalid| {
        log::error!("Validation failed for {} rows", invalid.len());
        ImportError::Validation(invalid)
    })?;

    let written = write::write_chunked(conn, &records, chunk_size).map_err(ImportError::Write)?;
    Ok(ImportOutcome::Committed {
        inserted: written.inserted,
        skipped_duplicates: split.already_stored + written.skipped_duplicates,
    })
}
