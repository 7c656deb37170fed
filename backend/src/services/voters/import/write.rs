//! Chunked insertion of validated voters inside a single transaction.

use super::dedup::{existing_voter_ids, partition_new};
use common::model::voter::VoterRecord;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

pub const DEFAULT_CHUNK_SIZE: u32 = 1000;

const INSERT_VOTER: &str = "INSERT INTO voters (
        constituency_id, block_id, booth_id, part_id, voter_id, name,
        father_husband_name, photo, age, gender, house_no, address, phone,
        email, polling_station, notes
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub inserted: usize,
    pub skipped_duplicates: usize,
}

fn insert_chunk(tx: &Transaction<'_>, chunk: &[VoterRecord]) -> rusqlite::Result<WriteSummary> {
    // Another import may have committed some of these ids since the first check.
    let split = partition_new(chunk.iter().collect(), |keys| existing_voter_ids(tx, keys))?;

    let mut stmt = tx.prepare_cached(INSERT_VOTER)?;
    for v in &split.fresh {
        stmt.execute(params![
            v.constituency_id,
            v.block_id,
            v.booth_id,
            v.part_id,
            v.voter_id,
            v.name,
            v.father_husband_name,
            v.photo,
            v.age,
            v.gender,
            v.house_no,
            v.address,
            v.phone,
            v.email,
            v.polling_station,
            v.notes,
        ])?;
    }

    Ok(WriteSummary {
        inserted: split.fresh.len(),
        skipped_duplicates: split.already_stored,
    })
}

/// Inserts `records` in chunks of `chunk_size` inside one transaction.
///
/// `records` must already be free of repeated voter ids. Any failure rolls back
/// every chunk written so far; nothing is committed unless all chunks succeed.
///
/// The transaction takes the write lock up front, so concurrent imports on the
/// same tenant wait on the busy timeout and then see each other's ids.
pub fn write_chunked(
    conn: &mut Connection,
    records: &[VoterRecord],
    chunk_size: usize,
) -> rusqlite::Result<WriteSummary> {
    let chunk_size = chunk_size.max(1);
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut summary = WriteSummary::default();
    for (n, chunk) in records.chunks(chunk_size).enumerate() {
        match insert_chunk(&tx, chunk) {
            Ok(written) => {
                summary.inserted += written.inserted;
                summary.skipped_duplicates += written.skipped_duplicates;
            }
            Err(e) => {
                log::error!("Voter insert failed in chunk {}: {}", n + 1, e);
                if let Err(rollback_err) = tx.rollback() {
                    log::error!("Rollback failed: {}", rollback_err);
                }
                return Err(e);
            }
        }
    }

    tx.commit()?;
    Ok(summary)
}
