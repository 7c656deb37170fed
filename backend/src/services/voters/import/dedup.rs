//! Natural-key deduplication, shared by the pre-validation pass and the
//! per-chunk pass inside the write transaction.

use super::candidate::Candidate;
use common::model::voter::VoterRecord;
use rusqlite::{params_from_iter, Connection};
use std::collections::HashSet;

/// Keys per `IN (...)` query, well under SQLite's bound-parameter limit.
const LOOKUP_BATCH: usize = 500;

/// Anything carrying a voter id.
pub trait NaturalKey {
    fn natural_key(&self) -> Option<&str>;
}

impl NaturalKey for Candidate {
    fn natural_key(&self) -> Option<&str> {
        self.voter_id.as_deref()
    }
}

impl NaturalKey for VoterRecord {
    fn natural_key(&self) -> Option<&str> {
        Some(&self.voter_id)
    }
}

impl<T: NaturalKey> NaturalKey for &T {
    fn natural_key(&self) -> Option<&str> {
        (**self).natural_key()
    }
}

/// Result of splitting a batch into new and already-known rows.
#[derive(Debug)]
pub struct Partition<T> {
    /// Rows to keep, in input order.
    pub fresh: Vec<T>,
    /// Rows dropped because their key is already stored.
    pub already_stored: usize,
    /// Rows dropped because an earlier row of the batch has the same key.
    pub repeated: usize,
}

/// Keeps the rows whose key is neither stored nor seen earlier in `items`.
///
/// `lookup` receives the distinct keys of the batch and returns the ones that
/// already exist. Rows without a key are kept.
pub fn partition_new<T, F>(items: Vec<T>, lookup: F) -> rusqlite::Result<Partition<T>>
where
    T: NaturalKey,
    F: FnOnce(&[&str]) -> rusqlite::Result<HashSet<String>>,
{
    let stored = {
        let mut seen: HashSet<&str> = HashSet::new();
        let distinct: Vec<&str> = items
            .iter()
            .filter_map(T::natural_key)
            .filter(|key| seen.insert(*key))
            .collect();
        if distinct.is_empty() {
            HashSet::new()
        } else {
            lookup(&distinct)?
        }
    };

    let mut emitted: HashSet<String> = HashSet::new();
    let mut already_stored = 0;
    let mut repeated = 0;
    let mut fresh = Vec::with_capacity(items.len());
    for item in items {
        // Repeats count as repeated, never as stored.
        let keep = match item.natural_key() {
            Some(key) if !emitted.insert(key.to_string()) => {
                repeated += 1;
                false
            }
            Some(key) if stored.contains(key) => {
                already_stored += 1;
                false
            }
            _ => true,
        };
        if keep {
            fresh.push(item);
        }
    }

    Ok(Partition {
        fresh,
        already_stored,
        repeated,
    })
}

/// Returns the subset of `voter_ids` present in the `voters` table.
pub fn existing_voter_ids(
    conn: &Connection,
    voter_ids: &[&str],
) -> rusqlite::Result<HashSet<String>> {
    let mut found = HashSet::new();
    for batch in voter_ids.chunks(LOOKUP_BATCH) {
        let placeholders = vec!["?"; batch.len()].join(",");
        let sql = format!(
            "SELECT voter_id FROM voters WHERE voter_id IN ({})",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(batch.iter()), |row| {
            row.get::<_, String>(0)
        })?;
        for voter_id in rows {
            found.insert(voter_id?);
        }
    }
    Ok(found)
}
