//! Foreign-key validation of candidate voters against the reference tables.
//!
//! The identifiers referenced by a batch are looked up once per table before
//! any row is checked ([`ReferenceSet::fetch`]). Rows are then validated against
//! that snapshot; a reference deleted while the import runs is not noticed.

use super::candidate::{Candidate, ForeignId, ReferenceKind};
use common::model::row_issue::RowIssue;
use common::model::voter::{normalize_gender, VoterRecord};
use rayon::prelude::*;
use rusqlite::{params_from_iter, Connection};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Identifiers known to exist in each reference table.
#[derive(Debug, Default)]
pub struct ReferenceSet {
    members: HashMap<ReferenceKind, HashSet<i64>>,
}

impl ReferenceSet {
    /// Looks up every distinct identifier the candidates reference. Tables no
    /// candidate points at are not queried.
    pub fn fetch(conn: &Connection, candidates: &[Candidate]) -> rusqlite::Result<Self> {
        let mut members = HashMap::new();
        for kind in ReferenceKind::ALL {
            let requested: BTreeSet<i64> = candidates
                .iter()
                .filter_map(|c| c.reference(kind).and_then(ForeignId::id))
                .collect();
            if requested.is_empty() {
                continue;
            }
            let found = existing_ids(conn, kind, &requested)?;
            log::debug!(
                "{}: {} of {} referenced ids exist",
                kind.table(),
                found.len(),
                requested.len()
            );
            members.insert(kind, found);
        }
        Ok(Self { members })
    }

    pub fn contains(&self, kind: ReferenceKind, id: i64) -> bool {
        self.members
            .get(&kind)
            .map(|ids| ids.contains(&id))
            .unwrap_or(false)
    }
}

fn existing_ids(
    conn: &Connection,
    kind: ReferenceKind,
    requested: &BTreeSet<i64>,
) -> rusqlite::Result<HashSet<i64>> {
    let ids: Vec<i64> = requested.iter().copied().collect();
    let mut found = HashSet::new();
    for batch in ids.chunks(500) {
        let sql = format!(
            "SELECT id FROM {} WHERE id IN ({})",
            kind.table(),
            vec!["?"; batch.len()].join(",")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(batch.iter()), |row| row.get::<_, i64>(0))?;
        for id in rows {
            found.insert(id?);
        }
    }
    Ok(found)
}

/// Checks one candidate, returning the record to insert or every problem found.
fn check(candidate: Candidate, references: &ReferenceSet) -> Result<VoterRecord, RowIssue> {
    let mut issues = Vec::new();

    if candidate.voter_id.is_none() {
        issues.push("voter_id is required".to_string());
    }
    if candidate.name.is_none() {
        issues.push("name is required".to_string());
    }

    let mut ids = [None; 4];
    for (slot, kind) in ids.iter_mut().zip(ReferenceKind::ALL) {
        match candidate.reference(kind) {
            None => {}
            Some(ForeignId::Id(id)) if references.contains(kind, *id) => *slot = Some(*id),
            Some(ForeignId::Id(id)) => issues.push(format!("{} {} not found", kind.column(), id)),
            Some(ForeignId::Malformed(raw)) => {
                issues.push(format!("{} {} is not a valid id", kind.column(), raw))
            }
        }
    }

    let age = match &candidate.age {
        None => None,
        Some(cell) => match cell.to_integer() {
            Some(age) => Some(age),
            None => {
                issues.push(format!("age {} is not a number", cell.to_text()));
                None
            }
        },
    };

    match (candidate.voter_id, candidate.name) {
        (Some(voter_id), Some(name)) if issues.is_empty() => {
            let [constituency_id, block_id, booth_id, part_id] = ids;
            Ok(VoterRecord {
                constituency_id,
                block_id,
                booth_id,
                part_id,
                voter_id,
                name,
                father_husband_name: candidate.father_husband_name,
                photo: candidate.photo,
                age,
                gender: normalize_gender(candidate.gender.as_deref()),
                house_no: candidate.house_no,
                address: candidate.address,
                phone: candidate.phone,
                email: candidate.email,
                polling_station: candidate.polling_station,
                notes: candidate.notes,
            })
        }
        (voter_id, _) => Err(RowIssue {
            row_index: candidate.row_number,
            voter_id,
            issues,
        }),
    }
}

/// Validates every candidate. Either all pass and come back as records in
/// input order, or the failing rows come back in sheet order.
pub fn validate(
    candidates: Vec<Candidate>,
    references: &ReferenceSet,
) -> Result<Vec<VoterRecord>, Vec<RowIssue>> {
    let checked: Vec<Result<VoterRecord, RowIssue>> = candidates
        .into_par_iter()
        .map(|candidate| check(candidate, references))
        .collect();

    let mut records = Vec::with_capacity(checked.len());
    let mut invalid = Vec::new();
    for result in checked {
        match result {
            Ok(record) => records.push(record),
            Err(issue) => invalid.push(issue),
        }
    }

    if invalid.is_empty() {
        Ok(records)
    } else {
        Err(invalid)
    }
}
