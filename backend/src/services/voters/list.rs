use crate::session::Session;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use common::model::voter::{VoterListing, VoterRecord};
use common::responses::{Failure, VoterList, UNEXPECTED_ERROR};
use log::{error, info, warn};
use rusqlite::{Connection, Row};

const LIST_ACTIVE_VOTERS: &str = "
    SELECT v.id, v.constituency_id, v.block_id, v.booth_id, v.part_id, v.voter_id,
           v.name, v.father_husband_name, v.photo, v.age, v.gender, v.house_no,
           v.address, v.phone, v.email, v.polling_station, v.notes,
           c.code, c.name, b.code, b.name, bt.code, bt.name, p.code, p.name
    FROM voters v
    LEFT JOIN constituencies c ON v.constituency_id = c.id
    LEFT JOIN blocks b ON v.block_id = b.id
    LEFT JOIN booths bt ON v.booth_id = bt.id
    LEFT JOIN parts p ON v.part_id = p.id
    WHERE v.is_active = 1
    ORDER BY v.id";

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<VoterListing> {
    Ok(VoterListing {
        id: row.get(0)?,
        record: VoterRecord {
            constituency_id: row.get(1)?,
            block_id: row.get(2)?,
            booth_id: row.get(3)?,
            part_id: row.get(4)?,
            voter_id: row.get(5)?,
            name: row.get(6)?,
            father_husband_name: row.get(7)?,
            photo: row.get(8)?,
            age: row.get(9)?,
            gender: row.get(10)?,
            house_no: row.get(11)?,
            address: row.get(12)?,
            phone: row.get(13)?,
            email: row.get(14)?,
            polling_station: row.get(15)?,
            notes: row.get(16)?,
        },
        constituencies_code: row.get(17)?,
        constituencies_name: row.get(18)?,
        block_code: row.get(19)?,
        block_name: row.get(20)?,
        booth_code: row.get(21)?,
        booth_name: row.get(22)?,
        part_code: row.get(23)?,
        part_name: row.get(24)?,
    })
}

/// Fetches every active voter joined with their reference data.
pub fn list_active_voters(conn: &Connection) -> rusqlite::Result<Vec<VoterListing>> {
    let mut stmt = conn.prepare(LIST_ACTIVE_VOTERS)?;
    let voters = stmt
        .query_map([], listing_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(voters)
}

/// HTTP handler for `GET /api/voters`.
///
/// Responds `400 Bad Request` with an empty `data` array when the tenant has no
/// active voters.
pub async fn process(session: Session, state: web::Data<AppState>) -> HttpResponse {
    info!(
        "Voters list request received (user: {}, tenant: {})",
        session.user_name, session.tenant
    );

    let db = state.db.clone();
    let tenant = session.tenant.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.open(&tenant)?;
        list_active_voters(&conn)
    })
    .await;

    match result {
        Ok(Ok(voters)) if !voters.is_empty() => {
            info!("Voters list retrieved successfully ({} voters)", voters.len());
            HttpResponse::Ok().json(VoterList {
                message: "Voters list retrieved successfully".to_string(),
                data: voters,
                status: true,
            })
        }
        Ok(Ok(_)) => {
            warn!("No voters found for tenant {}", session.tenant);
            HttpResponse::BadRequest().json(VoterList {
                message: "No Voters list found".to_string(),
                data: Vec::new(),
                status: false,
            })
        }
        Ok(Err(e)) => {
            error!("Error fetching voters list: {}", e);
            HttpResponse::InternalServerError().json(Failure::new(UNEXPECTED_ERROR, e))
        }
        Err(join_err) => {
            error!("Voters list task did not finish: {}", join_err);
            HttpResponse::InternalServerError().json(Failure::new(UNEXPECTED_ERROR, join_err))
        }
    }
}
