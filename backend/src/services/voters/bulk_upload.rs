use super::import::{self, ImportError, ImportOutcome, Upload};
use crate::session::Session;
use crate::state::AppState;
use actix_multipart::{Multipart, MultipartError};
use actix_web::{web, HttpResponse};
use common::responses::{
    Failure, ImportCompleted, ImportRejected, DATABASE_INSERT_ERROR, FK_VALIDATION_FAILED,
    NO_NEW_VOTERS, UNEXPECTED_ERROR, UNREADABLE_SPREADSHEET, VOTERS_PROCESSED,
};
use futures_util::StreamExt;
use log::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("{0}")]
    Multipart(#[from] MultipartError),
    #[error("upload exceeds the {0} byte limit")]
    TooLarge(usize),
}

/// HTTP handler for `POST /api/voters/bulk-upload`.
///
/// - `200 OK` with the inserted and skipped counts.
/// - `400 Bad Request` when the upload is missing or unreadable, when any row
///   fails validation (with the failing rows), when the insert transaction
///   fails, or when the tenant database cannot be read.
pub async fn process(
    session: Session,
    state: web::Data<AppState>,
    payload: Multipart,
) -> HttpResponse {
    let import_id = Uuid::new_v4();
    info!(
        "Voter bulk upload request received (user: {}, tenant: {}, import: {})",
        session.user_name, session.tenant, import_id
    );

    let upload = match read_upload(payload, state.max_upload_bytes).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            error!("No file uploaded for bulk upload (import: {})", import_id);
            return HttpResponse::BadRequest().body("No file uploaded.");
        }
        Err(e) => {
            error!("Could not read bulk upload (import: {}): {}", import_id, e);
            return HttpResponse::BadRequest().body(format!("Error: {}", e));
        }
    };
    info!(
        "Received {:?} ({} bytes) for import {}",
        upload.filename,
        upload.bytes.len(),
        import_id
    );

    let db = state.db.clone();
    let tenant = session.tenant.clone();
    let chunk_size = state.chunk_size;
    let handle = tokio::task::spawn_blocking(move || -> Result<ImportOutcome, ImportError> {
        let mut conn = db.open(&tenant).map_err(ImportError::Lookup)?;
        import::run(&mut conn, &upload, chunk_size)
    });

    match handle.await {
        Ok(result) => respond(import_id, result),
        Err(join_err) => {
            error!("Import {} did not finish: {}", import_id, join_err);
            HttpResponse::BadRequest().json(Failure::new(UNEXPECTED_ERROR, join_err))
        }
    }
}

/// Collects the `file` field of the form. Other fields are ignored.
async fn read_upload(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<Option<Upload>, UploadError> {
    let mut upload: Option<Upload> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        if field_name.as_deref() != Some("file") {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()));
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(UploadError::TooLarge(max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some(Upload { filename, bytes });
    }

    Ok(upload)
}

fn respond(import_id: Uuid, result: Result<ImportOutcome, ImportError>) -> HttpResponse {
    match result {
        Ok(ImportOutcome::NothingNew { skipped_duplicates }) => {
            info!(
                "Import {}: no new voters ({} already stored)",
                import_id, skipped_duplicates
            );
            HttpResponse::Ok().json(ImportCompleted {
                status: true,
                message: NO_NEW_VOTERS.to_string(),
                inserted: 0,
                skipped_duplicates,
            })
        }
        Ok(ImportOutcome::Committed {
            inserted,
            skipped_duplicates,
        }) => {
            info!(
                "Import {}: voters inserted successfully (inserted: {}, skipped: {})",
                import_id, inserted, skipped_duplicates
            );
            HttpResponse::Ok().json(ImportCompleted {
                status: true,
                message: VOTERS_PROCESSED.to_string(),
                inserted,
                skipped_duplicates,
            })
        }
        Err(ImportError::Validation(fk_invalid_rows)) => {
            warn!(
                "Import {}: validation failed for {} rows",
                import_id,
                fk_invalid_rows.len()
            );
            HttpResponse::BadRequest().json(ImportRejected {
                status: false,
                message: FK_VALIDATION_FAILED.to_string(),
                fk_invalid_rows,
            })
        }
        Err(ImportError::Decode(e)) => {
            error!("Import {}: {}", import_id, e);
            HttpResponse::BadRequest().json(Failure::new(UNREADABLE_SPREADSHEET, e))
        }
        Err(ImportError::Write(e)) => {
            error!("Import {}: insert rolled back: {}", import_id, e);
            HttpResponse::BadRequest().json(Failure::new(DATABASE_INSERT_ERROR, e))
        }
        Err(ImportError::Lookup(e)) => {
            error!("Import {}: {}", import_id, e);
            HttpResponse::BadRequest().json(Failure::new(UNEXPECTED_ERROR, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, Tenant};
    use crate::services::voters::configure_routes;
    use crate::session::{TENANT_HEADER, USER_HEADER};
    use crate::state::AppState;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use serde_json::Value;

    const BOUNDARY: &str = "voter-roll-test-boundary";

    fn multipart(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(field: &str, filename: &str, content: &[u8]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/voters/bulk-upload")
            .insert_header((TENANT_HEADER, "north"))
            .insert_header((USER_HEADER, "officer1"))
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart(field, filename, content))
    }

    fn state(dir: &tempfile::TempDir) -> AppState {
        let state = AppState {
            db: Database::new(dir.path()),
            chunk_size: 2,
            max_upload_bytes: 64 * 1024,
        };
        let conn = state.db.open(&tenant()).unwrap();
        conn.execute_batch(
            "INSERT INTO constituencies (id, code, name) VALUES (5, 'C5', 'North');
             INSERT INTO constituencies (id, code, name) VALUES (1, 'C1', 'South');
             INSERT INTO blocks (id, code, name) VALUES (1, 'B1', 'Hills'), (2, 'B2', 'Lake');
             INSERT INTO booths (id, code, name) VALUES (1, 'BT1', 'Hall');
             INSERT INTO parts (id, code, name) VALUES (1, 'P1', 'Ward');",
        )
        .unwrap();
        state
    }

    fn tenant() -> Tenant {
        Tenant::parse("north").unwrap()
    }

    fn voter_count(state: &AppState) -> i64 {
        state
            .db
            .open(&tenant())
            .unwrap()
            .query_row("SELECT COUNT(*) FROM voters", [], |r| r.get(0))
            .unwrap()
    }

    #[actix_web::test]
    async fn imports_then_skips_on_reupload() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .service(configure_routes()),
        )
        .await;
        let csv = b"voter_id,name,constituency_id\nV1,Asha,5\nV2,Ravi,5\nV3,Meena,\n";

        let resp = test::call_service(
            &app,
            upload_request("file", "voters.csv", csv).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], true);
        assert_eq!(body["inserted"], 3);
        assert_eq!(body["skipped_duplicates"], 0);

        let resp = test::call_service(
            &app,
            upload_request("file", "voters.csv", csv).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "No new voters to insert");
        assert_eq!(body["inserted"], 0);
        assert_eq!(body["skipped_duplicates"], 3);
        assert_eq!(voter_count(&state), 3);
    }

    #[actix_web::test]
    async fn bad_reference_returns_row_report() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .service(configure_routes()),
        )
        .await;
        let csv = b"voter_id,name,constituency_id\nV1,Asha,5\nV2,Ravi,999\n";

        let resp = test::call_service(
            &app,
            upload_request("file", "voters.csv", csv).to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], false);
        assert_eq!(
            body["message"],
            "Foreign key validation failed for some rows. Fix and re-upload."
        );
        assert_eq!(
            body["fkInvalidRows"],
            serde_json::json!([{
                "rowIndex": 3,
                "voter_id": "V2",
                "issues": ["constituency_id 999 not found"]
            }])
        );
        assert_eq!(voter_count(&state), 0);
    }

    #[actix_web::test]
    async fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(&dir)))
                .service(configure_routes()),
        )
        .await;

        let resp = test::call_service(
            &app,
            upload_request("attachment", "voters.csv", b"voter_id,name\n").to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(resp).await, "No file uploaded.");
    }

    #[actix_web::test]
    async fn insert_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        state
            .db
            .open(&tenant())
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_v3 BEFORE INSERT ON voters
                 WHEN NEW.voter_id = 'V3'
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .service(configure_routes()),
        )
        .await;
        let csv = b"voter_id,name\nV1,Asha\nV2,Ravi\nV3,Meena\n";

        let resp = test::call_service(
            &app,
            upload_request("file", "voters.csv", csv).to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Database insert error");
        assert!(body["error"].as_str().unwrap().contains("disk full"));
        assert_eq!(voter_count(&state), 0);
    }

    #[actix_web::test]
    async fn workbook_upload_is_imported() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .service(configure_routes()),
        )
        .await;
        let workbook =
            include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/voters.xlsx"));

        let resp = test::call_service(
            &app,
            upload_request("file", "voters.xlsx", workbook).to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["inserted"], 3);
        assert_eq!(voter_count(&state), 3);
    }

    #[actix_web::test]
    async fn unreadable_spreadsheet_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(&dir)))
                .service(configure_routes()),
        )
        .await;

        let resp = test::call_service(
            &app,
            upload_request("file", "voters.xlsx", b"plain text").to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Unable to read spreadsheet");
    }

    #[actix_web::test]
    async fn oversized_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state(&dir);
        state.max_upload_bytes = 16;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .service(configure_routes()),
        )
        .await;

        let resp = test::call_service(
            &app,
            upload_request("file", "voters.csv", b"voter_id,name\nV1,Asha\nV2,Ravi\n").to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(voter_count(&state), 0);
    }

    #[actix_web::test]
    async fn unreachable_tenant_store_is_a_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("occupied");
        std::fs::write(&not_a_dir, b"").unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState {
                    db: Database::new(&not_a_dir),
                    chunk_size: 2,
                    max_upload_bytes: 64 * 1024,
                }))
                .service(configure_routes()),
        )
        .await;

        let resp = test::call_service(
            &app,
            upload_request("file", "voters.csv", b"voter_id,name\nV1,Asha\n").to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], false);
        assert_eq!(body["message"], "Unexpected server error");
    }

    #[actix_web::test]
    async fn session_headers_are_required() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(&dir)))
                .service(configure_routes()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/voters/bulk-upload")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart("file", "voters.csv", b"voter_id,name\nV1,Asha\n"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
