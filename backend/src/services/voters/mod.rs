//! Voter endpoints.
//!
//! - `POST /api/voters/bulk-upload`: multipart upload with a single `file` field
//!   holding a spreadsheet (xlsx, xls, ods or csv). The rows are validated and
//!   inserted as described in [`import`]. Responds with the inserted and skipped
//!   counts, or with the rows that failed validation.
//! - `GET /api/voters`: every active voter with the code and name of their
//!   constituency, block, booth and part.
//!
//! Both routes require the session headers described in `crate::session`.

use actix_web::web::{get, post, scope};
use actix_web::Scope;

mod bulk_upload;
pub mod import;
mod list;

const API_PATH: &str = "/api/voters";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::process))
        .route("/bulk-upload", post().to(bulk_upload::process))
}
