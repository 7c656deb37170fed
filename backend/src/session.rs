//! The caller identity established by the authentication middleware in front of
//! this service.
//!
//! The middleware verifies the caller's token and forwards two headers:
//! - `x-tenant-db`: which tenant database the request operates on.
//! - `x-user-name`: the acting user, used for logging.

use crate::db::Tenant;
use actix_web::dev::Payload;
use actix_web::{error, Error, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

pub const TENANT_HEADER: &str = "x-tenant-db";
pub const USER_HEADER: &str = "x-user-name";

#[derive(Debug, Clone)]
pub struct Session {
    pub tenant: Tenant,
    pub user_name: String,
}

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn session_from_request(req: &HttpRequest) -> Result<Session, Error> {
    let tenant = header_value(req, TENANT_HEADER)
        .ok_or_else(|| error::ErrorUnauthorized("Missing tenant database"))?;
    let tenant = Tenant::parse(tenant).map_err(error::ErrorUnauthorized)?;
    let user_name = header_value(req, USER_HEADER)
        .ok_or_else(|| error::ErrorUnauthorized("Missing user identity"))?;

    Ok(Session {
        tenant,
        user_name: user_name.to_string(),
    })
}

impl FromRequest for Session {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(session_from_request(req))
    }
}
