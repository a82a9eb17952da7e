//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the caller's
//! external user id in `X-User-Id`.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};

use crate::error::{unauthorized, ApiError};

pub const USER_ID_HEADER: &str = "X-User-Id";

/// External id of the user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        ready(match user_id {
            Some(user_id) => Ok(CurrentUser(user_id.to_string())),
            None => Err(unauthorized(format!("missing {USER_ID_HEADER} header"))),
        })
    }
}
