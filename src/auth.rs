//! Request identity. Sign-in itself happens upstream; by the time a request
//! reaches us the gateway has put the user id in `X-User-Id`.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::domain::UserSummary;
use crate::error::{EventsError, Result};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: Option<String>,
}

impl CurrentUser {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Some(Self {
            id: header(USER_ID_HEADER)?,
            name: header(USER_NAME_HEADER),
        })
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            image: None,
        }
    }
}

/// Checks `Authorization: Bearer <token>` against the configured admin token.
/// With no token configured every request is let through.
pub fn authorize_admin(headers: &HeaderMap, admin_token: Option<&str>) -> Result<()> {
    let Some(expected) = admin_token else {
        return Ok(());
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(EventsError::Unauthorized(
            "admin token required".to_string(),
        )),
    }
}
