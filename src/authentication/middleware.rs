use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, SessionData};
use crate::error::ApiError;

/// Accepts `Token <jwt>` and `Bearer <jwt>`.
fn extract_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }

    match scheme {
        "Token" | "Bearer" => Some(token),
        _ => None,
    }
}

fn resolve_session(header: &str, secret: &[u8]) -> Result<SessionData, ApiError> {
    let token = extract_token(header).ok_or_else(|| {
        ApiError::Unauthorized(String::from("Invalid session; Malformed authorization header"))
    })?;

    verify_jwt_session(token, secret).map(SessionData::from)
}

pub fn with_session(
    secret: Arc<[u8]>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            match header {
                Some(header) => resolve_session(&header, &secret).map_err(warp::reject::custom),
                None => Err(warp::reject::custom(ApiError::Unauthorized(String::from(
                    "Authentication credentials were not provided",
                )))),
            }
        }
    })
}

/// Anonymous when no header is sent; a header that fails to verify is
/// still rejected.
pub fn with_possible_session(
    secret: Arc<[u8]>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let secret = secret.clone();
        async move {
            match header {
                Some(header) => resolve_session(&header, &secret)
                    .map(Some)
                    .map_err(warp::reject::custom),
                None => Ok(None),
            }
        }
    })
}
