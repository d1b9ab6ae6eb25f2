use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use log::{debug, error};
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::ApiError;
use crate::schema::{Id, User, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// The resolved identity of an authenticated request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::PermissionDenied(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            role: value.role,
        }
    }
}

fn signing_key(secret: &[u8]) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret).map_err(|e| {
        error!("Invalid session key: {e}");
        ApiError::Internal(String::from("Session key is misconfigured"))
    })
}

pub fn generate_jwt_session(
    user: &User,
    secret: &[u8],
    lifetime: Duration,
) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role, lifetime);

    claims.sign_with_key(&key).map_err(|e| {
        error!("Failed to sign session: {e}");
        ApiError::Internal(String::from("Failed to create session"))
    })
}

pub fn verify_jwt_session(token: &str, secret: &[u8]) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token.verify_with_key(&key).map_err(|e| {
        debug!("Rejected session token: {e}");
        ApiError::Unauthorized(String::from("Invalid session; Invalid token"))
    })?;

    if session.exp < Local::now().timestamp() {
        return Err(ApiError::Unauthorized(String::from(
            "Invalid session; Token expired",
        )));
    }

    Ok(session)
}
