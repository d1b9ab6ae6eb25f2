use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use log::error;
use rand::rngs::OsRng;

use crate::error::ApiError;

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {e}");
            ApiError::Internal(String::from("Failed to store password"))
        })
}
