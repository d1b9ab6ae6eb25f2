use crate::{
    authentication::cryptography::hash_password,
    error::ApiError,
    form::UserForm,
    pagination::{Page, Paginated},
    schema::{CountedProfile, Id, User, UserProfile},
};

use sqlx::{Pool, Postgres};

/// Profile columns of `users u`; `$1` is the viewer id (NULL when anonymous).
/// `is_subscribed` is false for anonymous viewers and on the own profile,
/// since follows never point at their owner.
pub(crate) const PROFILE_COLUMNS: &str = "
    u.email, u.id, u.username, u.first_name, u.last_name,
    EXISTS (SELECT 1 FROM follows f WHERE f.user_id = $1 AND f.author_id = u.id) AS is_subscribed
";

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(form: &UserForm, pool: &Pool<Postgres>) -> Result<UserProfile, ApiError> {
    let password = hash_password(&form.password)?;

    let row: Option<UserProfile> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        RETURNING email, id, username, first_name, last_name, FALSE AS is_subscribed
    ",
    )
    .bind(form.email.trim())
    .bind(form.username.trim())
    .bind(form.first_name.trim())
    .bind(form.last_name.trim())
    .bind(password)
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| ApiError::conflict("A user with that email or username already exists"))
}

pub async fn get_profile(
    viewer: Option<Id>,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<UserProfile>, ApiError> {
    let row: Option<UserProfile> =
        sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = $2"))
            .bind(viewer)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

pub async fn get_profiles(
    viewer: Option<Id>,
    user_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<UserProfile>, ApiError> {
    let rows: Vec<UserProfile> =
        sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = ANY($2)"))
            .bind(viewer)
            .bind(user_ids)
            .fetch_all(pool)
            .await?;

    Ok(rows)
}

pub async fn fetch_profiles(
    viewer: Option<Id>,
    page: Page,
    pool: &Pool<Postgres>,
) -> Result<Paginated<UserProfile>, ApiError> {
    let rows: Vec<CountedProfile> = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS}, COUNT(*) OVER() AS count FROM users u ORDER BY u.username LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = rows.first().map(|p| p.count).unwrap_or(0);
    let page = Paginated::from_rows(rows, total_count, page)?;

    Ok(page.map(|row| row.profile))
}
