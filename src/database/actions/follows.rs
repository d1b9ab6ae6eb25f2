use std::collections::HashMap;

use crate::{
    error::ApiError,
    pagination::{Page, Paginated},
    schema::{AuthoredSummary, CountedProfile, Id, RecipeSummary, Subscription, UserProfile},
};

use super::users::{get_profile, get_user_by_id, PROFILE_COLUMNS};

use sqlx::{Pool, Postgres};

pub async fn follow(
    user_id: Id,
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, ApiError> {
    if user_id == author_id {
        return Err(ApiError::validation("You cannot subscribe to yourself"));
    }
    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ApiError::not_found("No user exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("You are already subscribed to this user"));
    }

    let profile = get_profile(Some(user_id), author_id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No user exists with specified id"))?;

    let mut subscriptions = attach_recipes(vec![profile], recipes_limit, pool).await?;
    subscriptions
        .pop()
        .ok_or_else(|| ApiError::Internal(String::from("Subscription went missing")))
}

pub async fn unfollow(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ApiError::not_found("No user exists with specified id"));
    }

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::validation("You are not subscribed to this user"));
    }

    Ok(())
}

pub async fn fetch_subscriptions(
    user_id: Id,
    page: Page,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Paginated<Subscription>, ApiError> {
    let rows: Vec<CountedProfile> = sqlx::query_as(&format!(
        "
        SELECT {PROFILE_COLUMNS}, COUNT(*) OVER() AS count
        FROM follows s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    "
    ))
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total_count = rows.first().map(|p| p.count).unwrap_or(0);
    let page = Paginated::from_rows(rows, total_count, page)?;
    let profiles: Vec<UserProfile> = page.results.into_iter().map(|row| row.profile).collect();

    Ok(Paginated {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results: attach_recipes(profiles, recipes_limit, pool).await?,
    })
}

/// Loads each author's recipes, newest first; `recipes_limit` only trims the
/// embedded list, `recipes_count` is always the full count.
async fn attach_recipes(
    profiles: Vec<UserProfile>,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Subscription>, ApiError> {
    let author_ids: Vec<Id> = profiles.iter().map(|p| p.id).collect();

    let rows: Vec<AuthoredSummary> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time
        FROM recipes
        WHERE author_id = ANY($1)
        ORDER BY pub_date DESC, id DESC
    ",
    )
    .bind(&author_ids)
    .fetch_all(pool)
    .await?;

    let mut recipes: HashMap<Id, Vec<RecipeSummary>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        recipes.entry(row.author_id).or_default().push(row.summary);
    });

    Ok(profiles
        .into_iter()
        .map(|profile| {
            let mut recipes = recipes.remove(&profile.id).unwrap_or_default();
            let recipes_count = recipes.len() as i64;
            if let Some(limit) = recipes_limit {
                recipes.truncate(limit.max(0) as usize);
            }

            Subscription {
                profile,
                recipes,
                recipes_count,
            }
        })
        .collect())
}
