use std::collections::HashSet;

use crate::{
    error::ApiError,
    schema::{Id, RecipeSummary},
};

use sqlx::{Pool, Postgres};

/// Per-user recipe marks, one table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
    Favorite,
    ShoppingCart,
}

impl MarkKind {
    fn table(self) -> &'static str {
        match self {
            MarkKind::Favorite => "favorites",
            MarkKind::ShoppingCart => "shopping_cart",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MarkKind::Favorite => "favorites",
            MarkKind::ShoppingCart => "shopping cart",
        }
    }
}

async fn get_recipe_summary(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeSummary>, ApiError> {
    let row: Option<RecipeSummary> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

pub async fn add_mark(
    kind: MarkKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, ApiError> {
    let summary = get_recipe_summary(recipe_id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No recipe exists with specified id"))?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict(format!(
            "Recipe is already in your {}",
            kind.description()
        )));
    }

    Ok(summary)
}

pub async fn remove_mark(
    kind: MarkKind,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    if get_recipe_summary(recipe_id, pool).await?.is_none() {
        return Err(ApiError::not_found("No recipe exists with specified id"));
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(format!(
            "Recipe is not in your {}",
            kind.description()
        )));
    }

    Ok(())
}

/// The subset of `recipe_ids` the viewer has marked. Anonymous viewers
/// have no marks.
pub async fn marked_recipes(
    kind: MarkKind,
    viewer: Option<Id>,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    let Some(viewer) = viewer else {
        return Ok(HashSet::new());
    };
    if recipe_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        kind.table()
    ))
    .bind(viewer)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
