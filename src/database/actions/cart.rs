use crate::{
    error::ApiError,
    schema::{CartIngredientRow, Id},
    shopping::ShoppingList,
};

use sqlx::{Pool, Postgres};

/// Every ingredient line of every recipe in the user's cart, unaggregated.
pub async fn list_cart_ingredients(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredientRow>, ApiError> {
    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn build_shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, ApiError> {
    let rows = list_cart_ingredients(user_id, pool).await?;
    Ok(ShoppingList::aggregate(rows))
}
