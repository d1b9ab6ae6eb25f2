use std::collections::{HashMap, HashSet};

use crate::{
    error::ApiError,
    filter::RecipeFilter,
    form::{IngredientAmount, RecipeForm, RecipePatch},
    jwt::SessionData,
    pagination::{Page, Paginated},
    permissions::can_edit_recipe,
    schema::{CountedRecipe, Id, Recipe, RecipeDetail, RecipeIngredient, Tag, UserProfile},
};

use super::{
    marks::{marked_recipes, MarkKind},
    tags::list_recipe_tags,
    users::get_profiles,
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches a recipe the session is allowed to modify.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No recipe exists with specified id"))?;

    if !can_edit_recipe(session, &recipe) {
        return Err(ApiError::PermissionDenied(String::from(
            "You can only modify your own recipes",
        )));
    }

    Ok(recipe)
}

async fn ensure_tags_exist(tags: &[Id], conn: &mut PgConnection) -> Result<(), ApiError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(tags)
        .fetch_one(&mut *conn)
        .await?;

    if count != tags.len() as i64 {
        return Err(ApiError::validation("Unknown tag id"));
    }
    Ok(())
}

async fn ensure_ingredients_exist(
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    let ids: Vec<Id> = ingredients.iter().map(|i| i.id).collect();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_one(&mut *conn)
        .await?;

    if count != ids.len() as i64 {
        return Err(ApiError::validation("Unknown ingredient id"));
    }
    Ok(())
}

async fn replace_tags(recipe_id: Id, tags: &[Id], conn: &mut PgConnection) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) SELECT $1, UNNEST($2::int4[])")
        .bind(recipe_id)
        .bind(tags)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Makes the recipe's ingredient lines exactly `ingredients`: listed lines
/// are inserted or get their amount updated, unlisted ones are removed.
async fn set_ingredients(
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    let (ids, amounts): (Vec<Id>, Vec<i32>) =
        ingredients.iter().map(|i| (i.id, i.amount)).unzip();

    sqlx::query(
        "
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, t.ingredient_id, t.amount FROM UNNEST($2::int4[], $3::int4[]) AS t(ingredient_id, amount)
        ON CONFLICT (recipe_id, ingredient_id) DO UPDATE SET amount = EXCLUDED.amount
    ",
    )
    .bind(recipe_id)
    .bind(&ids)
    .bind(&amounts)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "DELETE FROM recipe_ingredients WHERE recipe_id = $1 AND NOT (ingredient_id = ANY($2))",
    )
    .bind(recipe_id)
    .bind(&ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Creates the recipe with its tags and ingredient lines in one transaction.
/// `image` is the stored image path.
pub async fn create_recipe(
    author_id: Id,
    form: &RecipeForm,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Id, ApiError> {
    let mut tx = pool.begin().await?;

    ensure_tags_exist(&form.tags, &mut tx).await?;
    ensure_ingredients_exist(&form.ingredients, &mut tx).await?;

    let (id,): (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(form.name.trim())
    .bind(image)
    .bind(&form.text)
    .bind(form.cooking_time)
    .fetch_one(&mut *tx)
    .await?;

    replace_tags(id, &form.tags, &mut tx).await?;
    set_ingredients(id, &form.ingredients, &mut tx).await?;

    tx.commit().await?;
    Ok(id)
}

/// Applies the supplied fields; a supplied tag or ingredient list replaces
/// the current one.
pub async fn update_recipe(
    id: Id,
    patch: &RecipePatch,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($2, name),
            image = COALESCE($3, image),
            text = COALESCE($4, text),
            cooking_time = COALESCE($5, cooking_time)
        WHERE id = $1
    ",
    )
    .bind(id)
    .bind(patch.name.as_deref().map(str::trim))
    .bind(image)
    .bind(patch.text.as_deref())
    .bind(patch.cooking_time)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("No recipe exists with specified id"));
    }

    if let Some(tags) = &patch.tags {
        ensure_tags_exist(tags, &mut tx).await?;
        replace_tags(id, tags, &mut tx).await?;
    }
    if let Some(ingredients) = &patch.ingredients {
        ensure_ingredients_exist(ingredients, &mut tx).await?;
        set_ingredients(id, ingredients, &mut tx).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Tag links, ingredient lines and marks go with the recipe.
pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("No recipe exists with specified id"));
    }

    Ok(())
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    page: Page,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Paginated<RecipeDetail>, ApiError> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r");
    filter.push_where(&mut query_builder, viewer);
    query_builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<CountedRecipe> = query_builder.build_query_as().fetch_all(pool).await?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let page = Paginated::from_rows(rows, total_count, page)?;
    let recipes: Vec<Recipe> = page.results.into_iter().map(|row| row.recipe).collect();

    Ok(Paginated {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results: attach_details(recipes, viewer, pool).await?,
    })
}

pub async fn get_recipe_detail(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, ApiError> {
    let Some(recipe) = get_recipe(id, pool).await? else {
        return Ok(None);
    };

    let mut details = attach_details(vec![recipe], viewer, pool).await?;
    Ok(details.pop())
}

pub async fn list_recipe_ingredients(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, ApiError> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.name, i.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Batch loads authors, tags, ingredient lines and the viewer's marks for a
/// page of recipes, keeping the input order.
async fn attach_details(
    recipes: Vec<Recipe>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, ApiError> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = recipes.iter().map(|r| r.id).collect();
    let author_ids: Vec<Id> = recipes
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors: HashMap<Id, UserProfile> = get_profiles(viewer, &author_ids, pool)
        .await?
        .into_iter()
        .map(|profile| (profile.id, profile))
        .collect();

    let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
    list_recipe_tags(&recipe_ids, pool)
        .await?
        .into_iter()
        .for_each(|linked| tags.entry(linked.recipe_id).or_default().push(linked.tag));

    let mut ingredients: HashMap<Id, Vec<RecipeIngredient>> = HashMap::new();
    list_recipe_ingredients(&recipe_ids, pool)
        .await?
        .into_iter()
        .for_each(|line| ingredients.entry(line.recipe_id).or_default().push(line));

    let favorited = marked_recipes(MarkKind::Favorite, viewer, &recipe_ids, pool).await?;
    let in_cart = marked_recipes(MarkKind::ShoppingCart, viewer, &recipe_ids, pool).await?;

    recipes
        .into_iter()
        .map(|recipe| -> Result<RecipeDetail, ApiError> {
            let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                ApiError::Internal(format!("Author of recipe {} is missing", recipe.id))
            })?;

            Ok(RecipeDetail {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author,
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}
