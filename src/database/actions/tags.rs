use crate::{
    error::ApiError,
    form::{TagForm, TagPatch},
    schema::{Id, LinkedTag, Tag},
};

use sqlx::{Pool, Postgres};

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

/// Expects a form that went through [`TagForm::normalize`].
pub async fn create_tag(form: &TagForm, pool: &Pool<Postgres>) -> Result<Tag, ApiError> {
    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(form.name.trim())
    .bind(&form.color)
    .bind(&form.slug)
    .fetch_optional(pool)
    .await?;

    tag.ok_or_else(|| ApiError::conflict("A tag with that name, color or slug already exists"))
}

pub async fn update_tag(id: Id, patch: &TagPatch, pool: &Pool<Postgres>) -> Result<Tag, ApiError> {
    let tag: Option<Tag> = sqlx::query_as(
        "
        UPDATE tags SET
            name = COALESCE($2, name),
            color = COALESCE($3, color),
            slug = COALESCE($4, slug)
        WHERE id = $1
        RETURNING *
    ",
    )
    .bind(id)
    .bind(patch.name.as_deref().map(str::trim))
    .bind(patch.color.as_deref())
    .bind(patch.slug.as_deref())
    .fetch_optional(pool)
    .await?;

    tag.ok_or_else(|| ApiError::not_found("No tag exists with specified id"))
}

/// Tags still attached to a recipe are kept.
pub async fn delete_tag(id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    let in_use: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM recipe_tags WHERE tag_id = $1 LIMIT 1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    if in_use.is_some() {
        return Err(ApiError::conflict("Tag is still used by recipes"));
    }

    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("No tag exists with specified id"));
    }

    Ok(())
}

pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedTag>, ApiError> {
    let list: Vec<LinkedTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(list)
}
