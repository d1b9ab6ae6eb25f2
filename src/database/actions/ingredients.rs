use std::io::Read;

use log::info;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    constants::INGREDIENT_INSERT_CHUNK,
    error::ApiError,
    filter::prefix_pattern,
    schema::{Id, Ingredient, NewIngredient},
};

/// Lists ingredients ordered by name; `search` matches a case-insensitive
/// name prefix.
pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(search) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, id")
                .bind(prefix_pattern(search))
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Parses `name,measurement_unit` rows; the first line is a header.
pub fn parse_ingredient_csv<R: Read>(reader: R) -> Result<Vec<NewIngredient>, ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut ingredients = Vec::new();
    for (index, record) in reader.records().enumerate() {
        // header is line 1
        let line = index + 2;
        let record = record
            .map_err(|e| ApiError::validation(format!("Malformed line {line}: {e}")))?;

        match (record.get(0), record.get(1)) {
            (Some(name), Some(unit)) if !name.is_empty() && !unit.is_empty() => {
                ingredients.push(NewIngredient {
                    name: name.to_owned(),
                    measurement_unit: unit.to_owned(),
                });
            }
            _ => {
                return Err(ApiError::validation(format!(
                    "Line {line} must contain a name and a measurement unit"
                )))
            }
        }
    }

    Ok(ingredients)
}

/// Bulk loads the ingredient catalog in a single transaction.
pub async fn load_ingredients<R: Read>(reader: R, pool: &Pool<Postgres>) -> Result<u64, ApiError> {
    let ingredients = parse_ingredient_csv(reader)?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for chunk in ingredients.chunks(INGREDIENT_INSERT_CHUNK) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");
        query_builder.push_values(chunk, |mut b, ingredient| {
            b.push_bind(&ingredient.name)
                .push_bind(&ingredient.measurement_unit);
        });

        inserted += query_builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    info!("Loaded {inserted} ingredients");

    Ok(inserted)
}
