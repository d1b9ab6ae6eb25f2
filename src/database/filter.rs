use sqlx::{Postgres, QueryBuilder};

use super::{error::ApiError, schema::Id};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ApiError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ApiError::validation(format!("Invalid value for {key}"))),
    }
}

impl RecipeFilter {
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut filter = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "tags" => filter.tags.push(value.to_owned()),
                "author" => {
                    filter.author = Some(
                        value
                            .parse()
                            .map_err(|_| ApiError::validation("Invalid value for author"))?,
                    );
                }
                "is_favorited" => filter.is_favorited = parse_flag(key, value)?,
                "is_in_shopping_cart" => filter.is_in_shopping_cart = parse_flag(key, value)?,
                _ => {}
            }
        }

        Ok(filter)
    }

    /// Appends the WHERE clause for recipes aliased as `r`. Different keys
    /// combine with AND, repeated tags with OR. Viewer flags never match for
    /// anonymous viewers.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>, viewer: Option<Id>) {
        builder.push(" WHERE TRUE");

        if !self.tags.is_empty() {
            builder
                .push(" AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
                .push_bind(self.tags.clone())
                .push("))");
        }

        if let Some(author) = self.author {
            builder.push(" AND r.author_id = ").push_bind(author);
        }

        match viewer {
            Some(viewer) => {
                if self.is_favorited {
                    builder
                        .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                        .push_bind(viewer)
                        .push(")");
                }
                if self.is_in_shopping_cart {
                    builder
                        .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                        .push_bind(viewer)
                        .push(")");
                }
            }
            None => {
                if self.is_favorited || self.is_in_shopping_cart {
                    builder.push(" AND FALSE");
                }
            }
        }
    }
}

/// Case-insensitive prefix pattern for `ILIKE`.
pub fn prefix_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 1);
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
