use std::collections::HashSet;

use serde::Deserialize;

use super::{colors::to_color_name, error::ApiError, schema::Id};
use crate::constants::{EMAIL_MAX_LENGTH, NAME_MAX_LENGTH, USER_FIELD_MAX_LENGTH};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RecipeForm {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Partial update; only the supplied fields change.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipePatch {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<Id>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TagForm {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub slug: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

pub fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), ApiError> {
    if ingredients.is_empty() {
        return Err(ApiError::validation("At least one ingredient is required"));
    }

    let mut seen = HashSet::new();
    for ingredient in ingredients {
        if ingredient.amount < 1 {
            return Err(ApiError::validation(format!(
                "Amount of ingredient {} must be at least 1",
                ingredient.id
            )));
        }
        if !seen.insert(ingredient.id) {
            return Err(ApiError::validation(format!(
                "Ingredient {} is listed more than once",
                ingredient.id
            )));
        }
    }

    Ok(())
}

pub fn validate_tags(tags: &[Id]) -> Result<(), ApiError> {
    if tags.is_empty() {
        return Err(ApiError::validation("At least one tag is required"));
    }

    let mut seen = HashSet::new();
    if let Some(tag) = tags.iter().find(|tag| !seen.insert(**tag)) {
        return Err(ApiError::validation(format!(
            "Tag {tag} is listed more than once"
        )));
    }

    Ok(())
}

fn validate_text_field(field: &str, value: &str, max_length: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("Field {field} may not be blank")));
    }
    if value.chars().count() > max_length {
        return Err(ApiError::validation(format!(
            "Field {field} may not be longer than {max_length} characters"
        )));
    }
    Ok(())
}

fn validate_cooking_time(cooking_time: i32) -> Result<(), ApiError> {
    if cooking_time < 1 {
        return Err(ApiError::validation("Cooking time must be at least 1"));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> Result<(), ApiError> {
    validate_text_field("slug", slug, NAME_MAX_LENGTH)?;
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "Slug may contain only latin letters, digits, hyphens and underscores",
        ));
    }
    Ok(())
}

impl RecipeForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_ingredients(&self.ingredients)?;
        validate_tags(&self.tags)?;
        validate_text_field("name", &self.name, NAME_MAX_LENGTH)?;
        if self.text.trim().is_empty() {
            return Err(ApiError::validation("Field text may not be blank"));
        }
        validate_cooking_time(self.cooking_time)
    }
}

impl RecipePatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(ingredients) = &self.ingredients {
            validate_ingredients(ingredients)?;
        }
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        if let Some(name) = &self.name {
            validate_text_field("name", name, NAME_MAX_LENGTH)?;
        }
        if let Some(text) = &self.text {
            if text.trim().is_empty() {
                return Err(ApiError::validation("Field text may not be blank"));
            }
        }
        if let Some(cooking_time) = self.cooking_time {
            validate_cooking_time(cooking_time)?;
        }
        Ok(())
    }
}

impl TagForm {
    /// Validates and converts the color to its CSS name.
    pub fn normalize(self) -> Result<Self, ApiError> {
        validate_text_field("name", &self.name, NAME_MAX_LENGTH)?;
        validate_slug(&self.slug)?;

        Ok(Self {
            color: to_color_name(&self.color)?,
            ..self
        })
    }
}

impl TagPatch {
    pub fn normalize(self) -> Result<Self, ApiError> {
        if let Some(name) = &self.name {
            validate_text_field("name", name, NAME_MAX_LENGTH)?;
        }
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        let color = self.color.as_deref().map(to_color_name).transpose()?;

        Ok(Self { color, ..self })
    }
}

impl UserForm {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_text_field("email", &self.email, EMAIL_MAX_LENGTH)?;
        match self.email.split_once('@') {
            Some((local, domain))
                if !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !self.email.chars().any(char::is_whitespace) => {}
            _ => return Err(ApiError::validation("Enter a valid email address")),
        }

        validate_text_field("username", &self.username, USER_FIELD_MAX_LENGTH)?;
        if !self
            .username
            .chars()
            .all(|c| c.is_alphanumeric() || "_.@+-".contains(c))
        {
            return Err(ApiError::validation(
                "Username may contain only letters, digits and @/./+/-/_",
            ));
        }

        validate_text_field("first_name", &self.first_name, USER_FIELD_MAX_LENGTH)?;
        validate_text_field("last_name", &self.last_name, USER_FIELD_MAX_LENGTH)?;
        validate_text_field("password", &self.password, USER_FIELD_MAX_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(id: Id, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    fn recipe_form() -> RecipeForm {
        RecipeForm {
            ingredients: vec![amount(1, 100), amount(2, 2)],
            tags: vec![1],
            image: String::from("data:image/png;base64,iVBORw0KGgo="),
            name: String::from("Pancakes"),
            text: String::from("Mix and fry."),
            cooking_time: 20,
        }
    }

    #[test]
    fn accepts_a_well_formed_recipe() {
        assert!(recipe_form().validate().is_ok());
    }

    #[test]
    fn repeated_ingredient_is_rejected() {
        let form = RecipeForm {
            ingredients: vec![amount(1, 100), amount(2, 3), amount(1, 50)],
            ..recipe_form()
        };
        assert!(matches!(form.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn amounts_below_one_are_rejected() {
        for bad in [0, -1, i32::MIN] {
            let form = RecipeForm {
                ingredients: vec![amount(1, bad)],
                ..recipe_form()
            };
            assert!(matches!(form.validate(), Err(ApiError::Validation(_))));
        }
    }

    #[test]
    fn empty_tag_or_ingredient_lists_are_rejected() {
        let no_tags = RecipeForm {
            tags: vec![],
            ..recipe_form()
        };
        let no_ingredients = RecipeForm {
            ingredients: vec![],
            ..recipe_form()
        };
        assert!(no_tags.validate().is_err());
        assert!(no_ingredients.validate().is_err());
    }

    #[test]
    fn repeated_tag_is_rejected() {
        assert!(validate_tags(&[1, 2, 1]).is_err());
        assert!(validate_tags(&[1, 2]).is_ok());
    }

    #[test]
    fn cooking_time_must_be_positive() {
        let form = RecipeForm {
            cooking_time: 0,
            ..recipe_form()
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn patch_validates_only_supplied_fields() {
        assert!(RecipePatch::default().validate().is_ok());

        let patch = RecipePatch {
            name: Some(String::from("Waffles")),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());

        let patch = RecipePatch {
            ingredients: Some(vec![amount(3, 1), amount(3, 2)]),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = RecipePatch {
            tags: Some(vec![]),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn tag_color_is_stored_as_a_name() {
        let form = TagForm {
            name: String::from("Breakfast"),
            color: String::from("#FFA500"),
            slug: String::from("breakfast"),
        }
        .normalize()
        .unwrap();
        assert_eq!(form.color, "orange");

        let bad_slug = TagForm {
            name: String::from("Breakfast"),
            color: String::from("orange"),
            slug: String::from("break fast"),
        };
        assert!(bad_slug.normalize().is_err());
    }

    #[test]
    fn user_form_checks_email_and_username() {
        let form = UserForm {
            email: String::from("cook@example.com"),
            username: String::from("cook.1"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            password: String::from("s3cret-pass"),
        };
        assert!(form.validate().is_ok());

        let bad_email = UserForm {
            email: String::from("cook@localhost"),
            ..form.clone()
        };
        assert!(bad_email.validate().is_err());

        let bad_username = UserForm {
            username: String::from("no spaces"),
            ..form
        };
        assert!(bad_username.validate().is_err());
    }
}
