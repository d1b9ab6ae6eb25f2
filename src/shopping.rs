use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    constants::{SHOPPING_LIST_FILE_NAME, SHOPPING_LIST_TITLE},
    schema::CartIngredientRow,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Ingredient totals across a user's cart, keyed by (name, unit). The same
/// ingredient name measured in two different units yields two lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    totals: BTreeMap<(String, String), i64>,
}

impl ShoppingList {
    pub fn aggregate<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = CartIngredientRow>,
    {
        let mut totals = BTreeMap::new();
        for row in rows {
            *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
        }

        Self { totals }
    }

    /// Items ordered by name, then unit.
    pub fn items(&self) -> impl Iterator<Item = ShoppingItem> + '_ {
        self.totals
            .iter()
            .map(|((name, measurement_unit), amount)| ShoppingItem {
                name: name.to_owned(),
                measurement_unit: measurement_unit.to_owned(),
                amount: *amount,
            })
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Turns a shopping list into a downloadable document.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, list: &ShoppingList) -> Vec<u8>;
    fn content_type(&self) -> &'static str;
    fn file_name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl DocumentRenderer for PlainTextRenderer {
    fn render(&self, list: &ShoppingList) -> Vec<u8> {
        let mut document = format!("{SHOPPING_LIST_TITLE}\n\n");

        if list.is_empty() {
            document.push_str("Your shopping cart is empty.\n");
        }

        for item in list.items() {
            document.push_str(&format!(
                "{} ({}) - {}\n",
                item.name, item.measurement_unit, item.amount
            ));
        }

        document.into_bytes()
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn file_name(&self) -> &'static str {
        SHOPPING_LIST_FILE_NAME
    }
}
