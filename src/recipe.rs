use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Number of numbered ingredient slots a meal record carries.
pub const INGREDIENT_SLOTS: usize = 20;

/// A meal as served by TheMealDB.
///
/// Only the fields the bot reads are typed. Everything else (ingredient
/// slots, tags, source links, ...) lands in `fields`, so a recipe written
/// back to storage is the record exactly as it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: String,
    #[serde(rename = "strMealThumb", default)]
    pub thumbnail: Option<String>,
    #[serde(rename = "strInstructions", default)]
    pub instructions: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub name: String,
    pub measure: Option<String>,
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.measure {
            Some(measure) => write!(f, "{} - {}", self.name, measure),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Recipe {
    fn slot(&self, prefix: &str, index: usize) -> Option<&str> {
        self.fields
            .get(&format!("{}{}", prefix, index))
            .and_then(Value::as_str)
    }

    /// Ingredient list in slot order.
    ///
    /// The scan stops at the first empty slot: a recipe with slots 1 and 3
    /// filled but 2 missing only lists slot 1.
    pub fn ingredients(&self) -> Vec<Ingredient> {
        let mut ingredients = Vec::new();
        for i in 1..=INGREDIENT_SLOTS {
            let name = match self.slot("strIngredient", i) {
                Some(name) if !name.is_empty() => name,
                _ => break,
            };
            let measure = self
                .slot("strMeasure", i)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            ingredients.push(Ingredient {
                name: name.to_string(),
                measure,
            });
        }
        ingredients
    }
}

/// A category label, only ever used as a filter key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    #[serde(rename = "strCategory")]
    pub name: String,
}
