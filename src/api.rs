use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;

use crate::error::FetchError;
use crate::recipe::{Category, Recipe};

/// Public TheMealDB endpoint; the trailing `1` is the shared test API key.
pub const DEFAULT_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";

#[derive(Debug, Default, Deserialize)]
pub struct MealsResponse {
    #[serde(default)]
    pub meals: Option<Vec<Recipe>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoriesResponse {
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
}

/// One of the four ways a listing can be requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Search by meal name. An empty string asks for the default listing.
    Name(String),
    Random,
    Category(String),
    Ingredient(String),
}

impl Query {
    fn endpoint(&self) -> (&'static str, Option<(&'static str, &str)>) {
        match self {
            Query::Name(name) => ("search.php", Some(("s", name.as_str()))),
            Query::Random => ("random.php", None),
            Query::Category(category) => ("filter.php", Some(("c", category.as_str()))),
            Query::Ingredient(ingredient) => ("filter.php", Some(("i", ingredient.as_str()))),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Name(name) => write!(f, "meals matching '{}'", name),
            Query::Random => write!(f, "random meal"),
            Query::Category(category) => write!(f, "meals by category '{}'", category),
            Query::Ingredient(ingredient) => write!(f, "meals by ingredient '{}'", ingredient),
        }
    }
}

/// Read-only access to a recipe catalogue.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// `Ok(None)` means the API had no match, which is not an error.
    async fn search(&self, query: &Query) -> Result<Option<Vec<Recipe>>, FetchError>;

    async fn lookup(&self, id: &str) -> Result<Option<Recipe>, FetchError>;

    async fn categories(&self) -> Result<Vec<Category>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct MealDbClient {
    http: reqwest::Client,
    base_url: String,
}

impl MealDbClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str, param: Option<(&str, &str)>) -> Result<Url, FetchError> {
        let raw = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if let Some((name, value)) = param {
            url.query_pairs_mut().append_pair(name, value);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        log::debug!("GET {}", url);
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RecipeSource for MealDbClient {
    async fn search(&self, query: &Query) -> Result<Option<Vec<Recipe>>, FetchError> {
        let (path, param) = query.endpoint();
        let url = self.url(path, param)?;
        let response: MealsResponse = self.get_json(url).await?;
        Ok(response.meals)
    }

    async fn lookup(&self, id: &str) -> Result<Option<Recipe>, FetchError> {
        let url = self.url("lookup.php", Some(("i", id)))?;
        let response: MealsResponse = self.get_json(url).await?;
        Ok(response.meals.and_then(|meals| meals.into_iter().next()))
    }

    async fn categories(&self) -> Result<Vec<Category>, FetchError> {
        let url = self.url("categories.php", None)?;
        let response: CategoriesResponse = self.get_json(url).await?;
        Ok(response.categories.unwrap_or_default())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use serde_json::{json, Map};
    use std::sync::Mutex;

    pub fn recipe(id: &str, name: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            name: name.to_string(),
            thumbnail: Some(format!("https://www.themealdb.com/images/media/meals/{}.jpg", id)),
            instructions: Some("Mix everything.".to_string()),
            fields: Map::from_iter([("strIngredient1".to_string(), json!("Salt"))]),
        }
    }

    /// In-memory catalogue. With `offline` set every call fails like a
    /// dropped connection would.
    #[derive(Default)]
    pub struct StubSource {
        pub meals: Vec<Recipe>,
        pub categories: Vec<Category>,
        pub offline: bool,
        /// Every query passed to `search`, in call order.
        pub searches: Mutex<Vec<Query>>,
    }

    impl StubSource {
        pub fn with_meals(meals: Vec<Recipe>) -> Self {
            Self {
                meals,
                ..Default::default()
            }
        }

        fn check(&self) -> Result<(), FetchError> {
            if self.offline {
                Err(FetchError::InvalidUrl("offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RecipeSource for StubSource {
        async fn search(&self, query: &Query) -> Result<Option<Vec<Recipe>>, FetchError> {
            self.searches.lock().unwrap().push(query.clone());
            self.check()?;
            let found: Vec<Recipe> = match query {
                Query::Name(name) => self
                    .meals
                    .iter()
                    .filter(|m| m.name.to_lowercase().contains(&name.to_lowercase()))
                    .cloned()
                    .collect(),
                Query::Random => self.meals.iter().take(1).cloned().collect(),
                Query::Category(_) | Query::Ingredient(_) => Vec::new(),
            };
            Ok(if found.is_empty() { None } else { Some(found) })
        }

        async fn lookup(&self, id: &str) -> Result<Option<Recipe>, FetchError> {
            self.check()?;
            Ok(self.meals.iter().find(|m| m.id == id).cloned())
        }

        async fn categories(&self) -> Result<Vec<Category>, FetchError> {
            self.check()?;
            Ok(self.categories.clone())
        }
    }
}
