use std::sync::Arc;

use crate::api::RecipeSource;
use crate::db::Storage;
use crate::error::{Error, StorageError};
use crate::recipe::Recipe;

/// Storage key holding the JSON array of favorite recipes.
pub const FAVORITES_KEY: &str = "favorites";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadySaved,
    /// The lookup came back empty, nothing was stored.
    NotFound,
}

/// Favorite recipes of each owner, kept as one JSON array per owner.
///
/// Ids are unique within a list. A value that is not valid JSON is reported
/// as [`StorageError::Corrupt`] and left in place.
pub struct FavoritesRepository {
    storage: Arc<Storage>,
}

fn decode(raw: Option<String>) -> Result<Vec<Recipe>, StorageError> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            key: FAVORITES_KEY.to_string(),
            source,
        }),
    }
}

fn encode(favorites: &[Recipe]) -> Result<String, StorageError> {
    serde_json::to_string(favorites).map_err(|source| StorageError::Encode {
        key: FAVORITES_KEY.to_string(),
        source,
    })
}

impl FavoritesRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn list(&self, owner: i64) -> Result<Vec<Recipe>, StorageError> {
        decode(self.storage.get_item(owner, FAVORITES_KEY)?)
    }

    /// Appends `recipe` unless its id is already saved. Returns whether it was added.
    pub fn insert(&self, owner: i64, recipe: Recipe) -> Result<bool, StorageError> {
        self.storage.modify_item(owner, FAVORITES_KEY, |stored| {
            let mut favorites = decode(stored)?;
            if favorites.iter().any(|saved| saved.id == recipe.id) {
                return Ok((None, false));
            }
            log::info!("Saving '{}' ({}) to favorites of {}", recipe.name, recipe.id, owner);
            favorites.push(recipe);
            Ok((Some(encode(&favorites)?), true))
        })
    }

    /// Removes every entry with `id` and returns how many went away.
    pub fn delete(&self, owner: i64, id: &str) -> Result<usize, StorageError> {
        self.storage.modify_item(owner, FAVORITES_KEY, |stored| {
            let mut favorites = decode(stored)?;
            let before = favorites.len();
            favorites.retain(|saved| saved.id != id);
            let removed = before - favorites.len();
            log::info!("Removed {} favorite(s) with id {} for {}", removed, id, owner);
            Ok((Some(encode(&favorites)?), removed))
        })
    }

    /// Fetches the full record for `id` and saves it.
    ///
    /// The storage is only touched once the lookup has completed, so the
    /// read-check-write runs without any suspension point in between.
    pub async fn add(
        &self,
        source: &dyn RecipeSource,
        owner: i64,
        id: &str,
    ) -> Result<AddOutcome, Error> {
        let recipe = match source.lookup(id).await? {
            Some(recipe) => recipe,
            None => return Ok(AddOutcome::NotFound),
        };
        if self.insert(owner, recipe)? {
            Ok(AddOutcome::Added)
        } else {
            Ok(AddOutcome::AlreadySaved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{recipe, StubSource};

    fn repository() -> (Arc<Storage>, FavoritesRepository) {
        let storage = Arc::new(Storage::open_in_memory().unwrap());
        (storage.clone(), FavoritesRepository::new(storage))
    }

    fn ids(favorites: &[Recipe]) -> Vec<&str> {
        favorites.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_list_on_first_use_is_empty() {
        let (_, favorites) = repository();
        assert!(favorites.list(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_add_keeps_one_entry() {
        let (storage, favorites) = repository();
        let source = StubSource::with_meals(vec![recipe("52772", "Teriyaki Chicken Casserole")]);

        assert_eq!(favorites.add(&source, 1, "52772").await.unwrap(), AddOutcome::Added);
        assert_eq!(
            favorites.add(&source, 1, "52772").await.unwrap(),
            AddOutcome::AlreadySaved
        );
        assert_eq!(
            favorites.add(&source, 1, "52772").await.unwrap(),
            AddOutcome::AlreadySaved
        );

        assert_eq!(ids(&favorites.list(1).unwrap()), vec!["52772"]);
        let raw = storage.get_item(1, FAVORITES_KEY).unwrap().unwrap();
        let persisted: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.len(), 1);
    }

    #[tokio::test]
    async fn test_add_stores_the_looked_up_record() {
        let (_, favorites) = repository();
        let mut full = recipe("52959", "Baked salmon with fennel & tomatoes");
        full.fields
            .insert("strArea".to_string(), serde_json::json!("British"));
        let source = StubSource::with_meals(vec![full.clone()]);

        favorites.add(&source, 1, "52959").await.unwrap();
        assert_eq!(favorites.list(1).unwrap(), vec![full]);
    }

    #[tokio::test]
    async fn test_add_keeps_insertion_order() {
        let (_, favorites) = repository();
        let source = StubSource::with_meals(vec![
            recipe("1", "Apam balik"),
            recipe("2", "Bakewell tart"),
            recipe("3", "Corba"),
        ]);
        for id in ["3", "1", "2", "1"] {
            favorites.add(&source, 1, id).await.unwrap();
        }
        assert_eq!(ids(&favorites.list(1).unwrap()), vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn test_add_unknown_or_unreachable_stores_nothing() {
        let (storage, favorites) = repository();
        let source = StubSource::default();
        assert_eq!(favorites.add(&source, 1, "404").await.unwrap(), AddOutcome::NotFound);

        let offline = StubSource {
            offline: true,
            ..StubSource::with_meals(vec![recipe("1", "Apam balik")])
        };
        assert!(matches!(
            favorites.add(&offline, 1, "1").await,
            Err(Error::Fetch(_))
        ));
        assert_eq!(storage.get_item(1, FAVORITES_KEY).unwrap(), None);
    }

    #[test]
    fn test_delete_removes_entry() {
        let (_, favorites) = repository();
        favorites.insert(1, recipe("1", "Apam balik")).unwrap();
        favorites.insert(1, recipe("2", "Bakewell tart")).unwrap();

        assert_eq!(favorites.delete(1, "1").unwrap(), 1);
        assert_eq!(ids(&favorites.list(1).unwrap()), vec!["2"]);

        assert_eq!(favorites.delete(1, "1").unwrap(), 0);
        assert_eq!(favorites.delete(1, "2").unwrap(), 1);
        assert!(favorites.list(1).unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_every_duplicate() {
        let (storage, favorites) = repository();
        let twice = vec![recipe("9", "Corba"), recipe("9", "Corba")];
        storage
            .set_item(1, FAVORITES_KEY, &serde_json::to_string(&twice).unwrap())
            .unwrap();

        assert_eq!(favorites.delete(1, "9").unwrap(), 2);
        assert!(favorites.list(1).unwrap().is_empty());
    }

    #[test]
    fn test_owners_do_not_share_favorites() {
        let (_, favorites) = repository();
        favorites.insert(1, recipe("1", "Apam balik")).unwrap();
        assert!(favorites.list(2).unwrap().is_empty());
        assert_eq!(favorites.delete(2, "1").unwrap(), 0);
        assert_eq!(favorites.list(1).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_value_is_reported_and_kept() {
        let (storage, favorites) = repository();
        storage.set_item(1, FAVORITES_KEY, "{not json").unwrap();

        assert!(matches!(favorites.list(1), Err(StorageError::Corrupt { .. })));
        assert!(matches!(
            favorites.insert(1, recipe("1", "Apam balik")),
            Err(StorageError::Corrupt { .. })
        ));
        assert!(matches!(favorites.delete(1, "1"), Err(StorageError::Corrupt { .. })));
        assert_eq!(
            storage.get_item(1, FAVORITES_KEY).unwrap().as_deref(),
            Some("{not json")
        );
    }
}
