use std::path::PathBuf;

use crate::api::DEFAULT_BASE_URL;
use crate::error::Error;

pub const API_URL_VAR: &str = "MEALDB_API_URL";
pub const DATABASE_VAR: &str = "MEAL_FETCH_DB";
const DEFAULT_DATABASE: &str = "meal-fetch.db";

/// Runtime settings. The bot token itself is read by teloxide from
/// `TELOXIDE_TOKEN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    pub database_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup(API_URL_VAR)
            .map(|url| url.trim().to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "{} must be an http(s) url, got '{}'",
                API_URL_VAR, api_base_url
            )));
        }

        let database_path = lookup(DATABASE_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

        Ok(Self {
            api_base_url,
            database_path,
        })
    }
}
