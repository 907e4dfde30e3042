use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::utils::command::BotCommands;

use crate::api::{Query, RecipeSource};
use crate::favorites::{AddOutcome, FavoritesRepository};
use crate::recipe::{Category, Recipe};
use crate::render::{render_details, render_listing, Action, ListingMode};
use crate::view::{AppBot, Surface};

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
pub type SessionDialogue = Dialogue<Session, InMemStorage<Session>>;

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
pub enum Command {
    #[command(description = "Display this text.")]
    Help,
    #[command(description = "Show the default meal listing.")]
    Start,
    #[command(description = "Search meals by name. Plain messages search too.")]
    Search(String),
    #[command(description = "Show a random meal.")]
    Random,
    #[command(description = "Pick a category from a list.")]
    Categories,
    #[command(description = "List meals in a category.")]
    Category(String),
    #[command(description = "List meals using an ingredient.")]
    Ingredient(String),
    #[command(description = "Show your favorite meals.")]
    Favorites,
}

/// Per-chat UI state.
#[derive(Clone, Debug, Default)]
pub struct Session {
    /// Last submitted name query, re-run when leaving the detail overlay.
    pub query: String,
    /// Messages currently forming the results area.
    pub results: Vec<MessageId>,
    /// Messages currently forming the detail overlay.
    pub overlay: Vec<MessageId>,
}

/// Services shared by every handler.
pub struct App {
    pub source: Arc<dyn RecipeSource>,
    pub favorites: FavoritesRepository,
    pub screen: Arc<dyn Surface>,
    /// Fetched once at startup; empty when that failed.
    pub categories: Vec<Category>,
}

pub async fn load_categories(source: &dyn RecipeSource) -> Vec<Category> {
    match source.categories().await {
        Ok(categories) => {
            log::info!("Loaded {} categories", categories.len());
            categories
        }
        Err(e) => {
            log::error!("Error fetching categories: {}", e);
            Vec::new()
        }
    }
}

pub async fn on_command(
    bot: AppBot,
    app: Arc<App>,
    dialogue: SessionDialogue,
    msg: Message,
    cmd: Command,
) -> HandlerResult {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Start => submit_query(&app, &dialogue, String::new()).await?,
        Command::Search(text) => submit_query(&app, &dialogue, text).await?,
        Command::Random => run_search(&app, &dialogue, Query::Random).await?,
        Command::Categories => {
            app.screen
                .show_categories(dialogue.chat_id(), &app.categories)
                .await
        }
        Command::Category(name) => {
            let name = name.trim();
            if !name.is_empty() {
                run_search(&app, &dialogue, Query::Category(name.to_string())).await?;
            }
        }
        Command::Ingredient(name) => {
            let name = name.trim();
            if !name.is_empty() {
                run_search(&app, &dialogue, Query::Ingredient(name.to_string())).await?;
            }
        }
        Command::Favorites => show_favorites(&app, &dialogue).await?,
    }
    Ok(())
}

/// Any non-command text is a submitted search.
pub async fn on_text(app: Arc<App>, dialogue: SessionDialogue, msg: Message) -> HandlerResult {
    match msg.text() {
        Some(text) if text.starts_with('/') => {
            log::debug!("Ignoring unknown command {:?}", text);
            Ok(())
        }
        Some(text) => submit_query(&app, &dialogue, text.to_string()).await,
        None => Ok(()),
    }
}

pub async fn on_callback(
    bot: AppBot,
    app: Arc<App>,
    sessions: Arc<InMemStorage<Session>>,
    q: CallbackQuery,
) -> HandlerResult {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        log::debug!("Could not answer callback query: {}", e);
    }
    let Some(chat) = q.message.as_ref().map(|m| m.chat().id) else {
        return Ok(());
    };
    let Some(action) = q.data.as_deref().and_then(Action::decode) else {
        log::warn!("Ignoring unknown callback data {:?}", q.data);
        return Ok(());
    };
    let dialogue = SessionDialogue::new(sessions, chat);
    log::debug!("Chat {} pressed {:?}", chat, action);

    match action {
        Action::Details(id) => show_details(&app, &dialogue, &id).await,
        Action::AddFavorite(id) => add_favorite(&app, &dialogue, &id).await,
        Action::DeleteFavorite(id) => delete_favorite(&app, &dialogue, &id).await,
        Action::Category(name) => run_search(&app, &dialogue, Query::Category(name)).await,
        Action::Back => back_to_meals(&app, &dialogue).await,
    }
}

async fn submit_query(app: &App, dialogue: &SessionDialogue, text: String) -> HandlerResult {
    let query = text.trim().to_string();
    let mut session = dialogue.get_or_default().await?;
    session.query = query.clone();
    dialogue.update(session).await?;
    run_search(app, dialogue, Query::Name(query)).await
}

async fn run_search(app: &App, dialogue: &SessionDialogue, query: Query) -> HandlerResult {
    match app.source.search(&query).await {
        Ok(meals) => show_listing(app, dialogue, meals, ListingMode::Search).await,
        Err(e) => {
            log::error!("Error fetching {}: {}", query, e);
            Ok(())
        }
    }
}

/// Replaces the results area of the chat.
async fn show_listing(
    app: &App,
    dialogue: &SessionDialogue,
    meals: Option<Vec<Recipe>>,
    mode: ListingMode,
) -> HandlerResult {
    let chat = dialogue.chat_id();
    let previous = dialogue.get_or_default().await?.results;
    app.screen.clear(chat, &previous).await;
    let shown = app.screen.show_listing(chat, render_listing(meals, mode)).await;

    let mut session = dialogue.get_or_default().await?;
    session.results = shown;
    dialogue.update(session).await?;
    Ok(())
}

async fn show_favorites(app: &App, dialogue: &SessionDialogue) -> HandlerResult {
    match app.favorites.list(dialogue.chat_id().0) {
        Ok(favorites) => show_listing(app, dialogue, Some(favorites), ListingMode::Favorites).await,
        Err(e) => {
            log::error!("Error reading favorites: {}", e);
            Ok(())
        }
    }
}

async fn show_details(app: &App, dialogue: &SessionDialogue, id: &str) -> HandlerResult {
    let recipe = match app.source.lookup(id).await {
        Ok(Some(recipe)) => recipe,
        Ok(None) => {
            log::error!("Error fetching meal details: no meal with id {}", id);
            return Ok(());
        }
        Err(e) => {
            log::error!("Error fetching meal details: {}", e);
            return Ok(());
        }
    };

    let chat = dialogue.chat_id();
    let previous = dialogue.get_or_default().await?.overlay;
    app.screen.clear(chat, &previous).await;
    let shown = app.screen.show_details(chat, render_details(&recipe)).await;

    let mut session = dialogue.get_or_default().await?;
    session.overlay = shown;
    dialogue.update(session).await?;
    Ok(())
}

/// Hides the overlay and re-runs the name search with whatever query the
/// chat holds right now.
async fn back_to_meals(app: &App, dialogue: &SessionDialogue) -> HandlerResult {
    let mut session = dialogue.get_or_default().await?;
    let overlay = std::mem::take(&mut session.overlay);
    let query = session.query.clone();
    dialogue.update(session).await?;

    app.screen.clear(dialogue.chat_id(), &overlay).await;
    run_search(app, dialogue, Query::Name(query)).await
}

async fn add_favorite(app: &App, dialogue: &SessionDialogue, id: &str) -> HandlerResult {
    let owner = dialogue.chat_id().0;
    match app.favorites.add(app.source.as_ref(), owner, id).await {
        Ok(AddOutcome::Added) => show_favorites(app, dialogue).await,
        Ok(AddOutcome::AlreadySaved) => {
            log::debug!("Meal {} is already a favorite of {}", id, owner);
            Ok(())
        }
        Ok(AddOutcome::NotFound) => {
            log::error!("Error adding to favorites: no meal with id {}", id);
            Ok(())
        }
        Err(e) => {
            log::error!("Error adding to favorites: {}", e);
            Ok(())
        }
    }
}

async fn delete_favorite(app: &App, dialogue: &SessionDialogue, id: &str) -> HandlerResult {
    match app.favorites.delete(dialogue.chat_id().0, id) {
        Ok(_) => show_favorites(app, dialogue).await,
        Err(e) => {
            log::error!("Error deleting from favorites: {}", e);
            Ok(())
        }
    }
}
