use dotenv::dotenv;
use std::sync::Arc;
use teloxide::adaptors::throttle::Limits;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::{HandlerExt, UpdateFilterExt};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

mod api;
mod config;
mod db;
mod error;
mod favorites;
mod handlers;
mod recipe;
mod render;
mod view;

use api::{MealDbClient, RecipeSource};
use config::Config;
use db::Storage;
use favorites::FavoritesRepository;
use handlers::{App, Command, Session};
use view::Screen;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load all env variables from .env file.
    dotenv().ok();
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();
    log::info!("Starting bot...");

    let config = Config::from_env()?;
    let bot = Bot::from_env().throttle(Limits::default());

    log::info!("Opening favorites at {}", config.database_path.display());
    let storage = Arc::new(Storage::open(&config.database_path)?);

    log::info!("Using recipe API at {}", config.api_base_url);
    let source: Arc<dyn RecipeSource> = Arc::new(MealDbClient::new(config.api_base_url));
    let categories = handlers::load_categories(source.as_ref()).await;

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        log::warn!("Could not register the command menu: {}", e);
    }

    let app = Arc::new(App {
        source,
        favorites: FavoritesRepository::new(storage),
        screen: Arc::new(Screen::new(bot.clone())),
        categories,
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<Session>, Session>()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handlers::on_command),
                )
                .branch(dptree::endpoint(handlers::on_text)),
        )
        .branch(Update::filter_callback_query().endpoint(handlers::on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app, InMemStorage::<Session>::new()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}
