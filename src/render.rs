//! Turns recipes into what the chat shows: cards, the detail overlay and
//! the category picker. Nothing here talks to Telegram; the view layer
//! sends the result.

use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::recipe::{Category, Recipe};

pub const NO_RESULTS: &str = "No meals found. Please try a different search.";
pub const NO_FAVORITES: &str = "No favorite meals added yet.";
pub const NO_CATEGORIES: &str = "No categories to choose from.";

/// Telegram rejects text messages longer than this.
const MESSAGE_LIMIT: usize = 4096;

static SPECIAL_CHARACTERS: [char; 19] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL_CHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c)
    }
    escaped
}

/// Shortens `text` to at most `limit` characters, marking the cut.
fn shorten(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// A button press, carried in the callback data of inline buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Details(String),
    AddFavorite(String),
    DeleteFavorite(String),
    Category(String),
    Back,
}

impl Action {
    pub fn encode(&self) -> String {
        match self {
            Action::Details(id) => format!("details:{}", id),
            Action::AddFavorite(id) => format!("fav:{}", id),
            Action::DeleteFavorite(id) => format!("unfav:{}", id),
            Action::Category(name) => format!("cat:{}", name),
            Action::Back => "back".to_string(),
        }
    }

    pub fn decode(data: &str) -> Option<Self> {
        if data == "back" {
            return Some(Action::Back);
        }
        let (tag, arg) = data.split_once(':')?;
        if arg.is_empty() {
            return None;
        }
        let arg = arg.to_string();
        match tag {
            "details" => Some(Action::Details(arg)),
            "fav" => Some(Action::AddFavorite(arg)),
            "unfav" => Some(Action::DeleteFavorite(arg)),
            "cat" => Some(Action::Category(arg)),
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Action::Details(_) => "View Details",
            Action::AddFavorite(_) => "Add to Favorites",
            Action::DeleteFavorite(_) => "Delete from Favorites",
            Action::Category(name) => name,
            Action::Back => "Back to Meals",
        }
    }

    fn button(&self) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(self.label(), self.encode())
    }
}

fn keyboard_row(actions: &[Action]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([actions.iter().map(Action::button).collect::<Vec<_>>()])
}

fn photo_url(recipe: &Recipe) -> Option<Url> {
    recipe.thumbnail.as_deref().and_then(|thumb| thumb.parse().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    Search,
    Favorites,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub photo: Option<Url>,
    /// MarkdownV2
    pub caption: String,
    pub actions: Vec<Action>,
}

impl Card {
    fn new(recipe: &Recipe, mode: ListingMode) -> Self {
        let second = match mode {
            ListingMode::Search => Action::AddFavorite(recipe.id.clone()),
            ListingMode::Favorites => Action::DeleteFavorite(recipe.id.clone()),
        };
        Self {
            photo: photo_url(recipe),
            caption: format!("*{}*", escape_markdown(&recipe.name)),
            actions: vec![Action::Details(recipe.id.clone()), second],
        }
    }

    pub fn keyboard(&self) -> InlineKeyboardMarkup {
        keyboard_row(&self.actions)
    }
}

#[derive(Debug, Clone)]
pub enum Listing {
    /// Plain text notice shown instead of cards.
    Empty(&'static str),
    Cards(Vec<Card>),
}

/// Builds the results area for `meals`. Absent and empty lists both show
/// the notice for `mode`.
pub fn render_listing(meals: Option<Vec<Recipe>>, mode: ListingMode) -> Listing {
    let meals = meals.unwrap_or_default();
    if meals.is_empty() {
        return Listing::Empty(match mode {
            ListingMode::Search => NO_RESULTS,
            ListingMode::Favorites => NO_FAVORITES,
        });
    }
    Listing::Cards(meals.iter().map(|meal| Card::new(meal, mode)).collect())
}

/// The detail overlay: a photo titled with the meal name followed by a text
/// message with ingredients, instructions and the back button.
#[derive(Debug, Clone)]
pub struct DetailView {
    pub photo: Option<Url>,
    /// MarkdownV2
    pub title: String,
    /// MarkdownV2
    pub body: String,
    pub actions: Vec<Action>,
}

impl DetailView {
    pub fn keyboard(&self) -> InlineKeyboardMarkup {
        keyboard_row(&self.actions)
    }

    /// Title and body in one message, for when the photo is not shown.
    pub fn text_without_photo(&self) -> String {
        format!("{}\n\n{}", self.title, self.body)
    }
}

pub fn render_details(recipe: &Recipe) -> DetailView {
    let mut body = String::from("*Ingredients*\n");
    for ingredient in recipe.ingredients() {
        body.push_str("• ");
        body.push_str(&escape_markdown(&ingredient.to_string()));
        body.push('\n');
    }
    body.push_str("\n*Instructions*\n");
    let title = format!("*{}*", escape_markdown(&recipe.name));
    // room for the title too, which is prepended when the photo is missing;
    // escaping at most doubles the instructions
    let budget = MESSAGE_LIMIT.saturating_sub(body.chars().count() + title.chars().count() + 2);
    let instructions = recipe.instructions.as_deref().unwrap_or_default();
    body.push_str(&escape_markdown(&shorten(instructions.trim(), budget / 2)));

    DetailView {
        photo: photo_url(recipe),
        title,
        body,
        actions: vec![Action::Back],
    }
}

/// One button per category, the name used both as label and as filter value.
pub fn category_keyboard(categories: &[Category]) -> Option<InlineKeyboardMarkup> {
    if categories.is_empty() {
        return None;
    }
    Some(InlineKeyboardMarkup::new(
        categories
            .iter()
            .map(|category| [Action::Category(category.name.clone()).button()]),
    ))
}
