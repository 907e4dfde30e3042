use async_trait::async_trait;
use reqwest::Url;
use teloxide::adaptors::Throttle;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, InputFile, MessageId, ParseMode};

use crate::recipe::Category;
use crate::render::{category_keyboard, Card, DetailView, Listing, NO_CATEGORIES};

pub type AppBot = Throttle<Bot>;

/// What the controllers draw on.
///
/// Implementations return the ids of the messages actually shown so they
/// can be cleared later.
#[async_trait]
pub trait Surface: Send + Sync {
    /// Removes previously shown messages.
    async fn clear(&self, chat: ChatId, messages: &[MessageId]);

    async fn show_listing(&self, chat: ChatId, listing: Listing) -> Vec<MessageId>;

    async fn show_details(&self, chat: ChatId, view: DetailView) -> Vec<MessageId>;

    async fn show_categories(&self, chat: ChatId, categories: &[Category]);
}

/// Telegram implementation of [`Surface`], built once at startup.
///
/// Failures are logged and the message is skipped.
#[derive(Clone)]
pub struct Screen {
    bot: AppBot,
}

impl Screen {
    pub fn new(bot: AppBot) -> Self {
        Self { bot }
    }

    async fn notice(&self, chat: ChatId, text: &str) -> Option<MessageId> {
        match self.bot.send_message(chat, text).await {
            Ok(message) => Some(message.id),
            Err(e) => {
                log::error!("Failed to send notice to chat {}: {}", chat, e);
                None
            }
        }
    }

    async fn show_card(&self, chat: ChatId, card: Card) -> Option<MessageId> {
        let keyboard = card.keyboard();
        if let Some(photo) = card.photo {
            if let Some(id) = self
                .send_photo(chat, photo, &card.caption, Some(keyboard.clone()))
                .await
            {
                return Some(id);
            }
        }
        self.send_markdown(chat, &card.caption, Some(keyboard)).await
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        photo: Url,
        caption: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Option<MessageId> {
        let mut request = self
            .bot
            .send_photo(chat, InputFile::url(photo.clone()))
            .caption(caption)
            .parse_mode(ParseMode::MarkdownV2);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        match request.await {
            Ok(message) => Some(message.id),
            Err(e) => {
                log::warn!("Failed to send photo {} to chat {}: {}", photo, chat, e);
                None
            }
        }
    }

    async fn send_markdown(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Option<MessageId> {
        let mut request = self
            .bot
            .send_message(chat, text)
            .parse_mode(ParseMode::MarkdownV2);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        match request.await {
            Ok(message) => Some(message.id),
            Err(e) => {
                log::error!("Failed to send message to chat {}: {}", chat, e);
                None
            }
        }
    }
}

#[async_trait]
impl Surface for Screen {
    async fn clear(&self, chat: ChatId, messages: &[MessageId]) {
        for id in messages {
            if let Err(e) = self.bot.delete_message(chat, *id).await {
                log::debug!("Could not remove message {} in chat {}: {}", id.0, chat, e);
            }
        }
    }

    async fn show_listing(&self, chat: ChatId, listing: Listing) -> Vec<MessageId> {
        match listing {
            Listing::Empty(text) => self.notice(chat, text).await.into_iter().collect(),
            Listing::Cards(cards) => {
                let mut shown = Vec::with_capacity(cards.len());
                for card in cards {
                    if let Some(id) = self.show_card(chat, card).await {
                        shown.push(id);
                    }
                }
                shown
            }
        }
    }

    async fn show_details(&self, chat: ChatId, view: DetailView) -> Vec<MessageId> {
        let keyboard = view.keyboard();
        let mut shown = Vec::with_capacity(2);
        let photo_id = match &view.photo {
            Some(photo) => self.send_photo(chat, photo.clone(), &view.title, None).await,
            None => None,
        };
        let body = match photo_id {
            Some(id) => {
                shown.push(id);
                view.body
            }
            None => view.text_without_photo(),
        };
        if let Some(id) = self.send_markdown(chat, &body, Some(keyboard)).await {
            shown.push(id);
        }
        shown
    }

    async fn show_categories(&self, chat: ChatId, categories: &[Category]) {
        let result = match category_keyboard(categories) {
            Some(keyboard) => {
                self.bot
                    .send_message(chat, "Pick a category:")
                    .reply_markup(keyboard)
                    .await
            }
            None => self.bot.send_message(chat, NO_CATEGORIES).await,
        };
        if let Err(e) = result {
            log::error!("Failed to send category picker to chat {}: {}", chat, e);
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::render::Action;
    use std::sync::Mutex;

    /// What a [`RecordingSurface`] was asked to draw.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Drawn {
        Cleared(Vec<MessageId>),
        Notice(&'static str),
        /// Actions of each card, in order.
        Cards(Vec<Vec<Action>>),
        Details(String),
        Categories(Vec<String>),
    }

    /// Records every call and hands out increasing message ids.
    #[derive(Default)]
    pub struct RecordingSurface {
        pub drawn: Mutex<Vec<Drawn>>,
        next_id: Mutex<i32>,
    }

    impl RecordingSurface {
        pub fn drawn(&self) -> Vec<Drawn> {
            self.drawn.lock().unwrap().clone()
        }

        fn record(&self, drawn: Drawn) {
            self.drawn.lock().unwrap().push(drawn);
        }

        fn ids(&self, count: usize) -> Vec<MessageId> {
            let mut next = self.next_id.lock().unwrap();
            (0..count)
                .map(|_| {
                    *next += 1;
                    MessageId(*next)
                })
                .collect()
        }
    }

    #[async_trait]
    impl Surface for RecordingSurface {
        async fn clear(&self, _chat: ChatId, messages: &[MessageId]) {
            self.record(Drawn::Cleared(messages.to_vec()));
        }

        async fn show_listing(&self, _chat: ChatId, listing: Listing) -> Vec<MessageId> {
            match listing {
                Listing::Empty(text) => {
                    self.record(Drawn::Notice(text));
                    self.ids(1)
                }
                Listing::Cards(cards) => {
                    let count = cards.len();
                    self.record(Drawn::Cards(cards.into_iter().map(|c| c.actions).collect()));
                    self.ids(count)
                }
            }
        }

        async fn show_details(&self, _chat: ChatId, view: DetailView) -> Vec<MessageId> {
            self.record(Drawn::Details(view.title));
            self.ids(2)
        }

        async fn show_categories(&self, _chat: ChatId, categories: &[Category]) {
            self.record(Drawn::Categories(
                categories.iter().map(|c| c.name.clone()).collect(),
            ));
        }
    }
}
