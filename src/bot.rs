// Telegram side of the service: registers users who send /start

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};
use tracing::{debug, error, info};
use url::Url;

use crate::{
    models::{SenderProfile, UserRecord},
    store::{SharedStore, UserStore},
};

pub const START_COMMAND: &str = "/start";
pub const STORE_PROMPT: &str = "Заходи в наш интернет магазин по кнопке ниже";
pub const ORDER_BUTTON_TEXT: &str = "Сделать заказ";

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub webapp_url: Url,
}

/// Run long polling until the dispatcher stops.
pub async fn run(bot: Bot, store: SharedStore, settings: BotSettings) {
    info!("Starting Telegram dispatcher");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![store, Arc::new(settings)])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("An error from the Telegram dispatcher"))
        .build()
        .dispatch()
        .await;

    info!("Telegram dispatcher stopped");
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    store: SharedStore,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let sender = SenderProfile::from(user);

    let Some(confirmation) = process_text(store.as_ref(), &sender, msg.text()).await else {
        return Ok(());
    };

    // Replies go to the user directly, not to the chat the command came from
    let chat_id = ChatId(sender.id);

    if let Err(e) = bot.send_message(chat_id, confirmation).await {
        error!("Failed to send confirmation to {}: {}", sender.id, e);
    }

    if let Err(e) = bot
        .send_message(chat_id, STORE_PROMPT)
        .reply_markup(order_keyboard(&settings.webapp_url))
        .await
    {
        error!("Failed to send store link to {}: {}", sender.id, e);
    }

    Ok(())
}

/// Decides what a message means for the registry.
///
/// Returns the confirmation text when the message is `/start`, after storing
/// the sender. Any other text (or none) is ignored without touching the store.
/// A failed write is logged and the confirmation is still returned.
pub async fn process_text(
    store: &dyn UserStore,
    sender: &SenderProfile,
    text: Option<&str>,
) -> Option<String> {
    if text != Some(START_COMMAND) {
        return None;
    }

    info!("Registering user {}", sender.id);

    match UserRecord::for_sender(sender) {
        Ok(record) => {
            if let Err(e) = store.upsert_user(&record).await {
                error!("Failed to store data of user {}: {}", sender.id, e);
            }
        }
        Err(e) => error!("Failed to encode data of user {}: {}", sender.id, e),
    }

    Some(confirmation_text(sender))
}

pub fn confirmation_text(sender: &SenderProfile) -> String {
    format!(
        "Привет! Данные о вас сохранены.\n\nИмя: {}, Фамилия: {}, Юзернейм: {}, id_tg: {}",
        sender.first_name,
        sender.last_name.as_deref().unwrap_or(""),
        sender.username.as_deref().unwrap_or(""),
        sender.id,
    )
}

/// One row, one button opening the mini app.
pub fn order_keyboard(webapp_url: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::web_app(
        ORDER_BUTTON_TEXT,
        WebAppInfo { url: webapp_url.clone() },
    )]])
}
