pub mod actions;

use std::sync::Arc;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{Document, Recipient};
use teloxide::utils::command::{BotCommands, ParseError};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use wienergame_shared::rules::RuleSet;

use crate::report::MessageSink;
use crate::storage::{StorageError, Store};

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("download failed: {0}")]
    Download(#[from] teloxide::DownloadError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HandlerResult = Result<(), BotError>;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub rules: Arc<RuleSet>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            rules: Arc::new(RuleSet::default()),
        }
    }
}

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Команди бота:")]
pub enum Command {
    #[command(description = "привітання та довідка")]
    Start,
    #[command(description = "показати команди")]
    Help,
    #[command(description = "призначити адміністратора: /new_admin <username>", parse_with = raw_args)]
    NewAdmin(String),
    #[command(description = "завантажити завдання з CSV (відповіддю на файл)")]
    UploadCsv,
    #[command(description = "мій рахунок")]
    Score,
}

fn raw_args(input: String) -> Result<(String,), ParseError> {
    Ok((input,))
}

pub fn schema() -> UpdateHandler<BotError> {
    let commands = dptree::entry()
        .filter_command::<Command>()
        .endpoint(on_command);

    let group_text = dptree::filter(|msg: Message| msg.chat.is_group() || msg.chat.is_supergroup())
        .endpoint(on_group_text);

    Update::filter_message().branch(commands).branch(group_text)
}

fn sender_username(msg: &Message) -> Option<&str> {
    msg.from.as_ref().and_then(|u| u.username.as_deref())
}

async fn on_command(bot: Bot, msg: Message, cmd: Command, state: AppState) -> HandlerResult {
    debug!(?cmd, chat_id = msg.chat.id.0, user = ?sender_username(&msg), "command");
    if let Err(err) = run_command(&bot, &msg, cmd, &state).await {
        error!(error = %err, chat_id = msg.chat.id.0, "command failed");
        bot.send_message(msg.chat.id, format!("Помилка: {err}"))
            .await?;
    }
    Ok(())
}

async fn run_command(bot: &Bot, msg: &Message, cmd: Command, state: &AppState) -> HandlerResult {
    let requester = sender_username(msg);
    let reply = match cmd {
        Command::Start => actions::START_TEXT.to_string(),
        Command::Help => Command::descriptions().to_string(),
        Command::NewAdmin(args) => actions::new_admin(&state.store, requester, &args).await?,
        Command::UploadCsv => upload_csv(bot, msg, state).await?,
        Command::Score => match requester {
            Some(user) => actions::score(&state.store, user).await?,
            None => actions::NO_USERNAME.to_string(),
        },
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn upload_csv(bot: &Bot, msg: &Message, state: &AppState) -> Result<String, BotError> {
    if !actions::is_admin(&state.store, sender_username(msg)).await? {
        warn!(user = ?sender_username(msg), "upload_csv denied");
        return Ok(actions::ADMIN_ONLY.to_string());
    }
    let Some(doc) = msg.reply_to_message().and_then(|m| m.document()) else {
        return Ok(actions::UPLOAD_NEEDS_DOCUMENT.to_string());
    };
    // removed when `tmp` drops, on every path
    let tmp = tempfile::Builder::new()
        .prefix("wienergame-")
        .suffix(".csv")
        .tempfile()?;
    if let Err(err) = download_document(bot, doc, tmp.path()).await {
        error!(error = %err, file_name = ?doc.file_name, "csv download failed");
        return Ok(format!("{} {err}", actions::UPLOAD_FAILED_PREFIX));
    }
    info!(file_name = ?doc.file_name, "csv downloaded, importing");
    Ok(actions::import_csv(&state.store, tmp.path()).await)
}

async fn download_document(
    bot: &Bot,
    doc: &Document,
    dest: &std::path::Path,
) -> Result<(), BotError> {
    let file = bot.get_file(doc.file.id.clone()).await?;
    let mut out = tokio::fs::File::create(dest).await?;
    bot.download_file(&file.path, &mut out).await?;
    out.flush().await?;
    Ok(())
}

async fn on_group_text(bot: Bot, msg: Message, state: AppState) -> HandlerResult {
    let (Some(text), Some(author)) = (msg.text(), sender_username(&msg)) else {
        return Ok(());
    };
    match actions::group_text(&state.store, &state.rules, author, text).await {
        Ok(Some(reply)) => {
            bot.send_message(msg.chat.id, reply).await?;
        }
        Ok(None) => {}
        Err(err) => {
            error!(error = %err, username = %author, "failed to record task");
            bot.send_message(msg.chat.id, format!("Помилка: {err}"))
                .await?;
        }
    }
    Ok(())
}

impl MessageSink for Bot {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), BotError> {
        let recipient = Recipient::ChannelUsername(format!("@{to}"));
        self.send_message(recipient, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_NAME: &str = "wiener_game_bot";

    #[test]
    fn commands_use_snake_case_names() {
        assert_eq!(Command::parse("/start", BOT_NAME).unwrap(), Command::Start);
        assert_eq!(
            Command::parse("/upload_csv", BOT_NAME).unwrap(),
            Command::UploadCsv
        );
        assert_eq!(Command::parse("/score", BOT_NAME).unwrap(), Command::Score);
    }

    #[test]
    fn new_admin_keeps_raw_arguments() {
        assert_eq!(
            Command::parse("/new_admin @carol", BOT_NAME).unwrap(),
            Command::NewAdmin("@carol".into())
        );
        assert_eq!(
            Command::parse(&format!("/new_admin@{BOT_NAME} dave"), BOT_NAME).unwrap(),
            Command::NewAdmin("dave".into())
        );
        match Command::parse("/new_admin", BOT_NAME).unwrap() {
            Command::NewAdmin(args) => assert!(args.trim().is_empty()),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn help_lists_every_command() {
        let help = Command::descriptions().to_string();
        for name in ["/start", "/help", "/new_admin", "/upload_csv", "/score"] {
            assert!(help.contains(name), "missing {name} in {help}");
        }
    }
}
