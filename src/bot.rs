use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use teloxide::{
    dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler},
    prelude::*,
    types::{BotCommand, ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
    utils::command::BotCommands,
    RequestError,
};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::{
    catalog::{is_supported_gpu, supported_gpus, GpuSpec},
    errors::RoiError,
    i18n::{Language, Text, LANGUAGES},
    models::RoiReport,
    roi::RoiOrchestrator,
    sessions::{SessionKey, SessionStore},
};

const GPU_BUTTONS_PER_ROW: usize = 2;

lazy_static! {
    // Names Telegram accepts in setMyCommands
    static ref MENU_COMMAND_RE: Regex = Regex::new(r"^[a-z0-9_]{1,32}$").unwrap();
}

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "show this text")]
    Help,
    #[command(rename = "calculateRoi", description = "select a GPU and calculate its ROI")]
    CalculateRoi,
    #[command(rename = "calculate_roi", description = "select a GPU and calculate its ROI")]
    CalculateRoiMenu,
    #[command(description = "change the bot language")]
    Language,
}

pub struct BotState {
    pub sessions: Arc<Mutex<SessionStore>>,
    pub orchestrator: RoiOrchestrator,
}

async fn session_language(sessions: &Mutex<SessionStore>, key: SessionKey) -> Language {
    sessions.lock().await.get(key).language
}

pub async fn apply_language(sessions: &Mutex<SessionStore>, key: SessionKey, language: Language) {
    let mut sessions_locked = sessions.lock().await;
    let mut session = sessions_locked.get(key);
    session.language = language;
    sessions_locked.put(key, session);
}

// The lock is not held while the orchestrator fetches
pub async fn apply_gpu_selection(
    sessions: &Mutex<SessionStore>,
    orchestrator: &RoiOrchestrator,
    key: SessionKey,
    gpu_id: &str,
) -> (Language, Result<&'static GpuSpec, RoiError>) {
    let mut session = sessions.lock().await.get(key);
    let outcome = orchestrator.select_gpu(&mut session, gpu_id).await;
    let language = session.language;
    sessions.lock().await.put(key, session);

    (language, outcome)
}

pub async fn apply_cost_input(
    sessions: &Mutex<SessionStore>,
    orchestrator: &RoiOrchestrator,
    key: SessionKey,
    text: &str,
) -> (Language, Result<RoiReport, RoiError>) {
    let mut session = sessions.lock().await.get(key);
    let outcome = orchestrator.submit_cost(&mut session, text).await;
    let language = session.language;
    sessions.lock().await.put(key, session);

    (language, outcome)
}

pub fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_message().endpoint(handle_text))
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}

/// Commands for Telegram's menu. Aliases whose names Telegram rejects
/// (`calculateRoi`) are left out, they still parse when typed.
pub fn registered_commands() -> Vec<BotCommand> {
    Command::bot_commands()
        .into_iter()
        .filter_map(|cmd| {
            let name = cmd.command.trim_start_matches('/').to_string();
            if MENU_COMMAND_RE.is_match(&name) {
                Some(BotCommand::new(name, cmd.description))
            } else {
                None
            }
        })
        .collect()
}

pub async fn register_commands(bot: &Bot) {
    if let Err(err) = bot.set_my_commands(registered_commands()).await {
        warn!("Failed to register bot commands: {:?}", err);
    }
}

pub fn gpu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(supported_gpus().chunks(GPU_BUTTONS_PER_ROW).map(|row| {
        row.iter()
            .map(|gpu| InlineKeyboardButton::callback(gpu.id.clone(), gpu.id.clone()))
            .collect::<Vec<_>>()
    }))
}

pub fn language_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([LANGUAGES
        .iter()
        .map(|language| InlineKeyboardButton::callback(language.button_label(), language.code()))
        .collect::<Vec<_>>()])
}

pub fn error_text(err: &RoiError) -> Text<'static> {
    match err {
        RoiError::UpstreamFetch { .. } => Text::UpstreamFailure,
        RoiError::InvalidCostInput(_) => Text::InvalidCost,
        RoiError::UnknownGpu(_) => Text::UnknownGpu,
        RoiError::NoGpuSelected => Text::NoGpuSelected,
        RoiError::NonFiniteResult => Text::CalculationFailed,
    }
}

fn log_failed_send<T>(chat_id: ChatId, result: Result<T, RequestError>) {
    if let Err(err) = result {
        error!("Failed to send message to chat {}: {:?}", chat_id, err);
    }
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let language = session_language(&state.sessions, chat_id.0).await;

    let result = match cmd {
        Command::Start => {
            let user = msg.chat.first_name().unwrap_or_default();
            bot.send_message(chat_id, language.text(Text::Welcome { user }))
                .await
        }
        Command::Help => bot.send_message(chat_id, language.text(Text::Help)).await,
        Command::CalculateRoi | Command::CalculateRoiMenu => {
            bot.send_message(chat_id, language.text(Text::SelectGpu))
                .reply_markup(gpu_keyboard())
                .await
        }
        Command::Language => {
            bot.send_message(chat_id, language.text(Text::LanguageOptions))
                .reply_markup(language_keyboard())
                .parse_mode(ParseMode::MarkdownV2)
                .await
        }
    };
    log_failed_send(chat_id, result);

    Ok(())
}

async fn handle_text(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    let (language, outcome) =
        apply_cost_input(&state.sessions, &state.orchestrator, chat_id.0, text).await;

    let result = match outcome {
        Ok(report) => {
            bot.send_message(chat_id, language.text(Text::RoiResult(&report)))
                .parse_mode(ParseMode::Html)
                .await
        }
        Err(err) => {
            debug!("Chat {} cost input failed: {}", chat_id, err);
            bot.send_message(chat_id, language.text(error_text(&err)))
                .await
        }
    };
    log_failed_send(chat_id, result);

    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    log_failed_send(
        ChatId(q.from.id.0 as i64),
        bot.answer_callback_query(q.id.clone()).await,
    );

    let (Some(data), Some(chat_id)) = (q.data.as_deref(), q.message.as_ref().map(|m| m.chat.id))
    else {
        return Ok(());
    };

    let result = if let Some(language) = Language::from_code(data) {
        apply_language(&state.sessions, chat_id.0, language).await;
        bot.send_message(chat_id, language.text(Text::LanguageSelected))
            .await
    } else if is_supported_gpu(data) {
        let (language, outcome) =
            apply_gpu_selection(&state.sessions, &state.orchestrator, chat_id.0, data).await;

        match outcome {
            Ok(gpu) => {
                bot.send_message(chat_id, language.text(Text::SelectedGpu { gpu_id: &gpu.id }))
                    .reply_markup(ForceReply::new())
                    .await
            }
            Err(err) => {
                bot.send_message(chat_id, language.text(error_text(&err)))
                    .await
            }
        }
    } else {
        warn!("Unexpected callback data {:?} from chat {}", data, chat_id);
        let language = session_language(&state.sessions, chat_id.0).await;
        bot.send_message(chat_id, language.text(Text::UnknownGpu))
            .await
    };
    log_failed_send(chat_id, result);

    Ok(())
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;
    use crate::errors::Feed;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_gpu_keyboard_lists_whole_catalog() {
        let markup = gpu_keyboard();
        let ids: Vec<String> = supported_gpus().iter().map(|gpu| gpu.id.clone()).collect();

        assert_eq!(callback_data(&markup), ids);
        assert!(markup
            .inline_keyboard
            .iter()
            .all(|row| row.len() <= GPU_BUTTONS_PER_ROW));
    }

    #[test]
    fn test_language_keyboard_uses_codes() {
        assert_eq!(callback_data(&language_keyboard()), vec!["en", "es"]);
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(
            Command::parse("/calculateRoi", "roi_bot").unwrap(),
            Command::CalculateRoi
        );
        assert_eq!(
            Command::parse("/calculate_roi", "roi_bot").unwrap(),
            Command::CalculateRoiMenu
        );
        assert_eq!(Command::parse("/language", "roi_bot").unwrap(), Command::Language);
        assert!(Command::parse("/calculate", "roi_bot").is_err());
    }

    #[test]
    fn test_registered_commands_are_valid_menu_names() {
        let commands = registered_commands();
        let names: Vec<&str> = commands.iter().map(|cmd| cmd.command.as_str()).collect();

        assert!(names.iter().all(|name| MENU_COMMAND_RE.is_match(name)), "{:?}", names);
        assert_eq!(names, vec!["start", "help", "calculate_roi", "language"]);
    }

    #[test]
    fn test_error_texts() {
        let texts = [
            (RoiError::upstream(Feed::EthPrice, "timeout"), Text::UpstreamFailure),
            (RoiError::InvalidCostInput("abc".to_string()), Text::InvalidCost),
            (RoiError::UnknownGpu("GTX".to_string()), Text::UnknownGpu),
            (RoiError::NoGpuSelected, Text::NoGpuSelected),
            (RoiError::NonFiniteResult, Text::CalculationFailed),
        ];

        for (err, expected) in texts {
            assert_eq!(
                Language::En.text(error_text(&err)),
                Language::En.text(expected)
            );
        }
    }
}
