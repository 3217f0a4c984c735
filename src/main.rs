use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use dotenvy::dotenv;
use teloxide::{dispatching::Dispatcher, dptree, Bot};
use tokio::sync::Mutex;
use tracing::{info, level_filters::LevelFilter};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod bot;
mod catalog;
mod consts;
mod errors;
mod i18n;
mod market_data;
mod models;
mod normalizer;
mod revenue;
mod roi;
mod sessions;
mod settings;
mod stats;
mod utils;

#[cfg(test)]
mod tests;

use crate::{
    bot::BotState,
    consts::SESSION_SAVE_INTERVAL,
    market_data::HttpMarketData,
    roi::RoiOrchestrator,
    sessions::{save_shared, FileSerializable, SessionStore},
    settings::Settings,
    stats::Stats,
};

fn spawn_session_saver(path: PathBuf, stats: Arc<Mutex<Stats>>, sessions: Arc<Mutex<SessionStore>>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SAVE_INTERVAL);
        // first tick completes immediately, nothing changed yet
        interval.tick().await;
        loop {
            interval.tick().await;

            {
                let stats_locked = stats.lock().await;
                stats_locked.print();
            }

            save_shared(&path, &sessions).await;
        }
    });
}

fn init_logging() -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    fn get_filter() -> Result<EnvFilter, Box<dyn std::error::Error>> {
        Ok(EnvFilter::builder()
            .with_default_directive(LevelFilter::DEBUG.into())
            .from_env()?)
    }

    let file_appender = tracing_appender::rolling::hourly("logs/", "gpu_roi_bot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_filter = get_filter()?;
    let console_filter = get_filter()?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(true)
                .with_filter(console_filter),
        )
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let _guard = init_logging()?;

    info!("Starting the bot...");

    let settings = Settings::from_env()?;
    info!(
        "Session file is {} | snapshot max age {:?} | http timeout {:?}",
        settings.session_db_path.display(),
        settings.snapshot_max_age,
        settings.http_timeout
    );

    let mut sessions_itself = SessionStore::deserialize(&settings.session_db_path).await;
    let dropped = sessions_itself.prune_stale(settings.snapshot_max_age, Utc::now());
    info!(
        "Loaded {} sessions, dropped {} idle ones",
        sessions_itself.get_size(),
        dropped
    );
    let sessions = Arc::new(Mutex::new(sessions_itself));
    let stats = Arc::new(Mutex::new(Stats::new()));

    let market_data = Arc::new(HttpMarketData::from_settings(&settings)?);
    let state = Arc::new(BotState {
        sessions: sessions.clone(),
        orchestrator: RoiOrchestrator::new(market_data, stats.clone(), settings.snapshot_max_age),
    });

    spawn_session_saver(
        settings.session_db_path.clone(),
        stats.clone(),
        sessions.clone(),
    );

    let bot = Bot::new(&settings.telegram_token);
    bot::register_commands(&bot).await;

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped, saving sessions");
    save_shared(&settings.session_db_path, &sessions).await;

    Ok(())
}
