use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, Layer, Registry};

use crate::config::{Config, LoggingConfig};
use crate::discord::bot::DiscordBot;
use crate::store::open_store;

mod config;
mod discord;
mod pagination;
mod store;

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let (_file_guard, _stdout_guard) = init_logging(&config.logging);

    let span = tracing::span!(tracing::Level::INFO, "main", backend = ?config.storage.backend);
    let _enter = span.enter();
    tracing::info!("Starting character select bot");

    let rt_discord_bot = tokio::runtime::Runtime::new()?;
    rt_discord_bot.block_on(async {
        let store = open_store(&config.storage).await?;
        let mut discord_bot_manager = DiscordBot::new(&config, store).await?;
        discord_bot_manager.run_bot().await
    })
}

fn init_logging(logging: &LoggingConfig) -> (tracing_appender::non_blocking::WorkerGuard, tracing_appender::non_blocking::WorkerGuard) {
    let level = logging.level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);

    let file_appender = tracing_appender::rolling::hourly(&logging.directory, "rolling.log");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_filter(level);

    let (non_blocking, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_writer(non_blocking)
        .with_filter(level);

    Registry::default().with(file_layer).with(stdout_layer).init();

    (file_guard, stdout_guard)
}
