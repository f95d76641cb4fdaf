use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use game_deals_bot::bot;
use game_deals_bot::config::BotConfig;
use game_deals_bot::context::AppContext;
use game_deals_bot::gateway::{ApiClient, BackendGateway};
use game_deals_bot::localization::init_localization;
use game_deals_bot::scheduler::NotificationScheduler;
use game_deals_bot::transport::{MessagingTransport, TelegramTransport};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = BotConfig::from_env().context("Failed to load configuration")?;
    init_tracing(config.json_logs);

    info!("Starting Game Deals Telegram Bot");

    init_localization().context("Failed to load message catalog")?;

    let gateway: Arc<dyn BackendGateway> =
        Arc::new(ApiClient::new(&config.gateway).context("Failed to build backend client")?);
    info!(base_url = %config.gateway.base_url, "Backend client ready");

    let bot = Bot::new(&config.telegram_token);
    let transport: Arc<dyn MessagingTransport> = Arc::new(TelegramTransport::new(bot.clone()));

    let ctx = Arc::new(AppContext::new(
        Arc::clone(&gateway),
        Arc::clone(&transport),
        config.search.clone(),
        config.gateway.details_language.clone(),
    ));

    let cancel = CancellationToken::new();
    let scheduler = NotificationScheduler::new(gateway, transport, config.scheduler.clone());
    let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let ctx = Arc::clone(&ctx);
            move |msg: Message| {
                let ctx = Arc::clone(&ctx);
                async move { bot::message_handler(msg, ctx).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let ctx = Arc::clone(&ctx);
            move |q: CallbackQuery| {
                let ctx = Arc::clone(&ctx);
                async move { bot::callback_handler(q, ctx).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down scheduler");
    cancel.cancel();
    if let Err(e) = scheduler_task.await {
        error!(error = %e, "Scheduler task ended abnormally");
    }

    Ok(())
}
