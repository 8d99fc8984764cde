use std::sync::Arc;

use anyhow::Context;
use restaurant_menu::config::Config;
use teloxide::{
    dispatching::dialogue::InMemStorage,
    dptree,
    prelude::{Dispatcher, LoggingErrorHandler, Requester},
    utils::command::BotCommands,
    Bot,
};

mod handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::from_env()?;
    cfg.setup_logging()?;

    let token = cfg
        .tgbot_token
        .clone()
        .context("TGBOT_TOKEN env not found")?;
    let bot = Bot::new(token);
    bot.set_my_commands(handlers::Commands::bot_commands())
        .await
        .context("fail to register bot commands")?;

    let store = cfg.open_store().await?;
    let schema = handlers::handler_schema();

    tracing::info!("bot started");
    Dispatcher::builder(bot, schema)
        .dependencies(dptree::deps![
            InMemStorage::<handlers::ChatState>::new(),
            store,
            Arc::new(cfg),
            handlers::Views::default()
        ])
        .enable_ctrlc_handler()
        .default_handler(|_| async move {})
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error occur when handling update",
        ))
        .build()
        .dispatch()
        .await;
    Ok(())
}
