use crate::bot;
use crate::bot::handlers::{is_command_text, Command};
use crate::config::BotSettings;
use poster_bot_core::poster::{CachedPosterResolver, PosterResolver, StorePosterResolver};
use poster_bot_core::{ModeRouter, UserStateStore};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, error, info};

/// Run the Telegram transport runtime.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let router = init_router(&settings);

    let bot = Bot::new(settings.telegram.telegram_token.clone());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router, settings])
        .default_handler(|upd| async move {
            debug!("Ignoring unhandled update {}", upd.id.0);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn init_resolver(settings: &BotSettings) -> Arc<dyn PosterResolver> {
    let core = settings.core.as_ref();
    info!(
        "Initializing poster resolver (results: {}, timeout: {}s, strict: {}, cache ttl: {}s, cache max: {})",
        core.search_results(),
        core.poster_http_timeout_secs,
        core.poster_strict_match,
        core.poster_cache_ttl_secs,
        core.poster_cache_max_size
    );

    Arc::new(CachedPosterResolver::new(
        StorePosterResolver::from_settings(core),
        core.poster_cache_ttl(),
        core.poster_cache_max_size,
    ))
}

fn init_router(settings: &BotSettings) -> Arc<ModeRouter> {
    let store = Arc::new(UserStateStore::new());
    Arc::new(ModeRouter::new(
        store,
        init_resolver(settings),
        settings.core.link_url.clone(),
    ))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| {
                        msg.text().is_some_and(|text| !is_command_text(text))
                    })
                    .endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    router: Arc<ModeRouter>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg, router).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    router: Arc<ModeRouter>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_text(bot, msg, router).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    router: Arc<ModeRouter>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_callback(bot, q, router).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramSettings;
    use poster_bot_core::config::CoreSettings;

    fn settings() -> BotSettings {
        let core = ::config::Config::builder()
            .set_override("link_url", "https://example.com/open")
            .and_then(|b| b.build())
            .and_then(CoreSettings::from_config)
            .expect("core settings");
        BotSettings::new(
            core,
            TelegramSettings {
                telegram_token: "123:abc".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_router_uses_configured_link() {
        let router = init_router(&settings());

        router.handle(1, poster_bot_core::Inbound::Start).await;
        let replies = router
            .handle(1, poster_bot_core::Inbound::Text("hello".to_string()))
            .await;

        assert_eq!(
            replies,
            vec![poster_bot_core::Reply::LinkPrompt {
                text: "Click the button below:".to_string(),
                url: "https://example.com/open".to_string(),
            }]
        );
    }
}
