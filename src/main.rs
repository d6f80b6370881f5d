use std::sync::Arc;
use std::time::{Duration, Instant};

use poise::serenity_prelude as serenity;
use poise::CreateReply;
use songbird::SerenityInit;
use turtlebott::ai::gemini::GeminiClient;
use turtlebott::ai::prompt::PromptHandler;
use turtlebott::ai::{self, ConversationStore};
use turtlebott::config::{self, BotConfig, CHATBOT_MODULE, KNOWN_MODULES};
use turtlebott::music::player::Scheduler;
use turtlebott::music::{self, source::YtDlp};
use turtlebott::{commands, events, logging, Data, Error};

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        // The check already told the user why.
        poise::FrameworkError::CommandCheckFailed { error: None, .. } => {}
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!("Command '{}' failed: {error}", ctx.command().name);
            let _ = ctx
                .send(
                    CreateReply::default()
                        .content("Something went wrong while running that command.")
                        .ephemeral(true),
                )
                .await;
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {e}");
            }
        }
    }
}

fn log_module_summary(config: &BotConfig) {
    for (name, _) in KNOWN_MODULES {
        if config.is_enabled(name) {
            tracing::info!("Loading module: {name}");
        }
    }
    if KNOWN_MODULES.iter().all(|(name, _)| !config.is_enabled(name)) {
        tracing::warn!("All modules are disabled in the config!");
    } else {
        tracing::info!("All enabled modules loaded successfully.");
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();
    let start_time = Instant::now();

    let env = config::Config::from_env();
    let bot_config = BotConfig::load(&env.config_path)?;
    log_module_summary(&bot_config);

    let http_client = reqwest::Client::new();

    let chatbot = if bot_config.is_enabled(CHATBOT_MODULE) {
        match &env.google_api_key {
            Some(key) => {
                let settings = bot_config.module(CHATBOT_MODULE);
                let store = Arc::new(ConversationStore::new(
                    settings.max_turns,
                    Duration::from_secs(settings.timeout_seconds),
                ));
                let generator = GeminiClient::new(http_client.clone(), key.clone(), &settings);
                Some(PromptHandler::new(
                    store,
                    Arc::new(generator),
                    Arc::new(http_client),
                ))
            }
            None => {
                tracing::warn!("GOOGLE_API_KEY is not set, chatbot module stays off");
                None
            }
        }
    } else {
        None
    };

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let prefix = bot_config.prefix.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::enabled(&bot_config),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                ctx.set_presence(
                    Some(serenity::ActivityData::playing("Beep boop!")),
                    serenity::OnlineStatus::DoNotDisturb,
                );

                if let Some(handler) = &chatbot {
                    ai::spawn_sweeper(handler.store().clone(), ai::SWEEP_INTERVAL);
                }

                tracing::info!("Logged in as {}", ready.user.name);
                tracing::info!("Done! (took {}ms)", start_time.elapsed().as_millis());
                Ok(Data {
                    config: bot_config,
                    scheduler: Scheduler::spawn(music::new_queue_manager()),
                    resolver: Arc::new(YtDlp::new()),
                    chatbot,
                    started_at: start_time,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&env.discord_token, intents)
        .framework(framework)
        .register_songbird()
        .await?;

    if let Err(e) = client.start().await {
        tracing::error!("Client error: {e}");
    }
    Ok(())
}
