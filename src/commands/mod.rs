mod ask;
mod builtin;
mod fun;
mod help;
mod nowplaying;
mod pause;
mod play;
mod queue;
mod skip;
mod stop;
mod volume;

use poise::CreateReply;
use tracing::warn;

use crate::config::{BotConfig, CHATBOT_MODULE, MUSIC_MODULE, RANDFUN_MODULE, SURPRISE_MODULE};
use crate::{Context, Data, Error};

pub const BUILTIN_CATEGORY: &str = "Builtin";
pub const MUSIC_CATEGORY: &str = "Music";
pub const CHATBOT_CATEGORY: &str = "Chatbot";
pub const RANDFUN_CATEGORY: &str = "RandFun";
pub const SURPRISE_CATEGORY: &str = "Surprise";

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        help::help(),
        builtin::ping(),
        builtin::uptime(),
        builtin::listmodules(),
        play::play(),
        play::forceplay(),
        skip::skip(),
        queue::queue(),
        pause::pause(),
        pause::resume(),
        pause::playpause(),
        volume::volume(),
        stop::stop(),
        nowplaying::nowplaying(),
        ask::ask(),
        fun::idfk(),
        fun::gif(),
        fun::suprise(),
    ]
}

/// Commands of the built-in set plus every module enabled in `config`.
pub fn enabled(config: &BotConfig) -> Vec<poise::Command<Data, Error>> {
    all()
        .into_iter()
        .filter(|cmd| match cmd.category.as_deref() {
            Some(MUSIC_CATEGORY) => config.is_enabled(MUSIC_MODULE),
            Some(CHATBOT_CATEGORY) => config.is_enabled(CHATBOT_MODULE),
            Some(RANDFUN_CATEGORY) => config.is_enabled(RANDFUN_MODULE),
            Some(SURPRISE_CATEGORY) => config.is_enabled(SURPRISE_MODULE),
            _ => true,
        })
        .collect()
}

async fn module_allowed(ctx: Context<'_>, module: &str) -> Result<bool, Error> {
    let author = ctx.author();
    if ctx.data().config.module(module).is_user_allowed(author.id.get()) {
        return Ok(true);
    }
    warn!("Unauthorized {module} access attempt by {} ({})", author.name, author.id);
    ctx.send(
        CreateReply::default()
            .content("You do not have permission to use this.")
            .ephemeral(true),
    )
    .await?;
    Ok(false)
}

pub async fn music_allowed(ctx: Context<'_>) -> Result<bool, Error> {
    module_allowed(ctx, MUSIC_MODULE).await
}

pub async fn chatbot_allowed(ctx: Context<'_>) -> Result<bool, Error> {
    module_allowed(ctx, CHATBOT_MODULE).await
}
