use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::{Data, Error};

const ALONE_GRACE: Duration = Duration::from_secs(30);

fn members_in(ctx: &serenity::Context, guild_id: serenity::GuildId, channel: u64) -> Option<usize> {
    let guild = ctx.cache.guild(guild_id)?;
    Some(
        guild
            .voice_states
            .values()
            .filter(|vs| vs.channel_id.is_some_and(|ch| ch.get() == channel))
            .count(),
    )
}

/// Leaves voice once the bot has been alone in its channel for a while.
pub async fn handle(
    ctx: &serenity::Context,
    _old: &Option<serenity::VoiceState>,
    new: &serenity::VoiceState,
    data: &Data,
) -> Result<(), Error> {
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };

    let Some(manager) = songbird::get(ctx).await else {
        return Ok(());
    };

    let Some(handler_lock) = manager.get(guild_id) else {
        return Ok(());
    };
    let Some(bot_channel) = handler_lock.lock().await.current_channel() else {
        return Ok(());
    };
    let bot_channel = bot_channel.0.get();

    if !matches!(members_in(ctx, guild_id, bot_channel), Some(count) if count <= 1) {
        return Ok(());
    }

    let ctx = ctx.clone();
    let scheduler = data.scheduler.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ALONE_GRACE).await;

        if members_in(&ctx, guild_id, bot_channel).is_some_and(|count| count <= 1) {
            info!("Left alone in voice, disconnecting (guild: {guild_id})");
            if !scheduler.stop(guild_id).await {
                if let Err(e) = manager.remove(guild_id).await {
                    warn!("Failed to leave voice (guild: {guild_id}): {e}");
                }
            }
        }
    });

    Ok(())
}
