use crate::music::player::SinkState;
use crate::{Context, Error};

/// Pause the current audio
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn pause(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    if ctx.data().scheduler.pause(guild_id).await {
        ctx.reply("Paused.").await?;
    } else {
        ctx.reply("Nothing is playing.").await?;
    }

    Ok(())
}

/// Resume paused audio
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn resume(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    if ctx.data().scheduler.resume(guild_id).await {
        ctx.reply("Resumed.").await?;
    } else {
        ctx.reply("Nothing is paused.").await?;
    }

    Ok(())
}

/// Toggle between paused and playing
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn playpause(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;
    let scheduler = &ctx.data().scheduler;

    let toggled = match scheduler.sink_state(guild_id).await {
        Some(SinkState::Playing) => scheduler.pause(guild_id).await.then_some("Paused."),
        Some(SinkState::Paused) => scheduler.resume(guild_id).await.then_some("Resumed."),
        _ => None,
    };
    let reply = toggled.unwrap_or("Nothing is playing.");
    ctx.reply(reply).await?;

    Ok(())
}
