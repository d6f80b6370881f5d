use tracing::info;

use crate::{Context, Error};

/// Stop audio, clear queue, and disconnect
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;
    info!("User {} invoked stop (guild: {guild_id})", ctx.author().name);

    if ctx.data().scheduler.stop(guild_id).await {
        ctx.reply("Stopped, cleared queue, and disconnected.").await?;
    } else {
        ctx.reply("I am not connected to a voice channel.").await?;
    }

    Ok(())
}
