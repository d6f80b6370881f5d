use crate::{Context, Error};

/// Skip the current track
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    if ctx.data().scheduler.skip(guild_id).await {
        ctx.reply("Skipped.").await?;
    } else {
        ctx.reply("Nothing is playing.").await?;
    }

    Ok(())
}
