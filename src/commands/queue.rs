use crate::music::queue as music_queue;
use crate::utils::embed;
use crate::{Context, Error};

/// Show the current queue
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn queue(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    let (_, tracks) =
        music_queue::get_queue_list(ctx.data().scheduler.queues(), guild_id).await;

    ctx.reply(embed::queue_text(&tracks)).await?;

    Ok(())
}
