use poise::CreateReply;

use crate::music::{queue, volume_to_percent};
use crate::utils::embed;
use crate::{Context, Error};

/// Set the playback volume
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume (0-200)"] level: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;

    if !(0..=200).contains(&level) {
        ctx.send(CreateReply::default().embed(embed::error("Volume must be between 0 and 200.")))
            .await?;
        return Ok(());
    }

    let volume = queue::set_volume(ctx.data().scheduler.queues(), guild_id, level).await;
    ctx.reply(format!("🔊 Volume: **{}%**", volume_to_percent(volume)))
        .await?;

    Ok(())
}
