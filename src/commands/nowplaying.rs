use poise::CreateReply;

use crate::music::player::SinkState;
use crate::music::queue;
use crate::utils::{components, embed};
use crate::{Context, Error};

/// Show the track that is playing right now
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn nowplaying(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;
    let scheduler = &ctx.data().scheduler;

    let Some(track) = queue::get_current(scheduler.queues(), guild_id).await else {
        ctx.send(CreateReply::default().embed(embed::error("Nothing is playing.")))
            .await?;
        return Ok(());
    };

    let volume = queue::get_volume(scheduler.queues(), guild_id).await;
    let is_paused = scheduler.sink_state(guild_id).await == Some(SinkState::Paused);

    ctx.send(
        CreateReply::default()
            .embed(embed::now_playing_detail(&track, volume, is_paused))
            .components(components::music_components(is_paused)),
    )
    .await?;

    Ok(())
}
