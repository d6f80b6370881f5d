use std::sync::Arc;

use poise::CreateReply;
use tracing::info;

use crate::music::player::{ChannelAnnouncer, SongbirdSink};
use crate::music::{queue, source};
use crate::utils::embed;
use crate::{Context, Error};

async fn play_impl(ctx: Context<'_>, input: String, allow_search: bool) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in a server")?;
    info!(
        "User {} invoked {} with: {input}",
        ctx.author().name,
        if allow_search { "play" } else { "forceplay" }
    );

    let channel_id = {
        let guild = ctx.guild().ok_or("Could not read server information")?;
        guild
            .voice_states
            .get(&ctx.author().id)
            .and_then(|vs| vs.channel_id)
    };

    let channel_id = match channel_id {
        Some(id) => id,
        None => {
            ctx.send(CreateReply::default().embed(embed::error("You must be in a voice channel first!")))
                .await?;
            return Ok(());
        }
    };

    ctx.defer().await?;

    let scheduler = &ctx.data().scheduler;
    let connected = match queue::sink(scheduler.queues(), guild_id).await {
        Some(sink) => sink.is_connected().await,
        None => false,
    };
    if !connected {
        let manager = songbird::get(ctx.serenity_context())
            .await
            .ok_or("Voice client is not registered")?;
        let call = manager.join(guild_id, channel_id).await?;
        queue::attach(
            scheduler.queues(),
            guild_id,
            Arc::new(SongbirdSink::new(guild_id, manager, call)),
            Arc::new(ChannelAnnouncer::new(
                ctx.serenity_context().http.clone(),
                ctx.channel_id(),
            )),
        )
        .await;
    }

    let tracks = source::extract_tracks(ctx.data().resolver.as_ref(), &input, allow_search).await;
    if tracks.is_empty() {
        let message = if allow_search {
            "Failed to get audio source."
        } else {
            "forceplay requires a direct URL or file:// path (no search)."
        };
        ctx.send(CreateReply::default().embed(embed::error(message)))
            .await?;
        return Ok(());
    }

    ctx.send(CreateReply::default().embed(embed::queued(&tracks)))
        .await?;
    scheduler.enqueue(guild_id, tracks).await;
    scheduler.play_if_idle(guild_id).await?;

    Ok(())
}

/// Play a song or playlist from YouTube, a direct URL, a local file, or a search query
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Song title, URL or file:// path"]
    #[rest]
    input: String,
) -> Result<(), Error> {
    play_impl(ctx, input, true).await
}

/// Play ONLY a direct URL or file:// path (no YouTube search detection)
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    category = "Music",
    check = "crate::commands::music_allowed"
)]
pub async fn forceplay(
    ctx: Context<'_>,
    #[description = "Direct URL or file:// path"]
    #[rest]
    input: String,
) -> Result<(), Error> {
    play_impl(ctx, input, false).await
}
