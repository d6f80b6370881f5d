use poise::serenity_prelude as serenity;
use serenity::builder::{
    CreateActionRow, CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use serenity::model::application::ComponentInteraction;
use tracing::info;

use crate::config::MUSIC_MODULE;
use crate::music::queue;
use crate::utils::{components, embed};
use crate::{Data, Error};

async fn respond_ephemeral(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    message: &str,
) -> Result<(), Error> {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .embed(embed::error(message))
            .ephemeral(true),
    );
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

async fn update_message(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    embed: CreateEmbed,
    components: Vec<CreateActionRow>,
) -> Result<(), Error> {
    let response = CreateInteractionResponse::UpdateMessage(
        CreateInteractionResponseMessage::new()
            .embed(embed)
            .components(components),
    );
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

/// Player buttons attached to now-playing messages.
pub async fn handle(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let custom_id = interaction.data.custom_id.as_str();
    if ![components::PAUSE, components::RESUME, components::SKIP, components::STOP]
        .contains(&custom_id)
    {
        return Ok(());
    }

    let guild_id = interaction
        .guild_id
        .ok_or("This only works in a server")?;

    if !data
        .config
        .module(MUSIC_MODULE)
        .is_user_allowed(interaction.user.id.get())
    {
        respond_ephemeral(ctx, interaction, "You do not have permission to use this.").await?;
        return Ok(());
    }

    let manager = songbird::get(ctx)
        .await
        .ok_or("Voice client is not registered")?;

    let bot_channel = match manager.get(guild_id) {
        Some(handler_lock) => handler_lock.lock().await.current_channel(),
        None => None,
    };
    let Some(bot_channel) = bot_channel else {
        respond_ephemeral(ctx, interaction, "I am not connected to a voice channel.").await?;
        return Ok(());
    };

    let user_in_bot_channel = {
        let guild = ctx
            .cache
            .guild(guild_id)
            .ok_or("Could not read server information")?;
        guild
            .voice_states
            .get(&interaction.user.id)
            .and_then(|vs| vs.channel_id)
            .is_some_and(|ch| ch.get() == bot_channel.0.get())
    };

    if !user_in_bot_channel {
        respond_ephemeral(ctx, interaction, "You must be in my voice channel.").await?;
        return Ok(());
    }

    info!("Button {custom_id} pressed by {} (guild: {guild_id})", interaction.user.name);
    let scheduler = &data.scheduler;

    match custom_id {
        components::PAUSE | components::RESUME => {
            let paused = custom_id == components::PAUSE;
            let changed = if paused {
                scheduler.pause(guild_id).await
            } else {
                scheduler.resume(guild_id).await
            };
            if !changed {
                respond_ephemeral(ctx, interaction, "Nothing is playing.").await?;
                return Ok(());
            }

            let current = queue::get_current(scheduler.queues(), guild_id).await;
            let volume = queue::get_volume(scheduler.queues(), guild_id).await;
            let e = match current {
                Some(track) => embed::now_playing_detail(&track, volume, paused),
                None => embed::error("Nothing is playing."),
            };
            update_message(ctx, interaction, e, components::music_components(paused)).await?;
        }
        components::SKIP => {
            if !scheduler.skip(guild_id).await {
                respond_ephemeral(ctx, interaction, "Nothing is playing.").await?;
                return Ok(());
            }
            let e = CreateEmbed::new()
                .title("⏭️ Skipped")
                .color(0x5865F2);
            update_message(ctx, interaction, e, components::music_components_disabled()).await?;
        }
        _ => {
            scheduler.stop(guild_id).await;
            let e = CreateEmbed::new()
                .title("⏹️ Stopped")
                .description("Stopped, cleared queue, and disconnected.")
                .color(0xED4245);
            update_message(ctx, interaction, e, components::music_components_disabled()).await?;
        }
    }

    Ok(())
}
