use std::sync::Arc;

use serenity::model::id::GuildId;

use super::player::{Announcer, AudioSink};
use super::{volume_from_percent, GuildHandle, QueueManager, Track, DEFAULT_VOLUME};

/// Returns the guild's state, creating it on first use.
pub async fn state(manager: &QueueManager, guild_id: GuildId) -> GuildHandle {
    if let Some(existing) = existing(manager, guild_id).await {
        return existing;
    }
    let mut guilds = manager.write().await;
    guilds.entry(guild_id).or_default().clone()
}

pub async fn existing(manager: &QueueManager, guild_id: GuildId) -> Option<GuildHandle> {
    let guilds = manager.read().await;
    guilds.get(&guild_id).cloned()
}

/// Binds a voice connection and the channel that receives playback notices.
pub async fn attach(
    manager: &QueueManager,
    guild_id: GuildId,
    sink: Arc<dyn AudioSink>,
    announcer: Arc<dyn Announcer>,
) {
    let guild = state(manager, guild_id).await;
    let mut q = guild.lock().await;
    q.sink = Some(sink);
    q.announcer = Some(announcer);
}

pub async fn sink(manager: &QueueManager, guild_id: GuildId) -> Option<Arc<dyn AudioSink>> {
    let guild = existing(manager, guild_id).await?;
    let q = guild.lock().await;
    q.sink.clone()
}

/// Appends tracks and returns the new queue length.
pub async fn enqueue(manager: &QueueManager, guild_id: GuildId, tracks: Vec<Track>) -> usize {
    let guild = state(manager, guild_id).await;
    let mut q = guild.lock().await;
    q.tracks.extend(tracks);
    q.tracks.len()
}

pub async fn get_queue_list(manager: &QueueManager, guild_id: GuildId) -> (Option<Track>, Vec<Track>) {
    match existing(manager, guild_id).await {
        Some(guild) => {
            let q = guild.lock().await;
            (q.current.clone(), q.tracks.iter().cloned().collect())
        }
        None => (None, vec![]),
    }
}

pub async fn get_current(manager: &QueueManager, guild_id: GuildId) -> Option<Track> {
    let guild = existing(manager, guild_id).await?;
    let q = guild.lock().await;
    q.current.clone()
}

/// Stores the clamped volume and applies it to the playing track, if any.
pub async fn set_volume(manager: &QueueManager, guild_id: GuildId, percent: i64) -> f32 {
    let volume = volume_from_percent(percent);
    let guild = state(manager, guild_id).await;
    let mut q = guild.lock().await;
    q.volume = volume;
    if let Some(sink) = &q.sink {
        sink.set_volume(volume).await;
    }
    volume
}

pub async fn get_volume(manager: &QueueManager, guild_id: GuildId) -> f32 {
    match existing(manager, guild_id).await {
        Some(guild) => guild.lock().await.volume,
        None => DEFAULT_VOLUME,
    }
}

/// Drops the guild's state and hands back its connection for teardown.
pub async fn clear(manager: &QueueManager, guild_id: GuildId) -> Option<Arc<dyn AudioSink>> {
    let removed = {
        let mut guilds = manager.write().await;
        guilds.remove(&guild_id)
    }?;
    let mut q = removed.lock().await;
    q.tracks.clear();
    q.current = None;
    q.announcer = None;
    q.sink.take()
}

pub async fn is_empty(manager: &QueueManager, guild_id: GuildId) -> bool {
    match existing(manager, guild_id).await {
        Some(guild) => {
            let q = guild.lock().await;
            q.current.is_none() && q.tracks.is_empty()
        }
        None => true,
    }
}
