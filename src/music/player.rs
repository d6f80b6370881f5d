use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::builder::CreateMessage;
use serenity::model::id::{ChannelId, GuildId};
use songbird::events::{Event, EventContext, EventHandler, TrackEvent};
use songbird::input::{ChildContainer, Input};
use songbird::tracks::{PlayMode, Track as DriverTrack, TrackHandle};
use songbird::{Call, Songbird};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::queue;
use super::{GuildQueue, QueueManager, Track};
use crate::utils::{components, embed};
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkState {
    Idle,
    Playing,
    Paused,
}

/// A guild's voice connection, as far as the scheduler is concerned.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn is_connected(&self) -> bool;

    /// Starts `track`, replacing anything playing. `on_end` must be fired once
    /// the track stops for any reason, from whatever thread notices it.
    async fn play(&self, track: &Track, volume: f32, on_end: TrackEnd) -> Result<(), Error>;

    async fn set_volume(&self, volume: f32);
    async fn pause(&self) -> bool;
    async fn resume(&self) -> bool;
    async fn stop(&self);
    async fn state(&self) -> SinkState;
    async fn disconnect(&self);
}

#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    NowPlaying(Track),
    QueueFinished,
}

/// Where playback notices for a guild are posted.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, notice: Notice);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    TrackEnded {
        guild_id: GuildId,
        token: u64,
        error: Option<String>,
    },
}

/// One-shot completion signal for a single started track. Sending on an
/// unbounded channel never blocks, so this is safe to fire from a driver or
/// decoder thread.
pub struct TrackEnd {
    guild_id: GuildId,
    token: u64,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl TrackEnd {
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn finish(self, error: Option<String>) {
        let event = PlaybackEvent::TrackEnded {
            guild_id: self.guild_id,
            token: self.token,
            error,
        };
        if self.events.send(event).is_err() {
            warn!("Scheduler is gone, dropping track end for guild {}", self.guild_id);
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Advance {
    /// No live connection for the guild.
    Idle,
    /// Something is already playing; nothing was started.
    Busy,
    Finished,
    Started(Track),
    /// The sink refused the track; a completion event was queued in its place.
    Failed(Track),
    /// An end signal for a track that is no longer the guild's current one.
    Stale,
}

/// Drives every guild's queue. Completion events from the audio side come back
/// through [`Scheduler::run`], never by calling into the scheduler directly.
#[derive(Clone)]
pub struct Scheduler {
    queues: QueueManager,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    // Shared by every guild, so a token never repeats even after a guild's
    // state is torn down and rebuilt.
    next_token: Arc<AtomicU64>,
}

impl Scheduler {
    pub fn new(queues: QueueManager) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            queues,
            events,
            next_token: Arc::new(AtomicU64::new(1)),
        };
        (scheduler, rx)
    }

    /// Builds a scheduler and spawns its event loop on the current runtime.
    pub fn spawn(queues: QueueManager) -> Self {
        let (scheduler, rx) = Self::new(queues);
        let runner = scheduler.clone();
        tokio::spawn(async move { runner.run(rx).await });
        scheduler
    }

    pub fn queues(&self) -> &QueueManager {
        &self.queues
    }

    fn track_end(&self, guild_id: GuildId, token: u64) -> TrackEnd {
        TrackEnd {
            guild_id,
            token,
            events: self.events.clone(),
        }
    }

    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<PlaybackEvent>) {
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.handle_event(event).await {
                error!("Error scheduling next track: {e}");
            }
        }
        info!("Playback event loop stopped");
    }

    /// Applies one completion event. The queue only advances when the event
    /// belongs to the track the guild is currently playing.
    pub async fn handle_event(&self, event: PlaybackEvent) -> Result<Advance, Error> {
        match event {
            PlaybackEvent::TrackEnded {
                guild_id,
                token,
                error,
            } => {
                if let Some(e) = error {
                    error!("Player error (guild: {guild_id}): {e}");
                }
                let Some(guild) = queue::existing(&self.queues, guild_id).await else {
                    return Ok(Advance::Stale);
                };
                let mut q = guild.lock().await;
                if q.playing != Some(token) {
                    debug!("Ignoring end of replaced track {token} (guild: {guild_id})");
                    return Ok(Advance::Stale);
                }
                q.playing = None;
                self.advance(guild_id, &mut q).await
            }
        }
    }

    pub async fn enqueue(&self, guild_id: GuildId, tracks: Vec<Track>) -> usize {
        queue::enqueue(&self.queues, guild_id, tracks).await
    }

    /// Pops the queue head and starts it.
    pub async fn play_next(&self, guild_id: GuildId) -> Result<Advance, Error> {
        let Some(guild) = queue::existing(&self.queues, guild_id).await else {
            return Ok(Advance::Idle);
        };
        let mut q = guild.lock().await;
        self.advance(guild_id, &mut q).await
    }

    /// Like [`Scheduler::play_next`], but only when the sink is idle. The check
    /// and the start share one hold of the guard.
    pub async fn play_if_idle(&self, guild_id: GuildId) -> Result<Advance, Error> {
        let Some(guild) = queue::existing(&self.queues, guild_id).await else {
            return Ok(Advance::Idle);
        };
        let mut q = guild.lock().await;
        if let Some(sink) = &q.sink {
            if sink.state().await != SinkState::Idle {
                return Ok(Advance::Busy);
            }
        }
        self.advance(guild_id, &mut q).await
    }

    async fn advance(&self, guild_id: GuildId, q: &mut GuildQueue) -> Result<Advance, Error> {
        let Some(sink) = q.sink.clone() else {
            return Ok(Advance::Idle);
        };
        if !sink.is_connected().await {
            return Ok(Advance::Idle);
        }

        let Some(track) = q.tracks.pop_front() else {
            q.current = None;
            q.playing = None;
            info!("Queue finished (guild: {guild_id})");
            if let Some(announcer) = &q.announcer {
                announcer.announce(Notice::QueueFinished).await;
            }
            return Ok(Advance::Finished);
        };

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        q.current = Some(track.clone());
        q.playing = Some(token);
        if let Err(e) = sink.play(&track, q.volume, self.track_end(guild_id, token)).await {
            // The sink never took the completion signal, so send it ourselves to
            // keep the queue moving.
            warn!("Failed to start {} (guild: {guild_id}): {e}", track.title);
            self.track_end(guild_id, token).finish(Some(e.to_string()));
            return Ok(Advance::Failed(track));
        }

        info!("Now playing: {} (guild: {guild_id})", track.title);
        if let Some(announcer) = &q.announcer {
            announcer.announce(Notice::NowPlaying(track.clone())).await;
        }
        Ok(Advance::Started(track))
    }

    /// Stops the active track; its end event advances the queue.
    pub async fn skip(&self, guild_id: GuildId) -> bool {
        let Some(sink) = queue::sink(&self.queues, guild_id).await else {
            return false;
        };
        if sink.state().await == SinkState::Idle {
            return false;
        }
        sink.stop().await;
        true
    }

    pub async fn pause(&self, guild_id: GuildId) -> bool {
        match queue::sink(&self.queues, guild_id).await {
            Some(sink) => sink.pause().await,
            None => false,
        }
    }

    pub async fn resume(&self, guild_id: GuildId) -> bool {
        match queue::sink(&self.queues, guild_id).await {
            Some(sink) => sink.resume().await,
            None => false,
        }
    }

    pub async fn sink_state(&self, guild_id: GuildId) -> Option<SinkState> {
        let sink = queue::sink(&self.queues, guild_id).await?;
        Some(sink.state().await)
    }

    /// Clears the queue, stops playback and leaves voice. Returns `false` when
    /// there was no connection to tear down.
    pub async fn stop(&self, guild_id: GuildId) -> bool {
        match queue::clear(&self.queues, guild_id).await {
            Some(sink) => {
                if sink.state().await != SinkState::Idle {
                    sink.stop().await;
                }
                sink.disconnect().await;
                true
            }
            None => false,
        }
    }
}

struct TrackEndNotifier {
    end: Arc<StdMutex<Option<TrackEnd>>>,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(e.to_string()),
                _ => None,
            }),
            _ => None,
        };

        // End and Error can both fire for one track.
        let end = self.end.lock().ok().and_then(|mut slot| slot.take());
        if let Some(end) = end {
            end.finish(error);
        }
        None
    }
}

/// Spawns the decoder, writing 48 kHz stereo WAV to stdout.
fn spawn_decoder(track: &Track) -> std::io::Result<Child> {
    Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error"])
        .args(&track.decode_params.before_options)
        .arg("-i")
        .arg(&track.playable_locator)
        .args(&track.decode_params.options)
        .args(["-c:a", "pcm_s16le", "-f", "wav", "-ar", "48000", "-ac", "2", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
}

pub struct SongbirdSink {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(guild_id: GuildId, manager: Arc<Songbird>, call: Arc<Mutex<Call>>) -> Self {
        Self {
            guild_id,
            manager,
            call,
            current: Mutex::new(None),
        }
    }

    async fn handle(&self) -> Option<TrackHandle> {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn is_connected(&self) -> bool {
        self.call.lock().await.current_channel().is_some()
    }

    async fn play(&self, track: &Track, volume: f32, on_end: TrackEnd) -> Result<(), Error> {
        let child = spawn_decoder(track)?;
        let input: Input = ChildContainer::from(child).into();

        let handle = {
            let mut call = self.call.lock().await;
            call.play_only(DriverTrack::new(input).volume(volume))
        };

        let notifier = Arc::new(StdMutex::new(Some(on_end)));
        for event in [TrackEvent::End, TrackEvent::Error] {
            let added = handle.add_event(
                Event::Track(event),
                TrackEndNotifier {
                    end: notifier.clone(),
                },
            );
            if let Err(e) = added {
                // Without its end events the track would never advance the queue.
                let _ = handle.stop();
                return Err(e.into());
            }
        }

        *self.current.lock().await = Some(handle);
        Ok(())
    }

    async fn set_volume(&self, volume: f32) {
        if let Some(handle) = self.handle().await {
            let _ = handle.set_volume(volume);
        }
    }

    async fn pause(&self) -> bool {
        let Some(handle) = self.handle().await else {
            return false;
        };
        self.state().await == SinkState::Playing && handle.pause().is_ok()
    }

    async fn resume(&self) -> bool {
        let Some(handle) = self.handle().await else {
            return false;
        };
        self.state().await == SinkState::Paused && handle.play().is_ok()
    }

    async fn stop(&self) {
        if let Some(handle) = self.handle().await {
            let _ = handle.stop();
        }
    }

    async fn state(&self) -> SinkState {
        let Some(handle) = self.handle().await else {
            return SinkState::Idle;
        };
        match handle.get_info().await.map(|info| info.playing) {
            Ok(PlayMode::Play) => SinkState::Playing,
            Ok(PlayMode::Pause) => SinkState::Paused,
            _ => SinkState::Idle,
        }
    }

    async fn disconnect(&self) {
        *self.current.lock().await = None;
        if let Err(e) = self.manager.remove(self.guild_id).await {
            warn!("Failed to leave voice (guild: {}): {e}", self.guild_id);
        }
    }
}

/// Posts playback notices to a text channel.
pub struct ChannelAnnouncer {
    http: Arc<serenity::Http>,
    channel_id: ChannelId,
}

impl ChannelAnnouncer {
    pub fn new(http: Arc<serenity::Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn announce(&self, notice: Notice) {
        let message = match notice {
            Notice::NowPlaying(track) => CreateMessage::new()
                .embed(embed::now_playing(&track))
                .components(components::music_components(false)),
            Notice::QueueFinished => CreateMessage::new().content("Queue finished."),
        };
        if let Err(e) = self.channel_id.send_message(&*self.http, message).await {
            warn!("Failed to post playback notice: {e}");
        }
    }
}
