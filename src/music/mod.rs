pub mod player;
pub mod queue;
pub mod source;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serenity::model::id::GuildId;
use tokio::sync::{Mutex, RwLock};

use player::{Announcer, AudioSink};

pub const MAX_VOLUME: f32 = 2.0;
pub const DEFAULT_VOLUME: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackKind {
    Local,
    Remote,
}

/// Arguments handed to the decoder process around its `-i <locator>` input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeParams {
    pub before_options: Vec<String>,
    pub options: Vec<String>,
}

impl DecodeParams {
    pub fn local() -> Self {
        Self {
            before_options: Vec::new(),
            options: vec!["-vn".to_string()],
        }
    }

    pub fn remote() -> Self {
        Self {
            before_options: [
                "-reconnect",
                "1",
                "-reconnect_streamed",
                "1",
                "-reconnect_delay_max",
                "5",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            options: vec!["-vn".to_string()],
        }
    }

    pub fn for_kind(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Local => Self::local(),
            TrackKind::Remote => Self::remote(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub title: String,
    pub source_url: String,
    pub playable_locator: String,
    pub kind: TrackKind,
    pub decode_params: DecodeParams,
    pub duration: Option<u64>,
    pub thumbnail: Option<String>,
}

impl Track {
    pub fn local(title: String, source_url: String, path: String) -> Self {
        Self {
            title,
            source_url,
            playable_locator: path,
            kind: TrackKind::Local,
            decode_params: DecodeParams::local(),
            duration: None,
            thumbnail: None,
        }
    }

    pub fn formatted_duration(&self) -> Option<String> {
        self.duration.map(format_duration)
    }
}

/// `m:ss`, or `h:mm:ss` once the track passes an hour.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let remaining = secs % 60;
    if hours > 0 {
        format!("{hours}:{mins:02}:{remaining:02}")
    } else {
        format!("{mins}:{remaining:02}")
    }
}

/// Maps a user-facing percentage onto the output gain, clamped to `[0.0, 2.0]`.
pub fn volume_from_percent(percent: i64) -> f32 {
    (percent as f32 / 100.0).clamp(0.0, MAX_VOLUME)
}

pub fn volume_to_percent(volume: f32) -> u32 {
    (volume * 100.0).round() as u32
}

/// Playback state of one guild. The surrounding mutex is the guild's guard:
/// whoever holds it is the only one starting playback for that guild.
pub struct GuildQueue {
    pub sink: Option<Arc<dyn AudioSink>>,
    pub announcer: Option<Arc<dyn Announcer>>,
    pub tracks: VecDeque<Track>,
    pub current: Option<Track>,
    /// Token of the track the sink was last told to play. Only the end signal
    /// carrying this token may advance the queue.
    pub playing: Option<u64>,
    pub volume: f32,
}

impl Default for GuildQueue {
    fn default() -> Self {
        Self {
            sink: None,
            announcer: None,
            tracks: VecDeque::new(),
            current: None,
            playing: None,
            volume: DEFAULT_VOLUME,
        }
    }
}

pub type GuildHandle = Arc<Mutex<GuildQueue>>;
pub type QueueManager = Arc<RwLock<HashMap<GuildId, GuildHandle>>>;

pub fn new_queue_manager() -> QueueManager {
    Arc::new(RwLock::new(HashMap::new()))
}
