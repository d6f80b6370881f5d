use serenity::builder::CreateEmbed;

use crate::music::{volume_to_percent, Track};

pub fn now_playing(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("🎵 Now playing")
        .description(format!("[{}]({})", track.title, track.source_url))
        .color(0x1DB954);

    if let Some(dur) = track.formatted_duration() {
        embed = embed.field("Duration", dur, true);
    }

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
}

pub fn now_playing_detail(track: &Track, volume: f32, paused: bool) -> CreateEmbed {
    let mut embed = now_playing(track).field("Volume", format!("{}%", volume_to_percent(volume)), true);
    if paused {
        embed = embed.title("⏸️ Paused");
    }
    embed
}

pub fn queued(tracks: &[Track]) -> CreateEmbed {
    let embed = CreateEmbed::new().color(0x5865F2);
    match tracks {
        [track] => {
            let mut embed = embed
                .title("✅ Queued")
                .description(format!("[{}]({})", track.title, track.source_url));
            if let Some(dur) = track.formatted_duration() {
                embed = embed.field("Duration", dur, true);
            }
            embed
        }
        _ => embed
            .title("✅ Queued playlist")
            .description(format!("**{} tracks**", tracks.len())),
    }
}

/// First ten upcoming titles, then a count of the rest.
pub fn queue_text(tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return "Queue is empty.".to_string();
    }

    let mut lines: Vec<String> = tracks
        .iter()
        .take(10)
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t.title))
        .collect();
    if tracks.len() > 10 {
        lines.push(format!("...and {} more.", tracks.len() - 10));
    }
    format!("**Queue:**\n{}", lines.join("\n"))
}

pub fn error(message: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(message)
        .color(0xED4245)
}
