//! Reply and announcement texts. Kept in one place so the command handlers
//! and the player loop word things the same way.

use crate::{audio::player::PlayOutcome, error::MusicError, sources::Track};

pub const JOINED: &str = "✅ Joined voice channel.";
pub const NOTHING_FOUND: &str = "❌ I couldn’t find anything for that.";
pub const LEFT: &str = "👋 Left voice channel and cleared the queue.";
pub const STOPPED: &str = "⏹️ Stopped and cleared the queue.";
pub const SKIPPED: &str = "⏭️ Skipped.";
pub const PAUSED: &str = "⏸️ Paused.";
pub const RESUMED: &str = "▶️ Resumed.";
pub const NOTHING_PLAYING_NOW: &str = "Nothing is playing right now.";
pub const QUEUE_EMPTY: &str = "Queue is empty.";
pub const GUILD_ONLY: &str = "❌ This command only works in a server.";

/// Reply for a failed command. "Nothing to act on" notices go out as plain
/// text, real failures get the ❌ prefix.
pub fn error(e: &MusicError) -> String {
    match e {
        MusicError::NotConnected | MusicError::NothingPlaying | MusicError::NothingPaused => {
            e.to_string()
        }
        _ => format!("❌ {e}"),
    }
}

pub fn now_playing(track: &Track) -> String {
    format!(
        "🎶 Now playing: **{}** (requested by {})",
        track.title(),
        track.requester().mention()
    )
}

pub fn play_outcome(outcome: &PlayOutcome) -> String {
    match outcome {
        PlayOutcome::NothingFound => NOTHING_FOUND.to_string(),
        PlayOutcome::Queued(track) => format!("✅ Queued: **{}**", track.title()),
        PlayOutcome::QueuedMany(count) => format!("✅ Queued **{count}** tracks."),
    }
}

pub fn now(current: Option<&Track>) -> String {
    current.map_or_else(|| NOTHING_PLAYING_NOW.to_string(), now_playing)
}

/// Numbered listing of the upcoming tracks.
pub fn queue_listing(tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return QUEUE_EMPTY.to_string();
    }

    let lines: Vec<String> = tracks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {} (by {})", i + 1, t.title(), t.requester().display_name()))
        .collect();

    format!("📜 Up next:\n{}", lines.join("\n"))
}
