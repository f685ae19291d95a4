//! # Audio Module
//!
//! Per-guild playback for the jukebox.
//!
//! ## Architecture
//!
//! ### [`queue`] - Sessions
//! - One [`queue::Session`] per guild: pending tracks, the current track,
//!   the status channel and the player loop lifecycle
//! - [`registry::SessionRegistry`] owns the sessions and tears them down
//!
//! ### [`worker`] - Player Loop
//! - One task per guild, woken on enqueue, that streams tracks in order
//! - A track ends through its [`completion::CompletionSignal`], fired once
//!   on natural end, skip, stop or error
//!
//! ### [`player`] - Command Surface
//! - [`player::AudioPlayer`] is what the slash commands call into
//!
//! ### [`transcoder`] - Runtime Checks
//! - ffmpeg discovery and the Opus check done once at startup
//!
//! ## Audio Format
//!
//! - **Sample Rate**: 48kHz (Discord standard)
//! - **Channels**: Stereo
//! - **Transport**: ffmpeg → WAV pipe → songbird → Opus

use async_trait::async_trait;
use serenity::{http::Http, model::id::ChannelId};
use std::sync::Arc;

pub mod completion;
pub mod player;
pub mod queue;
pub mod registry;
pub mod transcoder;
pub mod worker;

/// Posts status messages (now playing, playback failures) to a text channel.
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, channel_id: ChannelId, content: &str) -> anyhow::Result<()>;
}

/// [`Announcer`] that sends plain messages through the Discord REST API.
pub struct ChannelAnnouncer {
    http: Arc<Http>,
}

impl ChannelAnnouncer {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn announce(&self, channel_id: ChannelId, content: &str) -> anyhow::Result<()> {
        channel_id.say(self.http.as_ref(), content).await?;
        Ok(())
    }
}
