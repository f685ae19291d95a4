//! # Voice Module
//!
//! Connection management between the bot and a guild's voice channel.
//!
//! [`VoiceTransport`] is the seam between the playback engine and the audio
//! layer: the engine only asks whether a guild is connected, starts a track
//! with a [`CompletionSignal`], and issues stop/pause/resume. The production
//! implementation is [`driver::SongbirdTransport`].

pub mod driver;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tracing::info;

use crate::{
    audio::completion::CompletionSignal,
    error::{MusicError, MusicResult, PlaybackError},
    sources::Track,
};

/// What the transport is doing for a guild right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Channel the bot is connected to in this guild, `None` when absent or
    /// disconnected.
    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId>;

    async fn is_connected(&self, guild_id: GuildId) -> bool {
        self.current_channel(guild_id).await.is_some()
    }

    /// Joins `channel_id`, moving an existing connection if there is one.
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()>;

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()>;

    /// Builds the audio source for `track` and starts streaming it.
    ///
    /// `done` must be fired once the stream ends for any reason (natural end,
    /// stop, error). Implementations may fire it from any thread.
    async fn start(
        &self,
        guild_id: GuildId,
        track: &Track,
        done: CompletionSignal,
    ) -> Result<(), PlaybackError>;

    /// Halts the active stream; its completion signal fires as a result.
    async fn stop(&self, guild_id: GuildId);

    async fn pause(&self, guild_id: GuildId);

    async fn resume(&self, guild_id: GuildId);

    async fn state(&self, guild_id: GuildId) -> PlaybackState;
}

/// Makes sure the bot sits in the requester's voice channel.
///
/// Fails with [`MusicError::UserNotInChannel`] before touching anything when
/// the requester is not in voice. Connecting to the channel the bot already
/// occupies is a no-op.
pub async fn ensure_voice(
    transport: &dyn VoiceTransport,
    guild_id: GuildId,
    requester_channel: Option<ChannelId>,
) -> MusicResult<ChannelId> {
    let channel_id = requester_channel.ok_or(MusicError::UserNotInChannel)?;

    match transport.current_channel(guild_id).await {
        Some(current) if current == channel_id => {}
        Some(current) => {
            transport.connect(guild_id, channel_id).await?;
            info!("🔀 Conexión de voz movida en guild {} de {} a {}", guild_id, current, channel_id);
        }
        None => {
            transport.connect(guild_id, channel_id).await?;
            info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
        }
    }

    Ok(channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;

    const GUILD: GuildId = GuildId::new(1);

    #[tokio::test]
    async fn test_requires_requester_channel() {
        let transport = FakeTransport::new();

        let err = ensure_voice(&transport, GUILD, None).await.unwrap_err();

        assert_eq!(err, MusicError::UserNotInChannel);
        assert!(transport.connects().is_empty());
    }

    #[tokio::test]
    async fn test_connects_when_absent() {
        let transport = FakeTransport::new();

        let channel = ensure_voice(&transport, GUILD, Some(ChannelId::new(10))).await.unwrap();

        assert_eq!(channel, ChannelId::new(10));
        assert_eq!(transport.connects(), vec![(GUILD, ChannelId::new(10))]);
    }

    #[tokio::test]
    async fn test_moves_to_requester_channel() {
        let transport = FakeTransport::new();
        transport.set_channel(GUILD, ChannelId::new(10));

        ensure_voice(&transport, GUILD, Some(ChannelId::new(11))).await.unwrap();

        assert_eq!(transport.connects(), vec![(GUILD, ChannelId::new(11))]);
        assert_eq!(transport.current_channel(GUILD).await, Some(ChannelId::new(11)));
    }

    #[tokio::test]
    async fn test_same_channel_is_noop() {
        let transport = FakeTransport::new();
        transport.set_channel(GUILD, ChannelId::new(10));

        ensure_voice(&transport, GUILD, Some(ChannelId::new(10))).await.unwrap();

        assert!(transport.connects().is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_propagates() {
        let transport = FakeTransport::new();
        transport.fail_connects("Missing Connect permission");

        let err = ensure_voice(&transport, GUILD, Some(ChannelId::new(10))).await.unwrap_err();

        assert_eq!(err, MusicError::Voice("Missing Connect permission".into()));
    }
}
