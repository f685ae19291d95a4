use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::{debug, info};

use super::{queue::Session, registry::SessionRegistry, worker, Announcer};
use crate::{
    error::{MusicError, MusicResult},
    sources::{Requester, Track, TrackResolver},
    voice::{self, PlaybackState, VoiceTransport},
};

/// Result of a successful `play`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    NothingFound,
    Queued(Track),
    QueuedMany(usize),
}

/// Entry point for every music command.
///
/// Owns the per-guild sessions and hands each one the shared transport and
/// announcer when its player loop is started.
pub struct AudioPlayer {
    sessions: SessionRegistry,
    transport: Arc<dyn VoiceTransport>,
    announcer: Arc<dyn Announcer>,
    resolver: TrackResolver,
    transcoder_ready: bool,
    queue_preview_size: usize,
}

impl AudioPlayer {
    pub fn new(
        transport: Arc<dyn VoiceTransport>,
        announcer: Arc<dyn Announcer>,
        resolver: TrackResolver,
        transcoder_ready: bool,
        queue_preview_size: usize,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            transport,
            announcer,
            resolver,
            transcoder_ready,
            queue_preview_size,
        }
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    fn ensure_loop(&self, session: &Arc<Session>) {
        if worker::ensure_running(session, self.transport.clone(), self.announcer.clone()) {
            debug!("Loop de reproducción lanzado para guild {}", session.guild_id());
        }
    }

    /// Connects to (or moves into) the requester's channel and makes sure the
    /// guild's player loop is running.
    pub async fn join(
        &self,
        guild_id: GuildId,
        requester_channel: Option<ChannelId>,
        status_channel: ChannelId,
    ) -> MusicResult<()> {
        voice::ensure_voice(self.transport.as_ref(), guild_id, requester_channel).await?;

        let session = self.sessions.get_or_create(guild_id);
        session.set_status_channel(status_channel);
        self.ensure_loop(&session);
        Ok(())
    }

    /// Resolves `query` and appends the result to the guild's queue.
    pub async fn play(
        &self,
        guild_id: GuildId,
        requester: Requester,
        requester_channel: Option<ChannelId>,
        status_channel: ChannelId,
        query: &str,
    ) -> MusicResult<PlayOutcome> {
        if !self.transcoder_ready {
            return Err(MusicError::TransportUnavailable);
        }

        voice::ensure_voice(self.transport.as_ref(), guild_id, requester_channel).await?;

        let session = self.sessions.get_or_create(guild_id);
        session.set_status_channel(status_channel);
        self.ensure_loop(&session);

        let tracks = self.resolver.fetch_tracks(query, &requester).await?;
        let outcome = match tracks.as_slice() {
            [] => return Ok(PlayOutcome::NothingFound),
            [single] => PlayOutcome::Queued(single.clone()),
            many => PlayOutcome::QueuedMany(many.len()),
        };

        // La sesión pudo ser eliminada (leave/desconexión) mientras se resolvía
        let session = self.sessions.get_or_create(guild_id);
        session.set_status_channel(status_channel);
        let added = session.enqueue(tracks);
        self.ensure_loop(&session);
        info!(
            "📥 {} agregó {} pista(s) en guild {}",
            requester.display_name(),
            added,
            guild_id
        );
        Ok(outcome)
    }

    /// Clears the queue, disconnects and forgets the guild's session.
    ///
    /// The session is only dropped once the disconnect went through, so a
    /// failed disconnect leaves the current track reachable by `stop`/`skip`.
    pub async fn leave(&self, guild_id: GuildId) -> MusicResult<()> {
        if !self.transport.is_connected(guild_id).await {
            return Err(MusicError::NotConnected);
        }

        if let Some(session) = self.sessions.get(guild_id) {
            session.clear();
        }

        self.transport.disconnect(guild_id).await?;
        self.sessions.remove(guild_id);
        Ok(())
    }

    /// Empties the queue and halts the current track, staying connected.
    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        if !self.transport.is_connected(guild_id).await {
            return Err(MusicError::NotConnected);
        }

        if let Some(session) = self.sessions.get(guild_id) {
            session.clear();
        }

        if matches!(
            self.transport.state(guild_id).await,
            PlaybackState::Playing | PlaybackState::Paused
        ) {
            self.transport.stop(guild_id).await;
        }
        Ok(())
    }

    /// Ends the current track; the player loop moves on to the next one.
    pub async fn skip(&self, guild_id: GuildId) -> MusicResult<()> {
        if !self.transport.is_connected(guild_id).await {
            return Err(MusicError::NotConnected);
        }

        if self.transport.state(guild_id).await != PlaybackState::Playing {
            return Err(MusicError::NothingPlaying);
        }

        self.transport.stop(guild_id).await;
        Ok(())
    }

    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<()> {
        if self.transport.state(guild_id).await != PlaybackState::Playing {
            return Err(MusicError::NothingPlaying);
        }

        self.transport.pause(guild_id).await;
        Ok(())
    }

    pub async fn resume(&self, guild_id: GuildId) -> MusicResult<()> {
        if self.transport.state(guild_id).await != PlaybackState::Paused {
            return Err(MusicError::NothingPaused);
        }

        self.transport.resume(guild_id).await;
        Ok(())
    }

    /// Track the loop is currently streaming, if any.
    pub fn now(&self, guild_id: GuildId) -> Option<Track> {
        self.sessions.get(guild_id)?.current()
    }

    /// Pending tracks, up to the configured preview size.
    pub fn queue(&self, guild_id: GuildId) -> Vec<Track> {
        self.sessions
            .get(guild_id)
            .map(|s| s.upcoming(self.queue_preview_size))
            .unwrap_or_default()
    }

    /// Drops the session after the bot was disconnected from voice by
    /// something other than `leave`.
    pub fn forget(&self, guild_id: GuildId) {
        if self.sessions.remove(guild_id).is_some() {
            info!("🔌 Conexión de voz perdida en guild {}, sesión eliminada", guild_id);
        }
    }
}
