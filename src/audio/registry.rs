use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::info;

use super::queue::Session;

/// Guild → [`Session`] map.
///
/// Entries are created on first reference and dropped again on leave or
/// voice disconnect, so the map only holds guilds the bot is active in.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing session for the guild, or a fresh one.
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<Session> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🆕 Nueva sesión de reproducción para guild {}", guild_id);
                Arc::new(Session::new(guild_id))
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.get(&guild_id).map(|s| s.clone())
    }

    /// Drops the guild's session and cancels its player loop.
    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        let (_, session) = self.sessions.remove(&guild_id)?;
        session.clear();
        session.shut_down();
        info!("🧹 Sesión de reproducción eliminada para guild {}", guild_id);
        Some(session)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}
