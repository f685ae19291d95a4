use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU8, Ordering},
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::sources::Track;

/// Lifecycle of a session's player loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    NotStarted = 0,
    Running = 1,
    Finished = 2,
}

impl From<u8> for LoopState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Finished,
            _ => Self::NotStarted,
        }
    }
}

/// Mutable part of a session. Guarded by one mutex that is never held
/// across an await point.
#[derive(Debug, Default)]
struct SessionState {
    items: VecDeque<Track>,
    current: Option<Track>,
    status_channel: Option<ChannelId>,
}

/// Playback context of one guild: pending tracks, the track being played,
/// the loop lifecycle and the channel used for announcements.
#[derive(Debug)]
pub struct Session {
    guild_id: GuildId,
    state: Mutex<SessionState>,
    wake: Notify,
    loop_state: AtomicU8,
    shutdown: CancellationToken,
}

impl Session {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            state: Mutex::new(SessionState::default()),
            wake: Notify::new(),
            loop_state: AtomicU8::new(LoopState::NotStarted as u8),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Appends tracks in order and wakes the player loop.
    pub fn enqueue(&self, tracks: impl IntoIterator<Item = Track>) -> usize {
        let added = {
            let mut state = self.state.lock();
            let before = state.items.len();
            state.items.extend(tracks);
            state.items.len() - before
        };

        if added > 0 {
            debug!("➕ {} pista(s) en cola en guild {}", added, self.guild_id);
            self.wake.notify_one();
        }
        added
    }

    /// Moves the queue head into `current`.
    pub fn pop_next(&self) -> Option<Track> {
        let mut state = self.state.lock();
        let next = state.items.pop_front()?;
        state.current = Some(next.clone());
        Some(next)
    }

    pub fn has_pending(&self) -> bool {
        !self.state.lock().items.is_empty()
    }

    pub fn current(&self) -> Option<Track> {
        self.state.lock().current.clone()
    }

    pub fn clear_current(&self) {
        self.state.lock().current = None;
    }

    /// Drops every pending track and the current one.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.items.clear();
        state.current = None;
        info!("🗑️ Cola limpiada en guild {}", self.guild_id);
    }

    /// First `limit` pending tracks, in play order.
    pub fn upcoming(&self, limit: usize) -> Vec<Track> {
        self.state.lock().items.iter().take(limit).cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn set_status_channel(&self, channel_id: ChannelId) {
        self.state.lock().status_channel = Some(channel_id);
    }

    pub fn status_channel(&self) -> Option<ChannelId> {
        self.state.lock().status_channel
    }

    /// Resolves once something was enqueued since the last wait. A wake-up
    /// that arrives while nobody waits is kept for the next call.
    pub async fn wait_for_tracks(&self) {
        self.wake.notified().await
    }

    #[cfg(test)]
    pub fn loop_state(&self) -> LoopState {
        LoopState::from(self.loop_state.load(Ordering::Acquire))
    }

    /// Claims the right to run the player loop. Only one caller wins while a
    /// loop is running; a finished loop can be claimed again.
    pub fn try_claim_loop(&self) -> bool {
        [LoopState::NotStarted, LoopState::Finished]
            .into_iter()
            .any(|from| {
                self.loop_state
                    .compare_exchange(
                        from as u8,
                        LoopState::Running as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
            })
    }

    pub fn mark_loop_finished(&self) {
        self.loop_state
            .store(LoopState::Finished as u8, Ordering::Release);
    }

    /// Token cancelled when the session is torn down.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn shut_down(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::track;
    use std::{sync::Arc, time::Duration};

    fn session() -> Session {
        Session::new(GuildId::new(7))
    }

    #[test]
    fn test_fifo_order() {
        let session = session();
        session.enqueue([track("a"), track("b")]);
        session.enqueue([track("c")]);

        let order: Vec<_> = std::iter::from_fn(|| session.pop_next())
            .map(|t| t.title().to_string())
            .collect();

        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_pop_sets_current() {
        let session = session();
        assert_eq!(session.pop_next(), None);
        assert_eq!(session.current(), None);

        session.enqueue([track("a")]);
        let popped = session.pop_next().unwrap();

        assert_eq!(session.current(), Some(popped));
        assert!(!session.has_pending());
    }

    #[test]
    fn test_clear_drops_queue_and_current() {
        let session = session();
        session.enqueue([track("a"), track("b"), track("c")]);
        session.pop_next();

        session.clear();

        assert_eq!(session.len(), 0);
        assert_eq!(session.current(), None);
    }

    #[test]
    fn test_upcoming_is_limited() {
        let session = session();
        session.enqueue((0..15).map(|i| track(&format!("t{i}"))));

        let upcoming = session.upcoming(10);

        assert_eq!(upcoming.len(), 10);
        assert_eq!(upcoming[0].title(), "t0");
        assert_eq!(upcoming[9].title(), "t9");
        assert_eq!(session.len(), 15);
    }

    #[test]
    fn test_loop_claim_is_exclusive() {
        let session = session();
        assert_eq!(session.loop_state(), LoopState::NotStarted);

        assert!(session.try_claim_loop());
        assert!(!session.try_claim_loop());
        assert_eq!(session.loop_state(), LoopState::Running);

        session.mark_loop_finished();
        assert!(session.try_claim_loop());
    }

    #[test]
    fn test_concurrent_claims_start_one_loop() {
        let session = Arc::new(session());

        let winners: usize = (0..8)
            .map(|_| {
                let session = session.clone();
                std::thread::spawn(move || session.try_claim_loop())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_enqueue_before_wait_is_not_lost() {
        let session = session();
        session.enqueue([track("a")]);

        tokio::time::timeout(Duration::from_secs(1), session.wait_for_tracks())
            .await
            .expect("wake-up should be stored");
    }

    #[test]
    fn test_status_channel_is_remembered() {
        let session = session();
        assert_eq!(session.status_channel(), None);

        session.set_status_channel(ChannelId::new(99));

        assert_eq!(session.status_channel(), Some(ChannelId::new(99)));
    }
}
