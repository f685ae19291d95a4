//! Fakes shared by the unit tests: an in-memory voice transport and an
//! announcer that records what would have been posted.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use crate::{
    audio::{completion::CompletionSignal, Announcer},
    error::{MusicError, MusicResult, PlaybackError},
    sources::{Requester, Track},
    voice::{PlaybackState, VoiceTransport},
};

pub fn requester() -> Requester {
    Requester::new(UserId::new(42), "alice")
}

pub fn track(title: &str) -> Track {
    Track::new(
        Some(title.to_string()),
        format!("https://stream.example/{title}"),
        format!("https://page.example/{title}"),
        requester(),
    )
}

/// Track whose stream the fake transport refuses to open.
pub fn bad_track(title: &str) -> Track {
    Track::new(
        Some(title.to_string()),
        format!("bad://{title}"),
        String::new(),
        requester(),
    )
}

/// Polls `cond` until it holds, failing the test after two seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[derive(Default)]
struct FakeState {
    channels: HashMap<GuildId, ChannelId>,
    connects: Vec<(GuildId, ChannelId)>,
    connect_error: Option<String>,
    disconnect_error: Option<String>,
    codec_missing: bool,
    started: Vec<(GuildId, String)>,
    active: HashMap<GuildId, CompletionSignal>,
    handed_out: Vec<CompletionSignal>,
    states: HashMap<GuildId, PlaybackState>,
    stalled: HashSet<GuildId>,
}

/// In-memory [`VoiceTransport`]. Streams never end on their own; tests end
/// them with [`finish`](Self::finish) or through `stop`.
#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_channel(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.state.lock().channels.insert(guild_id, channel_id);
    }

    /// Simulates the connection vanishing without a leave command.
    pub fn drop_connection(&self, guild_id: GuildId) {
        self.state.lock().channels.remove(&guild_id);
    }

    pub fn fail_connects(&self, message: &str) {
        self.state.lock().connect_error = Some(message.to_string());
    }

    pub fn fail_disconnects(&self, message: &str) {
        self.state.lock().disconnect_error = Some(message.to_string());
    }

    /// Every `start` fails as if the Opus runtime were missing.
    pub fn without_codec(&self) {
        self.state.lock().codec_missing = true;
    }

    /// Makes every future `start` in this guild hang forever.
    pub fn stall(&self, guild_id: GuildId) {
        self.state.lock().stalled.insert(guild_id);
    }

    pub fn connects(&self) -> Vec<(GuildId, ChannelId)> {
        self.state.lock().connects.clone()
    }

    /// Titles started in `guild_id`, in order.
    pub fn started(&self, guild_id: GuildId) -> Vec<String> {
        self.state
            .lock()
            .started
            .iter()
            .filter(|(g, _)| *g == guild_id)
            .map(|(_, title)| title.clone())
            .collect()
    }

    /// Every completion signal handed to `start`, including finished ones.
    pub fn signals(&self) -> Vec<CompletionSignal> {
        self.state.lock().handed_out.clone()
    }

    /// Natural end of the current stream.
    pub fn finish(&self, guild_id: GuildId) {
        self.end_stream(guild_id);
    }

    fn end_stream(&self, guild_id: GuildId) {
        let signal = {
            let mut state = self.state.lock();
            state.states.insert(guild_id, PlaybackState::Idle);
            state.active.remove(&guild_id)
        };
        if let Some(signal) = signal {
            signal.fire();
        }
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.state.lock().channels.get(&guild_id).copied()
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = &state.connect_error {
            return Err(MusicError::Voice(message.clone()));
        }
        state.connects.push((guild_id, channel_id));
        state.channels.insert(guild_id, channel_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        {
            let mut state = self.state.lock();
            if let Some(message) = &state.disconnect_error {
                return Err(MusicError::Voice(message.clone()));
            }
            state.channels.remove(&guild_id);
        }
        self.end_stream(guild_id);
        Ok(())
    }

    async fn start(
        &self,
        guild_id: GuildId,
        track: &Track,
        done: CompletionSignal,
    ) -> Result<(), PlaybackError> {
        if self.state.lock().codec_missing {
            return Err(PlaybackError::CodecUnavailable);
        }

        if track.stream_url().starts_with("bad://") {
            return Err(PlaybackError::SourceConstruction(
                "Invalid data found when processing input".into(),
            ));
        }

        let stalled = self.state.lock().stalled.contains(&guild_id);
        if stalled {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock();
        state.started.push((guild_id, track.title().to_string()));
        state.handed_out.push(done.clone());
        state.active.insert(guild_id, done);
        state.states.insert(guild_id, PlaybackState::Playing);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) {
        self.end_stream(guild_id);
    }

    async fn pause(&self, guild_id: GuildId) {
        let mut state = self.state.lock();
        if state.states.get(&guild_id) == Some(&PlaybackState::Playing) {
            state.states.insert(guild_id, PlaybackState::Paused);
        }
    }

    async fn resume(&self, guild_id: GuildId) {
        let mut state = self.state.lock();
        if state.states.get(&guild_id) == Some(&PlaybackState::Paused) {
            state.states.insert(guild_id, PlaybackState::Playing);
        }
    }

    async fn state(&self, guild_id: GuildId) -> PlaybackState {
        self.state
            .lock()
            .states
            .get(&guild_id)
            .copied()
            .unwrap_or(PlaybackState::Idle)
    }
}

/// Announcer that keeps every message instead of posting it.
#[derive(Default)]
pub struct RecordingAnnouncer {
    messages: Mutex<Vec<(ChannelId, String)>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(ChannelId, String)> {
        self.messages.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages.lock().iter().map(|(_, m)| m.clone()).collect()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, channel_id: ChannelId, content: &str) -> anyhow::Result<()> {
        self.messages.lock().push((channel_id, content.to_string()));
        Ok(())
    }
}
