use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{ChildContainer, Input},
    tracks::{ControlError, PlayError, PlayMode, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{
    io::{BufRead, BufReader, Read},
    path::PathBuf,
    process::{Command, Stdio},
    sync::Arc,
    thread::JoinHandle,
    time::Duration,
};
use tracing::{debug, info, warn};

use super::{PlaybackState, VoiceTransport};
use crate::{
    audio::{completion::CompletionSignal, transcoder},
    error::{MusicError, MusicResult, PlaybackError},
    sources::Track,
};

/// Songbird-backed voice transport.
///
/// Audio sources are ffmpeg child processes piping WAV into songbird. The
/// handle of the track currently streaming in each guild is kept so that
/// stop/pause/resume can reach it.
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    ffmpeg: Option<PathBuf>,
    opus_ready: bool,
    current_tracks: DashMap<GuildId, TrackHandle>,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, ffmpeg: Option<PathBuf>, opus_ready: bool) -> Self {
        Self {
            manager,
            ffmpeg,
            opus_ready,
            current_tracks: DashMap::new(),
        }
    }

    fn spawn_source(&self, track: &Track) -> Result<(Input, FfmpegStderr), PlaybackError> {
        let ffmpeg = self
            .ffmpeg
            .as_ref()
            .ok_or_else(|| PlaybackError::SourceConstruction("FFmpeg not found".into()))?;

        let mut child = Command::new(ffmpeg)
            .args(transcoder::ffmpeg_args(track.stream_url()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PlaybackError::SourceConstruction(e.to_string()))?;

        let stderr = match child.stderr.take() {
            Some(pipe) => FfmpegStderr::collect(pipe),
            None => FfmpegStderr::empty(),
        };

        Ok((ChildContainer::from(child).into(), stderr))
    }
}

/// Lines ffmpeg wrote to stderr, read on a side thread.
struct FfmpegStderr {
    last_line: Arc<Mutex<String>>,
    reader: Option<JoinHandle<()>>,
}

impl FfmpegStderr {
    fn collect(pipe: impl Read + Send + 'static) -> Self {
        let last_line = Arc::new(Mutex::new(String::new()));
        let sink = last_line.clone();
        let reader = std::thread::spawn(move || {
            for line in BufReader::new(pipe).lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!("ffmpeg: {}", line);
                *sink.lock() = line.to_string();
            }
        });

        Self {
            last_line,
            reader: Some(reader),
        }
    }

    fn empty() -> Self {
        Self {
            last_line: Arc::new(Mutex::new(String::new())),
            reader: None,
        }
    }

    /// Last stderr line, after giving ffmpeg a moment to finish writing.
    async fn last_line(&self) -> String {
        if let Some(reader) = &self.reader {
            for _ in 0..20 {
                if reader.is_finished() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        }
        self.last_line.lock().clone()
    }
}

/// Maps a failed `make_playable` to a per-track error.
///
/// Create/parse failures mean ffmpeg never produced a usable stream, so they
/// are reported with ffmpeg's own complaint when it left one.
fn playable_failure(err: ControlError, ffmpeg_stderr: &str) -> PlaybackError {
    match err {
        ControlError::Play(PlayError::Create(_) | PlayError::Parse(_)) => {
            if ffmpeg_stderr.is_empty() {
                PlaybackError::SourceConstruction(err.to_string())
            } else {
                PlaybackError::SourceConstruction(ffmpeg_stderr.to_string())
            }
        }
        other => PlaybackError::Start(other.to_string()),
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let call = self.manager.get(guild_id)?;
        let call = call.lock().await;

        call.current_connection()?;
        call.current_channel().map(|channel| ChannelId::from(channel.0))
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        self.manager
            .join(guild_id, channel_id)
            .await
            .map(|_| ())
            .map_err(|e| MusicError::Voice(format!("Could not join the voice channel: {e}")))
    }

    async fn disconnect(&self, guild_id: GuildId) -> MusicResult<()> {
        self.manager
            .remove(guild_id)
            .await
            .map_err(|e| MusicError::Voice(format!("Could not leave the voice channel: {e}")))?;
        self.current_tracks.remove(&guild_id);

        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(())
    }

    async fn start(
        &self,
        guild_id: GuildId,
        track: &Track,
        done: CompletionSignal,
    ) -> Result<(), PlaybackError> {
        if !self.opus_ready {
            return Err(PlaybackError::CodecUnavailable);
        }

        let (input, stderr) = self.spawn_source(track)?;

        let call = self
            .manager
            .get(guild_id)
            .ok_or_else(|| PlaybackError::Start("voice connection is gone".into()))?;

        let handle = {
            let mut call = call.lock().await;
            call.play_input(input)
        };

        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(
                    Event::Track(event),
                    TrackEndNotifier {
                        guild_id,
                        done: done.clone(),
                    },
                )
                .map_err(|e| PlaybackError::Start(e.to_string()))?;
        }

        self.current_tracks.insert(guild_id, handle.clone());

        if let Err(e) = handle.make_playable_async().await {
            return Err(playable_failure(e, &stderr.last_line().await));
        }

        debug!("Pista lista para reproducir en guild {}: {}", guild_id, track.title());
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) {
        if let Some(track) = self.current_tracks.get(&guild_id) {
            let _ = track.stop();
        }
    }

    async fn pause(&self, guild_id: GuildId) {
        if let Some(track) = self.current_tracks.get(&guild_id) {
            let _ = track.pause();
        }
    }

    async fn resume(&self, guild_id: GuildId) {
        if let Some(track) = self.current_tracks.get(&guild_id) {
            let _ = track.play();
        }
    }

    async fn state(&self, guild_id: GuildId) -> PlaybackState {
        let Some(track) = self.current_tracks.get(&guild_id).map(|t| t.clone()) else {
            return PlaybackState::Idle;
        };

        match track.get_info().await {
            Ok(info) => match info.playing {
                PlayMode::Play => PlaybackState::Playing,
                PlayMode::Pause => PlaybackState::Paused,
                _ => PlaybackState::Idle,
            },
            Err(_) => PlaybackState::Idle,
        }
    }
}

/// Forwards songbird's end/error events for one track to the player loop.
///
/// Runs on songbird's event thread; it only fires the completion signal.
struct TrackEndNotifier {
    guild_id: GuildId,
    done: CompletionSignal,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _handle) in *tracks {
                if let PlayMode::Errored(e) = &state.playing {
                    warn!("❌ Error de reproducción en guild {}: {:?}", self.guild_id, e);
                }
            }
        }

        if self.done.fire() {
            debug!("Pista terminada en guild {}", self.guild_id);
        }

        None
    }
}
