use thiserror::Error;

/// Errors surfaced to the user by a music command.
///
/// The `Display` text is what ends up in the `❌ ...` reply, so every message
/// is written for the person who typed the command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MusicError {
    /// The media lookup itself failed (process error, malformed output...).
    #[error("{0}")]
    Resolution(String),

    /// No ffmpeg binary was found at startup.
    #[error(
        "FFmpeg not found by the bot.\n\
         Fix it by making sure FFmpeg is in PATH or set:\n\
         `FFMPEG_BIN=/opt/homebrew/bin/ffmpeg` (Apple Silicon)\n\
         `FFMPEG_BIN=/usr/local/bin/ffmpeg` (Intel)\n\
         Then restart."
    )]
    TransportUnavailable,

    #[error("You must be in a voice channel first.")]
    UserNotInChannel,

    #[error("I’m not in a voice channel.")]
    NotConnected,

    #[error("Nothing is playing.")]
    NothingPlaying,

    #[error("Nothing is paused.")]
    NothingPaused,

    /// Connect/move failures from the voice layer, passed through as-is.
    #[error("{0}")]
    Voice(String),
}

/// Per-track failures. These are caught by the player loop, announced on the
/// status channel and the track is skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("❌ Could not start FFmpeg for this track.\n`{0}`")]
    SourceConstruction(String),

    #[error(
        "❌ Opus is not loaded. Install libopus (`brew install opus` or \
         `sudo apt install libopus0`), then restart the bot."
    )]
    CodecUnavailable,

    #[error("❌ Could not play that track.\n`{0}`")]
    Start(String),
}

pub type MusicResult<T> = std::result::Result<T, MusicError>;
