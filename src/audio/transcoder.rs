//! ffmpeg discovery and the Opus runtime check, both done once at startup.

use audiopus::{coder::Encoder, Application, Channels, SampleRate};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Install locations checked after `PATH` (Homebrew on Apple Silicon / Intel,
/// then the usual distro path).
const KNOWN_LOCATIONS: &[&str] = &[
    "/opt/homebrew/bin/ffmpeg",
    "/usr/local/bin/ffmpeg",
    "/usr/bin/ffmpeg",
];

/// Finds the ffmpeg binary: explicit override, then `PATH`, then known
/// install locations.
pub fn find_ffmpeg(override_bin: Option<&Path>) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH");
    let path_dirs = path_var
        .as_deref()
        .map(|p| std::env::split_paths(p).collect::<Vec<_>>())
        .unwrap_or_default();

    locate(override_bin, &path_dirs, KNOWN_LOCATIONS)
}

fn locate(override_bin: Option<&Path>, path_dirs: &[PathBuf], known: &[&str]) -> Option<PathBuf> {
    if let Some(bin) = override_bin {
        if bin.is_file() {
            return Some(bin.to_path_buf());
        }
        warn!("FFMPEG_BIN apunta a {}, que no existe; se ignora", bin.display());
    }

    let exe = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
    if let Some(found) = path_dirs.iter().map(|dir| dir.join(exe)).find(|p| p.is_file()) {
        return Some(found);
    }

    known.iter().map(PathBuf::from).find(|p| p.is_file())
}

/// Logs the discovery result the way the operator needs to see it.
pub fn report(ffmpeg: Option<&Path>) {
    match ffmpeg {
        Some(path) => info!("🎛️ Usando FFmpeg en: {}", path.display()),
        None => warn!(
            "⚠️ FFmpeg NO encontrado. La reproducción fallará hasta que FFmpeg esté en PATH o se defina FFMPEG_BIN."
        ),
    }
}

/// Arguments for an ffmpeg process that reads `stream_url` and writes
/// 48kHz stereo WAV to stdout for songbird to decode.
pub fn ffmpeg_args(stream_url: &str) -> Vec<String> {
    [
        "-reconnect",
        "1",
        "-reconnect_streamed",
        "1",
        "-reconnect_delay_max",
        "5",
        "-loglevel",
        "error",
        "-i",
        stream_url,
        "-vn",
        "-ac",
        "2",
        "-ar",
        "48000",
        "-f",
        "wav",
        "pipe:1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Checks that the Opus encoder can be created. Voice output is Opus, so a
/// broken runtime means nothing can be played.
pub fn check_opus() -> Result<(), String> {
    match Encoder::new(SampleRate::Hz48000, Channels::Stereo, Application::Audio) {
        Ok(_) => {
            debug!("Codificador Opus verificado");
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}
