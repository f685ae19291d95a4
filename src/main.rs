use anyhow::{Context, Result};
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::{fs::OpenOptions, path::Path, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;
mod voice;

#[cfg(test)]
mod testing;

use crate::audio::{player::AudioPlayer, transcoder, ChannelAnnouncer};
use crate::bot::JukeboxBot;
use crate::config::Config;
use crate::sources::{TrackResolver, YtDlp};
use crate::voice::driver::SongbirdTransport;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    info!("🎵 Iniciando jukebox-bot v{}", env!("CARGO_PKG_VERSION"));
    info!("{}", config.summary());

    let ffmpeg = transcoder::find_ffmpeg(config.ffmpeg_bin.as_deref());
    transcoder::report(ffmpeg.as_deref());

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config, ffmpeg.as_deref()).await;
    }

    let opus_ready = match transcoder::check_opus() {
        Ok(()) => {
            info!("🎚️ Codificador Opus disponible");
            true
        }
        Err(e) => {
            warn!("⚠️ Codificador Opus no disponible, todas las pistas serán omitidas: {}", e);
            false
        }
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES;

    let songbird = Songbird::serenity();
    let transport = Arc::new(SongbirdTransport::new(
        songbird.clone(),
        ffmpeg.clone(),
        opus_ready,
    ));
    let announcer = Arc::new(ChannelAnnouncer::new(Arc::new(Http::new(
        &config.discord_token,
    ))));
    let resolver = TrackResolver::new(Arc::new(YtDlp::new(
        config.ytdlp_bin.clone(),
        config.default_search.clone(),
    )));
    let player = Arc::new(AudioPlayer::new(
        transport,
        announcer,
        resolver,
        ffmpeg.is_some(),
        config.queue_preview_size,
    ));

    let handler = JukeboxBot::new(config.clone(), player);
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

/// Stderr output plus an append-mode log file unless `LOG_FILE` is empty.
fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("jukebox_bot=debug".parse()?)
        .add_directive("serenity=info".parse()?)
        .add_directive("songbird=info".parse()?);

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Could not open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

async fn health_check(config: &Config, ffmpeg: Option<&Path>) -> Result<()> {
    let yt_dlp = async_process::Command::new(&config.ytdlp_bin)
        .arg("--version")
        .output()
        .await?;

    let ffmpeg_ok = match ffmpeg {
        Some(bin) => async_process::Command::new(bin)
            .arg("-version")
            .output()
            .await?
            .status
            .success(),
        None => false,
    };

    if yt_dlp.status.success() && ffmpeg_ok {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Missing dependencies (yt-dlp: {}, ffmpeg: {})", yt_dlp.status.success(), ffmpeg_ok);
    }
}
