use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{completion::CompletionSignal, queue::Session, Announcer};
use crate::{ui::messages, voice::VoiceTransport};

/// Spawns the player loop for `session` unless one is already running.
///
/// Returns whether a new loop was started.
pub fn ensure_running(
    session: &Arc<Session>,
    transport: Arc<dyn VoiceTransport>,
    announcer: Arc<dyn Announcer>,
) -> bool {
    if !session.try_claim_loop() {
        return false;
    }

    let session = session.clone();
    tokio::spawn(async move {
        run(&session, transport.as_ref(), announcer.as_ref()).await;
        session.mark_loop_finished();
    });
    true
}

/// Plays the session's tracks one after another until the session is shut
/// down or the voice connection goes away.
///
/// The loop sleeps while the queue is empty and is woken by `enqueue`. Each
/// track is awaited through its completion signal, so a skip or stop fires
/// the same path as a natural end and the next track starts exactly once.
pub async fn run(session: &Session, transport: &dyn VoiceTransport, announcer: &dyn Announcer) {
    let guild_id = session.guild_id();
    let shutdown = session.shutdown_token().clone();
    info!("🎵 Loop de reproducción iniciado para guild {}", guild_id);

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        if !session.has_pending() {
            session.clear_current();
            tokio::select! {
                _ = session.wait_for_tracks() => continue,
                _ = shutdown.cancelled() => break,
            }
        }

        if !transport.is_connected(guild_id).await {
            info!("🔌 Sin conexión de voz en guild {}, deteniendo loop de reproducción", guild_id);
            session.clear_current();
            break;
        }

        let Some(track) = session.pop_next() else {
            continue;
        };

        let (signal, finished) = CompletionSignal::new();
        if let Err(e) = transport.start(guild_id, &track, signal).await {
            warn!("⏭️ No se pudo reproducir {} en guild {}: {:?}", track.title(), guild_id, e);
            announce(session, announcer, &e.to_string()).await;
            session.clear_current();
            continue;
        }

        if shutdown.is_cancelled() {
            break;
        }

        info!(
            "▶️ Reproduciendo en guild {}: {} <{}>",
            guild_id,
            track.title(),
            track.page_url()
        );
        announce(session, announcer, &messages::now_playing(&track)).await;

        tokio::select! {
            _ = finished => debug!("Pista terminada en guild {}: {}", guild_id, track.title()),
            _ = shutdown.cancelled() => break,
        }
    }

    session.clear_current();
    info!("⏹️ Loop de reproducción finalizado para guild {}", guild_id);
}

async fn announce(session: &Session, announcer: &dyn Announcer, content: &str) {
    let Some(channel_id) = session.status_channel() else {
        return;
    };

    if let Err(e) = announcer.announce(channel_id, content).await {
        warn!("Error al enviar mensaje al canal {}: {:?}", channel_id, e);
    }
}
