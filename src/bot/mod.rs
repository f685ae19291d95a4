//! # Bot Module
//!
//! Discord side of the jukebox: slash command registration, interaction
//! dispatch and voice state tracking.
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`] and forwards every
//! music command to the shared [`AudioPlayer`].

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{audio::player::AudioPlayer, config::Config};

pub struct JukeboxBot {
    config: Arc<Config>,
    pub player: Arc<AudioPlayer>,
}

impl JukeboxBot {
    pub fn new(config: Config, player: Arc<AudioPlayer>) -> Self {
        Self {
            config: Arc::new(config),
            player,
        }
    }

    /// Registers slash commands globally, or on `GUILD_ID` when set.
    ///
    /// Guild commands show up within seconds, global ones can take up to an
    /// hour to propagate.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await.map_err(|e| {
                    error!("❌ Error registrando comandos de guild: {:?}", e);
                    anyhow::anyhow!(
                        "Could not register guild commands. Check the bot has the 'applications.commands' scope in that guild."
                    )
                })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!(
                        "Could not register global commands. Check the bot has the 'applications.commands' scope."
                    )
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea (ID: {})", ready.user.name, ready.user.id);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Drops the guild's session when the bot itself is disconnected from
    /// voice (kicked, channel deleted, moved out by a moderator...).
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id {
            return;
        }

        if old.is_some() && new.channel_id.is_none() {
            if let Some(guild_id) = new.guild_id {
                info!("🔌 Bot desconectado en guild {}", guild_id);
                self.player.forget(guild_id);
            }
        }
    }
}
