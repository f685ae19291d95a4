use anyhow::Result;
use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse},
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::info;

use crate::{
    bot::JukeboxBot,
    error::MusicResult,
    sources::Requester,
    ui::messages,
};

/// Dispatches a slash command and answers it.
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &JukeboxBot) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        return respond(ctx, &command, messages::GUILD_ONLY).await;
    };

    info!(
        "📝 /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let player = &bot.player;
    let content = match command.data.name.as_str() {
        "play" => return handle_play(ctx, &command, guild_id, bot).await,
        "join" => {
            let channel = user_voice_channel(ctx, guild_id, command.user.id);
            reply(
                player.join(guild_id, channel, command.channel_id).await,
                messages::JOINED,
            )
        }
        "leave" => reply(player.leave(guild_id).await, messages::LEFT),
        "stop" => reply(player.stop(guild_id).await, messages::STOPPED),
        "skip" => reply(player.skip(guild_id).await, messages::SKIPPED),
        "pause" => reply(player.pause(guild_id).await, messages::PAUSED),
        "resume" => reply(player.resume(guild_id).await, messages::RESUMED),
        "now" => messages::now(player.now(guild_id).as_ref()),
        "queue" => messages::queue_listing(&player.queue(guild_id)),
        _ => "❌ Unknown command".to_string(),
    };

    respond(ctx, &command, &content).await
}

/// `play` can take seconds to resolve, so the response is deferred first.
async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &JukeboxBot,
) -> Result<()> {
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing query option"))?;

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let requester = Requester::new(command.user.id, display_name(command));
    let channel = user_voice_channel(ctx, guild_id, command.user.id);

    let content = match bot
        .player
        .play(guild_id, requester, channel, command.channel_id, query)
        .await
    {
        Ok(outcome) => messages::play_outcome(&outcome),
        Err(e) => messages::error(&e),
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await?;
    Ok(())
}

fn reply(result: MusicResult<()>, success: &str) -> String {
    match result {
        Ok(()) => success.to_string(),
        Err(e) => messages::error(&e),
    }
}

async fn respond(ctx: &Context, command: &CommandInteraction, content: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await?;
    Ok(())
}

/// Server nickname, then global display name, then username.
fn display_name(command: &CommandInteraction) -> String {
    command
        .member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .unwrap_or_else(|| command.user.display_name().to_string())
}

/// Voice channel the user currently sits in, from the gateway cache.
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
