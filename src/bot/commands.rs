use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

fn all_commands() -> Vec<CreateCommand> {
    vec![
        join_command(),
        play_command(),
        leave_command(),
        stop_command(),
        skip_command(),
        pause_command(),
        resume_command(),
        now_command(),
        queue_command(),
    ]
}

/// Registers the slash commands globally.
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registers the slash commands on one guild (development).
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

// Conexión

fn join_command() -> CreateCommand {
    CreateCommand::new("join").description("Join your voice channel")
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Leave the voice channel and clear the queue")
}

// Reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Queue a song or playlist")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "URL or search terms")
                .required(true),
        )
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stop playback and clear the queue")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skip the current track")
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pause playback")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resume paused playback")
}

// Cola

fn now_command() -> CreateCommand {
    CreateCommand::new("now").description("Show the track that is playing")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show the upcoming tracks")
}
