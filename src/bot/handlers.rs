use anyhow::Result;
use serenity::{
    model::{
        channel::Message,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{debug, info};

use super::{
    commands::{self, Command, CommandTrigger},
    queue_commands::CommandOutcome,
    StreamerBot,
};

/// Maneja un mensaje de texto: si es un comando con prefijo lo ejecuta y
/// envía la respuesta.
pub async fn handle_message(ctx: &Context, msg: &Message, bot: &StreamerBot) -> Result<()> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    let prefix = bot.config.command_prefix.as_str();
    let Some(trigger) = commands::parse(&msg.content, prefix, guild_id, msg.author.id) else {
        return Ok(());
    };

    info!(
        "📝 Comando {}{} usado por {} en guild {}",
        prefix, trigger.name, msg.author.name, guild_id
    );

    let outcome = match Command::from_name(&trigger.name) {
        Some(command) => handle_command(ctx, bot, command, &trigger).await?,
        None => CommandOutcome::Reply(format!(
            "❌ Comando no reconocido, usa `{}help`.",
            prefix
        )),
    };

    send_outcome(ctx, msg, outcome).await
}

async fn handle_command(
    ctx: &Context,
    bot: &StreamerBot,
    command: Command,
    trigger: &CommandTrigger,
) -> Result<CommandOutcome> {
    let guild_id = trigger.guild_id;
    let arg = trigger.args.first().map(String::as_str);
    let queue = &bot.commands;

    let outcome = match command {
        Command::Join => handle_join(ctx, bot, guild_id, trigger.author).await?,
        Command::Leave => handle_leave(bot, guild_id).await?,
        Command::Play => queue.play(guild_id, trigger.author, arg).await,
        Command::Queue => queue.queue(guild_id, arg).await,
        Command::NowPlaying => queue.now_playing(guild_id).await,
        Command::Skip => queue.skip(guild_id).await,
        Command::Remove => queue.remove(guild_id, arg).await,
        Command::Clear => queue.clear(guild_id).await,
        Command::Help => queue.help(),
    };

    Ok(outcome)
}

async fn handle_join(
    ctx: &Context,
    bot: &StreamerBot,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<CommandOutcome> {
    let Some(channel_id) = get_user_voice_channel(ctx, guild_id, user_id) else {
        return Ok(CommandOutcome::Reply(
            "❌ Debes estar en un canal de voz.".to_string(),
        ));
    };

    bot.join_voice_channel(guild_id, channel_id).await?;

    Ok(CommandOutcome::Channel(format!("🔊 Conectado a <#{}>", channel_id)))
}

async fn handle_leave(bot: &StreamerBot, guild_id: GuildId) -> Result<CommandOutcome> {
    if bot.leave_voice_channel(guild_id).await? {
        Ok(CommandOutcome::Channel("👋 Desconectado del canal de voz".to_string()))
    } else {
        Ok(CommandOutcome::Reply("no estoy en un canal de voz.".to_string()))
    }
}

async fn send_outcome(ctx: &Context, msg: &Message, outcome: CommandOutcome) -> Result<()> {
    debug!("💬 Respuesta: {}", outcome.text());

    match outcome {
        CommandOutcome::Reply(text) => {
            msg.reply(ctx, text).await?;
        }
        CommandOutcome::Channel(text) => {
            msg.channel_id.say(&ctx.http, text).await?;
        }
    }

    Ok(())
}

// Funciones auxiliares

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id);

    channel_id
}
