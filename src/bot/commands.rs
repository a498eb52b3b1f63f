use serenity::model::id::{GuildId, UserId};

/// Comando recibido desde un mensaje con prefijo, ya separado en nombre y
/// argumentos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTrigger {
    pub guild_id: GuildId,
    pub author: UserId,
    pub name: String,
    pub args: Vec<String>,
}

/// Comandos que entiende el bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Join,
    Leave,
    Play,
    Queue,
    NowPlaying,
    Skip,
    Remove,
    Clear,
    Help,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "join" => Some(Command::Join),
            "leave" | "disconnect" => Some(Command::Leave),
            "play" | "p" => Some(Command::Play),
            "queue" | "q" => Some(Command::Queue),
            "nowplaying" | "np" => Some(Command::NowPlaying),
            "skip" | "next" => Some(Command::Skip),
            "remove" | "rm" => Some(Command::Remove),
            "clear" => Some(Command::Clear),
            "help" => Some(Command::Help),
            _ => None,
        }
    }

    pub const ALL: [Command; 9] = [
        Command::Join,
        Command::Leave,
        Command::Play,
        Command::Queue,
        Command::NowPlaying,
        Command::Skip,
        Command::Remove,
        Command::Clear,
        Command::Help,
    ];

    pub fn usage(&self) -> &'static str {
        match self {
            Command::Join => "join",
            Command::Leave => "leave",
            Command::Play => "play <url>",
            Command::Queue => "queue [página]",
            Command::NowPlaying => "np",
            Command::Skip => "skip",
            Command::Remove => "remove <posición>",
            Command::Clear => "clear",
            Command::Help => "help",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Command::Join => "entra a tu canal de voz y reproduce la cola",
            Command::Leave => "sale del canal de voz y vacía la cola",
            Command::Play => "agrega un track o playlist de SoundCloud a la cola",
            Command::Queue => "muestra la cola de reproducción",
            Command::NowPlaying => "muestra el track actual",
            Command::Skip => "salta al siguiente track",
            Command::Remove => "quita un track de la cola",
            Command::Clear => {
                "quita todos los tracks de la cola (excepto el que se está reproduciendo)"
            }
            Command::Help => "muestra esta ayuda",
        }
    }
}

/// Separa un mensaje con prefijo en un `CommandTrigger`. Devuelve `None` si
/// el mensaje no empieza con el prefijo o no tiene nombre de comando.
pub fn parse(
    content: &str,
    prefix: &str,
    guild_id: GuildId,
    author: UserId,
) -> Option<CommandTrigger> {
    let body = content.trim_start().strip_prefix(prefix)?;
    let mut parts = body.split_whitespace();
    let name = parts.next()?.to_lowercase();

    Some(CommandTrigger {
        guild_id,
        author,
        name,
        args: parts.map(str::to_string).collect(),
    })
}

/// Texto de ayuda con todos los comandos.
pub fn help_text(prefix: &str) -> String {
    let mut lines = vec!["📖 **Comandos disponibles**".to_string()];
    for command in Command::ALL {
        lines.push(format!("`{}{}`: {}", prefix, command.usage(), command.description()));
    }
    lines.join("\n")
}
