//! # Bot Module
//!
//! Discord glue around the guild queues.
//!
//! This module contains:
//! - Prefix command parsing and help text ([`commands`])
//! - The queue command logic ([`queue_commands`])
//! - Message dispatch and reply delivery ([`handlers`])
//! - Voice events that advance the queue when a track ends ([`events`])
//!
//! ## Architecture
//!
//! [`StreamerBot`] implements Serenity's [`EventHandler`]. It owns:
//!
//! - The shared [`QueueStore`] (one queue per guild)
//! - [`QueueCommands`], which reads the store and the playback state and
//!   decides every reply
//! - The Songbird manager, used to join voice channels and hook track-end
//!   events on their calls
//! - The [`GuildLocks`] shared by the commands and the track-end handler
//!
//! ## Example
//!
//! ```rust,no_run
//! let config = Config::load()?;
//! let store = Arc::new(QueueStore::new());
//! let voice = Songbird::serenity();
//! let playback = Arc::new(SongbirdPlayback::new(voice.clone(), reqwest::Client::new()));
//! let bot = StreamerBot::new(config, store, playback, None, voice);
//! ```

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Message, Ready, VoiceState},
    async_trait,
};
use songbird::Songbird;
use std::sync::Arc;
use tracing::{error, info};

pub mod commands;
pub mod events;
pub mod handlers;
pub mod queue_commands;

use crate::{
    audio::{playback::PlaybackState, queue::QueueStore},
    config::Config,
    sources::TrackResolver,
};
use events::TrackEndHandler;
use queue_commands::{GuildLocks, QueueCommands};

/// Main Discord event handler.
///
/// ## Thread Safety
///
/// Serenity dispatches events concurrently. Queue operations are atomic per
/// guild inside [`QueueStore`], and [`QueueCommands`] serializes whole
/// commands per guild.
pub struct StreamerBot {
    /// Configuration loaded from environment variables
    config: Arc<Config>,
    /// Guild queues shared with the voice event handlers
    store: Arc<QueueStore>,
    /// Queue command logic
    commands: QueueCommands,
    /// Playback seam, shared with the commands and the track-end handler
    playback: Arc<dyn PlaybackState>,
    /// Per-guild serialization of commands and queue advances
    locks: Arc<GuildLocks>,
    /// Songbird manager for voice calls
    voice: Arc<Songbird>,
}

impl StreamerBot {
    pub fn new(
        config: Config,
        store: Arc<QueueStore>,
        playback: Arc<dyn PlaybackState>,
        resolver: Option<Arc<dyn TrackResolver>>,
        voice: Arc<Songbird>,
    ) -> Self {
        let locks = Arc::new(GuildLocks::default());
        let commands = QueueCommands::new(
            store.clone(),
            playback.clone(),
            resolver,
            locks.clone(),
            config.command_prefix.clone(),
            config.queue_page_size,
        );

        Self {
            config: Arc::new(config),
            store,
            commands,
            playback,
            locks,
            voice,
        }
    }

    /// Joins a voice channel, hooks the queue advance on its call and starts
    /// the head of the queue if nothing is playing.
    pub async fn join_voice_channel(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        let call = self
            .voice
            .join(guild_id, channel_id)
            .await
            .map_err(|e| anyhow::anyhow!("Error al unirse al canal: {:?}", e))?;

        {
            let mut call = call.lock().await;
            events::register_voice_events(
                &mut call,
                TrackEndHandler {
                    guild_id,
                    store: self.store.clone(),
                    playback: self.playback.clone(),
                    locks: self.locks.clone(),
                },
            );
        }

        info!("🔊 Conectado al canal {} en guild {}", channel_id, guild_id);
        self.commands.resume(guild_id).await;
        Ok(())
    }

    /// Leaves the voice channel. The queue is dropped when Discord confirms
    /// the disconnect in `voice_state_update`.
    pub async fn leave_voice_channel(&self, guild_id: GuildId) -> Result<bool> {
        if self.voice.get(guild_id).is_none() {
            return Ok(false);
        }

        self.voice.remove(guild_id).await?;
        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(true)
    }
}

#[async_trait]
impl EventHandler for StreamerBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = handlers::handle_message(&ctx, &msg, self).await {
            error!("Error manejando comando: {:?}", e);
        }
    }

    /// Drops the guild queue when the bot is disconnected from voice, whether
    /// by `leave` or by someone else.
    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.channel_id.is_some() {
            return;
        }
        let Some(guild_id) = new.guild_id else {
            return;
        };

        info!("🔌 Bot desconectado en guild {}", guild_id);
        {
            let _guard = self.locks.acquire(guild_id).await;
            self.store.remove_all(guild_id);
        }
        self.locks.release(guild_id);
    }
}
