use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::GuildId;
use songbird::{
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Songbird,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::track::Track;

/// Estado de reproducción de una guild, visto desde la cola.
///
/// El reproductor solo conoce la cabeza de la cola: `start` la pone a
/// sonar, y cuando termina el evento de voz llama a `finish` y avanza la
/// cola. Los tracks pendientes viven solo en `QueueStore`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaybackState: Send + Sync {
    /// `true` si el bot está emitiendo audio ahora mismo en la guild.
    async fn is_streaming(&self, guild_id: GuildId) -> bool;

    /// Reproduce `track` reemplazando lo que sonara. Devuelve `false` si la
    /// guild no tiene llamada de voz o el track no tiene audio.
    async fn start(&self, guild_id: GuildId, track: &Track) -> bool;

    /// Detiene el track actual. Devuelve `false` si no había nada que detener.
    async fn stop(&self, guild_id: GuildId) -> bool;

    /// Marca como terminado el track `track_id`. Devuelve `true` solo la
    /// primera vez y solo si era el track actual de la guild.
    async fn finish(&self, guild_id: GuildId, track_id: u128) -> bool;
}

/// Implementación sobre el gestor de llamadas de songbird.
pub struct SongbirdPlayback {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    current: DashMap<GuildId, TrackHandle>,
}

impl SongbirdPlayback {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self {
            manager,
            http,
            current: DashMap::new(),
        }
    }

    fn current(&self, guild_id: GuildId) -> Option<TrackHandle> {
        self.current.get(&guild_id).map(|handle| handle.value().clone())
    }
}

#[async_trait]
impl PlaybackState for SongbirdPlayback {
    async fn is_streaming(&self, guild_id: GuildId) -> bool {
        let Some(handle) = self.current(guild_id) else {
            return false;
        };

        match handle.get_info().await {
            Ok(state) => {
                debug!("🔎 Estado del track en guild {}: {:?}", guild_id, state.playing);
                state.playing == PlayMode::Play
            }
            Err(e) => {
                // El mixer ya soltó el track
                debug!("Track sin estado en guild {}: {:?}", guild_id, e);
                false
            }
        }
    }

    async fn start(&self, guild_id: GuildId, track: &Track) -> bool {
        let Some(call) = self.manager.get(guild_id) else {
            debug!("Sin llamada de voz en guild {}, no se reproduce {}", guild_id, track.title());
            return false;
        };
        let Some(stream_url) = track.stream_url() else {
            warn!("🚫 {} no tiene URL de audio", track.title());
            return false;
        };

        let input: Input = HttpRequest::new(self.http.clone(), stream_url.to_string()).into();
        let handle = call.lock().await.play_only_input(input);
        self.current.insert(guild_id, handle);

        info!("▶️ Reproduciendo {} en guild {}", track.title(), guild_id);
        true
    }

    async fn stop(&self, guild_id: GuildId) -> bool {
        let Some(handle) = self.current(guild_id) else {
            return false;
        };

        match handle.stop() {
            Ok(()) => {
                info!("⏹️ Track detenido en guild {}", guild_id);
                true
            }
            Err(e) => {
                warn!("No se pudo detener el track en guild {}: {:?}", guild_id, e);
                false
            }
        }
    }

    async fn finish(&self, guild_id: GuildId, track_id: u128) -> bool {
        self.current
            .remove_if(&guild_id, |_, handle| handle.uuid().as_u128() == track_id)
            .is_some()
    }
}
