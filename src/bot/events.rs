use serenity::{async_trait, model::id::GuildId};
use songbird::{Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler, TrackEvent};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::queue_commands::GuildLocks;
use crate::audio::{playback::PlaybackState, queue::QueueStore};

/// Avanza la cola de la guild cada vez que el reproductor termina un track
/// y pone a sonar la nueva cabeza.
pub struct TrackEndHandler {
    pub guild_id: GuildId,
    pub store: Arc<QueueStore>,
    pub playback: Arc<dyn PlaybackState>,
    pub locks: Arc<GuildLocks>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::Track(track_list) = ctx {
            for (state, handle) in *track_list {
                let _guard = self.locks.acquire(self.guild_id).await;

                // Un track reemplazado o ya avanzado no mueve la cola
                if !self.playback.finish(self.guild_id, handle.uuid().as_u128()).await {
                    debug!(
                        "Fin de track ignorado en guild {} ({:?})",
                        self.guild_id, state.playing
                    );
                    continue;
                }

                let remaining = self.store.remove_first(self.guild_id);
                info!(
                    "🎵 Track terminado en guild {} ({:?}), quedan {} en cola",
                    self.guild_id,
                    state.playing,
                    remaining.len()
                );

                if let Some(next) = remaining.first() {
                    self.playback.start(self.guild_id, next).await;
                }
            }
        }

        None
    }
}

/// Handler para errores de tracks
pub struct TrackErrorHandler {
    pub guild_id: GuildId,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                error!(
                    "❌ Error en track para guild {}: {:?}",
                    self.guild_id, state.playing
                );
            }
        }

        None
    }
}

/// Registra los handlers de voz de una guild. Se llama cuando el bot entra
/// a un canal de voz; reemplaza cualquier handler previo de la llamada.
pub fn register_voice_events(call: &mut songbird::Call, handler: TrackEndHandler) {
    let guild_id = handler.guild_id;
    call.remove_all_global_events();

    // Songbird dispara `End` también después de `Error`
    call.add_global_event(VoiceEvent::Track(TrackEvent::End), handler);
    call.add_global_event(
        VoiceEvent::Track(TrackEvent::Error),
        TrackErrorHandler { guild_id },
    );
}
