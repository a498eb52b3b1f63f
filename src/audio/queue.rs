use dashmap::{
    mapref::entry::{Entry, OccupiedEntry},
    DashMap,
};
use serenity::model::id::GuildId;
use tracing::debug;

use super::track::Track;

/// Almacén de colas por guild.
///
/// Mantiene el invariante de que una guild tiene entrada si y solo si su
/// cola tiene al menos un track: las colas se crean en el primer
/// `add_tracks` y se eliminan en cuanto quedan vacías. El primer elemento
/// de cada cola es el track que se está reproduciendo.
///
/// Cada operación se ejecuta bajo el lock del shard de su guild, así que
/// es atómica por guild. Las secuencias leer-decidir-mutar de los comandos
/// se serializan aparte con `GuildLocks`.
#[derive(Debug, Default)]
pub struct QueueStore {
    queues: DashMap<GuildId, Vec<Track>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega tracks al final de la cola, creándola si no existe.
    /// Devuelve la cola resultante.
    pub fn add_tracks(&self, guild_id: GuildId, tracks: Vec<Track>) -> Vec<Track> {
        if tracks.is_empty() {
            let queue = self.get_queue(guild_id);
            debug!(
                guild_id = %guild_id,
                operation = "add_tracks",
                len = queue.len(),
                "📭 Nada que agregar, cola sin cambios"
            );
            return queue;
        }

        let added = tracks.len();
        let mut queue = self.queues.entry(guild_id).or_default();
        let created = queue.is_empty();
        queue.extend(tracks);
        let snapshot = queue.value().clone();
        drop(queue);

        if created {
            debug!(
                guild_id = %guild_id,
                operation = "add_tracks",
                len = snapshot.len(),
                added,
                "🆕 Cola creada para la guild"
            );
        } else {
            debug!(
                guild_id = %guild_id,
                operation = "add_tracks",
                len = snapshot.len(),
                added,
                "➕ Tracks agregados a la cola existente"
            );
        }

        snapshot
    }

    /// Quita el track en reproducción (avance de la cola). Si la cola
    /// queda vacía se elimina la entrada.
    pub fn remove_first(&self, guild_id: GuildId) -> Vec<Track> {
        match self.queues.entry(guild_id) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_empty() {
                    entry.get_mut().remove(0);
                }
                let remaining = Self::settle(entry);
                debug!(
                    guild_id = %guild_id,
                    operation = "remove_first",
                    len = remaining.len(),
                    "⏭️ Primer track eliminado de la cola"
                );
                remaining
            }
            Entry::Vacant(_) => {
                debug!(
                    guild_id = %guild_id,
                    operation = "remove_first",
                    len = 0,
                    "⚠️ Se intentó avanzar una cola inexistente"
                );
                Vec::new()
            }
        }
    }

    /// Quita hasta `count` tracks a partir de `start`, como un splice:
    /// cerca del final se quitan los que haya y un `start` fuera de rango
    /// no quita nada. Una cola que queda vacía se elimina, igual que en
    /// `remove_first`.
    pub fn remove_range(&self, guild_id: GuildId, start: usize, count: usize) -> Vec<Track> {
        match self.queues.entry(guild_id) {
            Entry::Occupied(mut entry) => {
                let queue = entry.get_mut();
                let end = start.saturating_add(count).min(queue.len());
                let removed = if start < end {
                    queue.drain(start..end).count()
                } else {
                    0
                };
                let remaining = Self::settle(entry);
                debug!(
                    guild_id = %guild_id,
                    operation = "remove_range",
                    len = remaining.len(),
                    start,
                    count,
                    removed,
                    "🗑️ Rango de tracks eliminado"
                );
                remaining
            }
            Entry::Vacant(_) => {
                debug!(
                    guild_id = %guild_id,
                    operation = "remove_range",
                    len = 0,
                    start,
                    count,
                    "⚠️ Se intentó quitar tracks de una cola inexistente"
                );
                Vec::new()
            }
        }
    }

    /// Elimina la cola completa de la guild.
    pub fn remove_all(&self, guild_id: GuildId) {
        match self.queues.remove(&guild_id) {
            Some((_, queue)) => debug!(
                guild_id = %guild_id,
                operation = "remove_all",
                len = 0,
                removed = queue.len(),
                "🧹 Cola eliminada"
            ),
            None => debug!(
                guild_id = %guild_id,
                operation = "remove_all",
                len = 0,
                "⚠️ Se intentó eliminar una cola inexistente"
            ),
        }
    }

    /// Copia de la cola actual, vacía si la guild no tiene cola.
    pub fn get_queue(&self, guild_id: GuildId) -> Vec<Track> {
        self.queues
            .get(&guild_id)
            .map(|queue| queue.value().clone())
            .unwrap_or_default()
    }

    /// Track en reproducción (cabeza de la cola).
    pub fn get_current(&self, guild_id: GuildId) -> Option<Track> {
        self.queues
            .get(&guild_id)
            .and_then(|queue| queue.first().cloned())
    }

    pub fn len(&self, guild_id: GuildId) -> usize {
        self.queues.get(&guild_id).map_or(0, |queue| queue.len())
    }

    /// Indica si la guild tiene entrada en el almacén.
    #[cfg(test)]
    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.queues.contains_key(&guild_id)
    }

    #[cfg(test)]
    pub fn guild_count(&self) -> usize {
        self.queues.len()
    }

    // Devuelve la cola resultante y elimina la entrada si quedó vacía.
    fn settle(entry: OccupiedEntry<'_, GuildId, Vec<Track>>) -> Vec<Track> {
        if entry.get().is_empty() {
            entry.remove();
            Vec::new()
        } else {
            entry.get().clone()
        }
    }
}
