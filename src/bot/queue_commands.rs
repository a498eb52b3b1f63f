use dashmap::DashMap;
use serenity::model::id::{GuildId, UserId};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use super::commands::help_text;
use crate::{
    audio::{playback::PlaybackState, queue::QueueStore},
    sources::TrackResolver,
    ui::messages,
};

/// Respuesta de un comando: contestación al autor o mensaje al canal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Reply(String),
    Channel(String),
}

impl CommandOutcome {
    pub fn text(&self) -> &str {
        match self {
            CommandOutcome::Reply(text) | CommandOutcome::Channel(text) => text,
        }
    }
}

/// Un mutex por guild para que los comandos y el avance por fin de track
/// de una misma guild se ejecuten uno detrás de otro, aunque serenity y
/// songbird despachen eventos en paralelo.
///
/// Hay como mucho una entrada por guild en la que está el bot; `release`
/// la suelta cuando el bot sale del canal de voz.
#[derive(Debug, Default)]
pub struct GuildLocks {
    locks: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl GuildLocks {
    pub async fn acquire(&self, guild_id: GuildId) -> OwnedMutexGuard<()> {
        // Clonar el Arc y soltar el shard antes de esperar
        let lock = self.locks.entry(guild_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Quita el mutex de la guild si nadie lo está usando.
    pub fn release(&self, guild_id: GuildId) -> bool {
        self.locks
            .remove_if(&guild_id, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
    }
}

/// Comandos que leen y modifican la cola de una guild.
pub struct QueueCommands {
    store: Arc<QueueStore>,
    playback: Arc<dyn PlaybackState>,
    resolver: Option<Arc<dyn TrackResolver>>,
    locks: Arc<GuildLocks>,
    prefix: String,
    page_size: usize,
}

impl QueueCommands {
    pub fn new(
        store: Arc<QueueStore>,
        playback: Arc<dyn PlaybackState>,
        resolver: Option<Arc<dyn TrackResolver>>,
        locks: Arc<GuildLocks>,
        prefix: String,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            playback,
            resolver,
            locks,
            prefix,
            page_size,
        }
    }

    pub fn help(&self) -> CommandOutcome {
        CommandOutcome::Reply(help_text(&self.prefix))
    }

    /// Pone a sonar la cabeza de la cola si no hay audio. Se usa al entrar
    /// a un canal de voz con tracks ya encolados.
    pub async fn resume(&self, guild_id: GuildId) -> bool {
        let _guard = self.locks.acquire(guild_id).await;

        let Some(current) = self.store.get_current(guild_id) else {
            return false;
        };
        if self.playback.is_streaming(guild_id).await {
            return false;
        }

        self.playback.start(guild_id, &current).await
    }

    /// Vacía la cola. Si hay audio sonando se conserva el track actual
    /// (posición 0), porque el reproductor ya lo está consumiendo.
    pub async fn clear(&self, guild_id: GuildId) -> CommandOutcome {
        let _guard = self.locks.acquire(guild_id).await;
        let len = self.store.len(guild_id);

        if len == 0 {
            return CommandOutcome::Reply("no hay tracks en la cola.".to_string());
        }

        if self.playback.is_streaming(guild_id).await {
            self.store.remove_range(guild_id, 1, len - 1);
            info!("🗑️ Cola limpiada en guild {} (se conserva el track actual)", guild_id);
            CommandOutcome::Channel(
                "🗑️ Se quitaron todos los tracks de la cola excepto el que se está reproduciendo."
                    .to_string(),
            )
        } else {
            self.store.remove_all(guild_id);
            info!("🗑️ Cola eliminada en guild {}", guild_id);
            CommandOutcome::Channel("🗑️ Se quitaron todos los tracks de la cola.".to_string())
        }
    }

    pub async fn play(
        &self,
        guild_id: GuildId,
        requested_by: UserId,
        query: Option<&str>,
    ) -> CommandOutcome {
        let Some(query) = query else {
            return CommandOutcome::Reply(format!("uso: `{}play <url>`", self.prefix));
        };
        let Some(resolver) = &self.resolver else {
            return CommandOutcome::Reply(
                "❌ La reproducción desde SoundCloud no está configurada.".to_string(),
            );
        };

        // Resolver fuera del lock: es una llamada de red
        let tracks = match resolver.resolve(query, requested_by).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(
                    "No se pudo resolver {} con {} en guild {}: {}",
                    query,
                    resolver.source_name(),
                    guild_id,
                    e
                );
                return CommandOutcome::Reply(format!("❌ {}", e));
            }
        };

        let _guard = self.locks.acquire(guild_id).await;
        let added = tracks.len();
        let first_title = tracks.first().map(|t| t.title().to_string());
        let queue = self.store.add_tracks(guild_id, tracks);
        let position = queue.len() - added;

        info!("➕ {} track(s) agregados en guild {} (cola: {})", added, guild_id, queue.len());

        // Cola nueva: nada suena todavía
        let started = match queue.first() {
            Some(head) if position == 0 => self.playback.start(guild_id, head).await,
            _ => false,
        };

        match (added, first_title) {
            (1, Some(title)) if started => {
                CommandOutcome::Channel(format!("▶️ Reproduciendo **{}**.", title))
            }
            (1, Some(title)) if position == 0 => {
                CommandOutcome::Channel(format!("✅ **{}** agregado, es el siguiente en sonar.", title))
            }
            (1, Some(title)) => CommandOutcome::Channel(format!(
                "✅ **{}** agregado a la cola en la posición {}.",
                title, position
            )),
            _ => CommandOutcome::Channel(format!(
                "✅ {} tracks agregados a la cola ({} en total).",
                added,
                queue.len()
            )),
        }
    }

    pub async fn queue(&self, guild_id: GuildId, page: Option<&str>) -> CommandOutcome {
        let page = match page.map(str::parse::<usize>) {
            None => 1,
            Some(Ok(page)) => page,
            Some(Err(_)) => {
                return CommandOutcome::Reply(format!("uso: `{}queue [página]`", self.prefix));
            }
        };

        let tracks = self.store.get_queue(guild_id);
        if tracks.is_empty() {
            return CommandOutcome::Reply("no hay tracks en la cola.".to_string());
        }

        CommandOutcome::Channel(messages::format_queue(&tracks, page, self.page_size))
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> CommandOutcome {
        match self.store.get_current(guild_id) {
            Some(track) => CommandOutcome::Channel(format!(
                "🎵 Reproduciendo: {}",
                messages::format_track(&track)
            )),
            None => CommandOutcome::Reply("no se está reproduciendo nada.".to_string()),
        }
    }

    /// Avanza la cola. Con audio sonando se detiene el track y el evento de
    /// fin de track hace el avance; si no, se avanza aquí directamente.
    pub async fn skip(&self, guild_id: GuildId) -> CommandOutcome {
        let _guard = self.locks.acquire(guild_id).await;

        let Some(current) = self.store.get_current(guild_id) else {
            return CommandOutcome::Reply("no hay tracks en la cola.".to_string());
        };

        if self.playback.is_streaming(guild_id).await {
            if self.playback.stop(guild_id).await {
                return CommandOutcome::Channel(format!("⏭️ Saltado **{}**.", current.title()));
            }
            // La cabeza sigue sonando, la cola no se toca
            warn!("No se pudo saltar {} en guild {}", current.title(), guild_id);
            return CommandOutcome::Reply(
                "❌ No se pudo detener el track actual, la cola no cambió.".to_string(),
            );
        }

        let remaining = self.store.remove_first(guild_id);
        match remaining.first() {
            Some(next) => {
                self.playback.start(guild_id, next).await;
                CommandOutcome::Channel(format!(
                    "⏭️ Saltado **{}**. Siguiente: **{}**.",
                    current.title(),
                    next.title()
                ))
            }
            None => CommandOutcome::Channel(format!(
                "⏭️ Saltado **{}**. La cola quedó vacía.",
                current.title()
            )),
        }
    }

    /// Quita un track pendiente. La posición 0 es el track actual y solo se
    /// quita con `skip`.
    pub async fn remove(&self, guild_id: GuildId, position: Option<&str>) -> CommandOutcome {
        let Some(position) = position.and_then(|p| p.parse::<usize>().ok()) else {
            return CommandOutcome::Reply(format!("uso: `{}remove <posición>`", self.prefix));
        };
        if position == 0 {
            return CommandOutcome::Reply(format!(
                "la posición 0 es el track actual, usa `{}skip`.",
                self.prefix
            ));
        }

        let _guard = self.locks.acquire(guild_id).await;
        let tracks = self.store.get_queue(guild_id);

        if tracks.is_empty() {
            return CommandOutcome::Reply("no hay tracks en la cola.".to_string());
        }
        let Some(track) = tracks.get(position) else {
            return CommandOutcome::Reply(format!(
                "no hay ningún track en la posición {} (la cola tiene {}).",
                position,
                tracks.len()
            ));
        };

        self.store.remove_range(guild_id, position, 1);
        CommandOutcome::Channel(format!("🗑️ Quitado **{}** de la cola.", track.title()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{playback::MockPlaybackState, track::Track},
        sources::{MockTrackResolver, SourceError},
    };
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn guild() -> GuildId {
        GuildId::new(100)
    }

    fn track(name: &str) -> Track {
        Track::new(format!("https://soundcloud.com/a/{name}"), name, UserId::new(1))
    }

    fn titles(store: &QueueStore, guild_id: GuildId) -> Vec<String> {
        store
            .get_queue(guild_id)
            .iter()
            .map(|t| t.title().to_string())
            .collect()
    }

    fn streaming(active: bool) -> MockPlaybackState {
        let mut playback = MockPlaybackState::new();
        playback.expect_is_streaming().returning(move |_| active);
        playback
    }

    fn commands(
        store: Arc<QueueStore>,
        playback: MockPlaybackState,
        resolver: Option<MockTrackResolver>,
    ) -> QueueCommands {
        QueueCommands::new(
            store,
            Arc::new(playback),
            resolver.map(|r| Arc::new(r) as Arc<dyn TrackResolver>),
            Arc::new(GuildLocks::default()),
            "!".to_string(),
            10,
        )
    }

    fn seeded(names: &[&str]) -> Arc<QueueStore> {
        let store = Arc::new(QueueStore::new());
        store.add_tracks(guild(), names.iter().map(|n| track(n)).collect());
        store
    }

    #[tokio::test]
    async fn clear_while_playing_keeps_current_track() {
        let store = seeded(&["t0", "t1", "t2"]);
        let mut playback = MockPlaybackState::new();
        playback
            .expect_is_streaming()
            .with(eq(guild()))
            .times(1)
            .returning(|_| true);
        let commands = commands(store.clone(), playback, None);

        let outcome = commands.clear(guild()).await;

        assert!(matches!(outcome, CommandOutcome::Channel(_)));
        assert!(outcome.text().contains("excepto el que se está reproduciendo"));
        assert_eq!(titles(&store, guild()), vec!["t0"]);
    }

    #[tokio::test]
    async fn clear_while_idle_removes_everything() {
        let store = seeded(&["t0", "t1", "t2"]);
        let commands = commands(store.clone(), streaming(false), None);

        let outcome = commands.clear(guild()).await;

        assert_eq!(
            outcome,
            CommandOutcome::Channel("🗑️ Se quitaron todos los tracks de la cola.".to_string())
        );
        assert!(store.get_queue(guild()).is_empty());
        assert!(!store.contains(guild()));
    }

    #[tokio::test]
    async fn clear_on_empty_queue_only_replies() {
        let store = Arc::new(QueueStore::new());
        let mut playback = MockPlaybackState::new();
        playback.expect_is_streaming().never();
        let commands = commands(store.clone(), playback, None);

        let outcome = commands.clear(guild()).await;

        assert_eq!(outcome, CommandOutcome::Reply("no hay tracks en la cola.".to_string()));
        assert_eq!(store.guild_count(), 0);
    }

    #[tokio::test]
    async fn clear_while_playing_single_track_keeps_it() {
        let store = seeded(&["t0"]);
        let commands = commands(store.clone(), streaming(true), None);

        commands.clear(guild()).await;

        assert_eq!(titles(&store, guild()), vec!["t0"]);
    }

    #[tokio::test]
    async fn clear_does_not_touch_other_guilds() {
        let store = seeded(&["t0", "t1"]);
        let other = GuildId::new(200);
        store.add_tracks(other, vec![track("x"), track("y")]);
        let commands = commands(store.clone(), streaming(false), None);

        commands.clear(guild()).await;

        assert_eq!(titles(&store, other), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn skip_while_idle_advances_queue() {
        let store = seeded(&["t0", "t1"]);
        let mut playback = streaming(false);
        playback.expect_stop().never();
        playback
            .expect_start()
            .withf(|_, track| track.title() == "t1")
            .times(1)
            .returning(|_, _| false);
        let commands = commands(store.clone(), playback, None);

        let outcome = commands.skip(guild()).await;

        assert_eq!(
            outcome,
            CommandOutcome::Channel("⏭️ Saltado **t0**. Siguiente: **t1**.".to_string())
        );
        assert_eq!(titles(&store, guild()), vec!["t1"]);
    }

    #[tokio::test]
    async fn skip_while_streaming_stops_playback() {
        let store = seeded(&["t0", "t1"]);
        let mut playback = streaming(true);
        playback
            .expect_stop()
            .with(eq(guild()))
            .times(1)
            .returning(|_| true);
        let commands = commands(store.clone(), playback, None);

        let outcome = commands.skip(guild()).await;

        assert_eq!(outcome, CommandOutcome::Channel("⏭️ Saltado **t0**.".to_string()));
        // El avance lo hace el evento de fin de track
        assert_eq!(titles(&store, guild()), vec!["t0", "t1"]);
    }

    #[tokio::test]
    async fn skip_when_stop_fails_keeps_queue() {
        let store = seeded(&["t0", "t1"]);
        let mut playback = streaming(true);
        playback.expect_stop().times(1).returning(|_| false);
        playback.expect_start().never();
        let commands = commands(store.clone(), playback, None);

        let outcome = commands.skip(guild()).await;

        assert!(matches!(outcome, CommandOutcome::Reply(_)));
        assert_eq!(titles(&store, guild()), vec!["t0", "t1"]);
    }

    #[tokio::test]
    async fn skip_last_track_deletes_queue() {
        let store = seeded(&["t0"]);
        let mut playback = streaming(false);
        playback.expect_start().never();
        let commands = commands(store.clone(), playback, None);

        let outcome = commands.skip(guild()).await;

        assert!(outcome.text().contains("La cola quedó vacía"));
        assert!(!store.contains(guild()));
    }

    #[tokio::test]
    async fn skip_on_empty_queue_replies() {
        let commands = commands(Arc::new(QueueStore::new()), MockPlaybackState::new(), None);

        assert!(matches!(commands.skip(guild()).await, CommandOutcome::Reply(_)));
    }

    #[tokio::test]
    async fn remove_takes_out_one_upcoming_track() {
        let store = seeded(&["t0", "t1", "t2"]);
        let commands = commands(store.clone(), MockPlaybackState::new(), None);

        let outcome = commands.remove(guild(), Some("1")).await;

        assert_eq!(outcome, CommandOutcome::Channel("🗑️ Quitado **t1** de la cola.".to_string()));
        assert_eq!(titles(&store, guild()), vec!["t0", "t2"]);
    }

    #[tokio::test]
    async fn remove_refuses_current_and_bad_positions() {
        let store = seeded(&["t0", "t1"]);
        let commands = commands(store.clone(), MockPlaybackState::new(), None);

        assert!(commands.remove(guild(), Some("0")).await.text().contains("skip"));
        assert!(matches!(commands.remove(guild(), Some("5")).await, CommandOutcome::Reply(_)));
        assert!(matches!(commands.remove(guild(), Some("dos")).await, CommandOutcome::Reply(_)));
        assert!(matches!(commands.remove(guild(), None).await, CommandOutcome::Reply(_)));
        assert_eq!(titles(&store, guild()), vec!["t0", "t1"]);
    }

    #[tokio::test]
    async fn play_appends_resolved_tracks() {
        let store = seeded(&["t0"]);
        let mut resolver = MockTrackResolver::new();
        resolver
            .expect_resolve()
            .withf(|query, user| {
                query.to_string() == "https://soundcloud.com/a/new" && *user == UserId::new(9)
            })
            .times(1)
            .returning(|_, user| {
                Ok(vec![Track::new("https://soundcloud.com/a/new", "new", user)
                    .with_duration(Duration::from_secs(90))])
            });
        let commands = commands(store.clone(), MockPlaybackState::new(), Some(resolver));

        let outcome = commands
            .play(guild(), UserId::new(9), Some("https://soundcloud.com/a/new"))
            .await;

        assert_eq!(
            outcome,
            CommandOutcome::Channel("✅ **new** agregado a la cola en la posición 1.".to_string())
        );
        assert_eq!(titles(&store, guild()), vec!["t0", "new"]);
    }

    #[tokio::test]
    async fn play_playlist_reports_count() {
        let store = Arc::new(QueueStore::new());
        let mut resolver = MockTrackResolver::new();
        resolver
            .expect_resolve()
            .returning(|_, _| Ok(vec![track("a"), track("b"), track("c")]));
        let mut playback = MockPlaybackState::new();
        playback
            .expect_start()
            .withf(|_, track| track.title() == "a")
            .times(1)
            .returning(|_, _| true);
        let commands = commands(store.clone(), playback, Some(resolver));

        let outcome = commands
            .play(guild(), UserId::new(9), Some("https://soundcloud.com/a/sets/mix"))
            .await;

        assert!(outcome.text().contains("3 tracks agregados"));
        assert_eq!(titles(&store, guild()), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn play_on_empty_queue_starts_playback() {
        let store = Arc::new(QueueStore::new());
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().returning(|_, _| Ok(vec![track("solo")]));
        let mut playback = MockPlaybackState::new();
        playback.expect_start().times(1).returning(|_, _| true);
        let commands = commands(store.clone(), playback, Some(resolver));

        let outcome = commands
            .play(guild(), UserId::new(9), Some("https://soundcloud.com/a/solo"))
            .await;

        assert_eq!(outcome, CommandOutcome::Channel("▶️ Reproduciendo **solo**.".to_string()));
        assert_eq!(titles(&store, guild()), vec!["solo"]);
    }

    #[tokio::test]
    async fn play_without_voice_only_enqueues() {
        let store = Arc::new(QueueStore::new());
        let mut resolver = MockTrackResolver::new();
        resolver.expect_resolve().returning(|_, _| Ok(vec![track("solo")]));
        let mut playback = MockPlaybackState::new();
        playback.expect_start().times(1).returning(|_, _| false);
        let commands = commands(store.clone(), playback, Some(resolver));

        let outcome = commands
            .play(guild(), UserId::new(9), Some("https://soundcloud.com/a/solo"))
            .await;

        assert_eq!(
            outcome,
            CommandOutcome::Channel("✅ **solo** agregado, es el siguiente en sonar.".to_string())
        );
    }

    #[tokio::test]
    async fn resume_starts_head_only_when_idle() {
        let store = seeded(&["t0", "t1"]);
        let mut playback = streaming(false);
        playback
            .expect_start()
            .withf(|_, track| track.title() == "t0")
            .times(1)
            .returning(|_, _| true);
        let idle = commands(store.clone(), playback, None);

        assert!(idle.resume(guild()).await);
        assert_eq!(titles(&store, guild()), vec!["t0", "t1"]);

        let mut playback = streaming(true);
        playback.expect_start().never();
        let busy = commands(store, playback, None);
        assert!(!busy.resume(guild()).await);
    }

    #[tokio::test]
    async fn resume_on_empty_queue_does_nothing() {
        let mut playback = MockPlaybackState::new();
        playback.expect_is_streaming().never();
        playback.expect_start().never();
        let commands = commands(Arc::new(QueueStore::new()), playback, None);

        assert!(!commands.resume(guild()).await);
    }

    #[tokio::test]
    async fn play_failure_leaves_queue_untouched() {
        let store = Arc::new(QueueStore::new());
        let mut resolver = MockTrackResolver::new();
        resolver
            .expect_resolve()
            .returning(|query, _| Err(SourceError::UnsupportedUrl(query.to_string())));
        resolver.expect_source_name().return_const("soundcloud");
        let commands = commands(store.clone(), MockPlaybackState::new(), Some(resolver));

        let outcome = commands.play(guild(), UserId::new(9), Some("lofi")).await;

        assert_eq!(outcome, CommandOutcome::Reply("❌ URL no soportada: lofi".to_string()));
        assert_eq!(store.guild_count(), 0);
    }

    #[tokio::test]
    async fn play_without_resolver_or_argument_replies() {
        let commands = commands(Arc::new(QueueStore::new()), MockPlaybackState::new(), None);

        assert!(matches!(commands.play(guild(), UserId::new(9), None).await, CommandOutcome::Reply(_)));
        assert!(matches!(
            commands.play(guild(), UserId::new(9), Some("https://soundcloud.com/a/b")).await,
            CommandOutcome::Reply(_)
        ));
    }

    #[tokio::test]
    async fn queue_and_now_playing_render_current_track() {
        let store = seeded(&["t0", "t1"]);
        let commands = commands(store, MockPlaybackState::new(), None);

        let listing = commands.queue(guild(), None).await;
        assert!(listing.text().contains("▶️ **t0**"));
        assert!(matches!(commands.queue(guild(), Some("x")).await, CommandOutcome::Reply(_)));

        let now = commands.now_playing(guild()).await;
        assert!(now.text().starts_with("🎵 Reproduciendo: **t0**"));
    }

    #[tokio::test]
    async fn queue_and_now_playing_on_empty_guild_reply() {
        let commands = commands(Arc::new(QueueStore::new()), MockPlaybackState::new(), None);

        assert!(matches!(commands.queue(guild(), None).await, CommandOutcome::Reply(_)));
        assert!(matches!(commands.now_playing(guild()).await, CommandOutcome::Reply(_)));
    }

    #[tokio::test]
    async fn guild_lock_serializes_same_guild_only() {
        let locks = GuildLocks::default();
        let held = locks.acquire(guild()).await;

        let same = tokio::time::timeout(Duration::from_millis(20), locks.acquire(guild())).await;
        assert!(same.is_err());

        let other = tokio::time::timeout(Duration::from_millis(20), locks.acquire(GuildId::new(7))).await;
        assert!(other.is_ok());

        drop(held);
        let again = tokio::time::timeout(Duration::from_millis(20), locks.acquire(guild())).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn guild_lock_is_released_only_when_unused() {
        let locks = GuildLocks::default();
        let held = locks.acquire(guild()).await;

        assert!(!locks.release(guild()));

        drop(held);
        assert!(locks.release(guild()));
        assert!(!locks.release(guild()));
    }
}
