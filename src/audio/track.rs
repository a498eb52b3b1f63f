use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::time::Duration;

/// Un elemento reproducible de la cola.
///
/// Inmutable una vez encolado: la cola solo clona y mueve tracks, nunca
/// los modifica.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    url: String,
    /// URL de audio que consume el reproductor, si la fuente la expone
    stream_url: Option<String>,
    title: String,
    artist: Option<String>,
    duration: Option<Duration>,
    requested_by: UserId,
    added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(url: impl Into<String>, title: impl Into<String>, requested_by: UserId) -> Self {
        Self {
            url: url.into(),
            stream_url: None,
            title: title.into(),
            artist: None,
            duration: None,
            requested_by,
            added_at: Utc::now(),
        }
    }

    // Getters
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn stream_url(&self) -> Option<&str> {
        self.stream_url.as_deref()
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }
    #[allow(dead_code)]
    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    // Builders
    pub fn with_stream_url(mut self, stream_url: impl Into<String>) -> Self {
        self.stream_url = Some(stream_url.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}
