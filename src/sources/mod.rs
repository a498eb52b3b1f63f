pub mod soundcloud;

use async_trait::async_trait;
use serenity::model::id::UserId;
use thiserror::Error;

use crate::audio::track::Track;

pub use soundcloud::SoundCloudClient;

/// Errores al convertir lo que pide el usuario en tracks encolables.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("URL no soportada: {0}")]
    UnsupportedUrl(String),

    #[error("Error HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Respuesta inválida: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("La API respondió {status}: {message}")]
    Api { status: u16, message: String },

    #[error("El track no se puede reproducir: {0}")]
    NotStreamable(String),

    #[error("No se encontraron tracks reproducibles")]
    Empty,
}

/// Resuelve una URL en uno o más tracks (track suelto o playlist).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Vec<Track>, SourceError>;

    /// Nombre de la fuente
    fn source_name(&self) -> &'static str;
}
