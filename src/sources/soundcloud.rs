use async_trait::async_trait;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{SourceError, TrackResolver};
use crate::audio::track::Track;

const API_BASE: &str = "https://api.soundcloud.com/";

/// Recurso devuelto por el endpoint `/resolve`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SoundcloudResource {
    Track(SoundcloudTrack),
    Playlist(SoundcloudPlaylist),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoundcloudTrack {
    #[allow(dead_code)]
    pub id: u64,
    pub title: String,
    /// Milisegundos
    pub duration: u64,
    pub permalink_url: String,
    #[serde(default)]
    pub streamable: bool,
    #[serde(default)]
    pub stream_url: Option<String>,
    pub user: SoundcloudUserPeek,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoundcloudUserPeek {
    #[allow(dead_code)]
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct SoundcloudPlaylist {
    pub title: String,
    #[serde(default)]
    pub tracks: Vec<SoundcloudTrack>,
}

#[derive(Debug, Deserialize)]
struct SoundcloudError {
    #[serde(default)]
    errors: Vec<SoundcloudErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct SoundcloudErrorMessage {
    error_message: String,
}

impl SoundcloudTrack {
    pub fn into_track(self, requested_by: UserId) -> Track {
        let track = Track::new(self.permalink_url, self.title, requested_by)
            .with_artist(self.user.username)
            .with_duration(Duration::from_millis(self.duration));

        match self.stream_url {
            Some(stream_url) => track.with_stream_url(stream_url),
            None => track,
        }
    }
}

impl SoundcloudResource {
    /// Convierte el recurso en tracks encolables, descartando los que no se
    /// pueden reproducir.
    pub fn into_tracks(self, requested_by: UserId) -> Result<Vec<Track>, SourceError> {
        match self {
            SoundcloudResource::Track(track) => {
                if !track.streamable {
                    return Err(SourceError::NotStreamable(track.title));
                }
                Ok(vec![track.into_track(requested_by)])
            }
            SoundcloudResource::Playlist(playlist) => {
                let total = playlist.tracks.len();
                let tracks: Vec<Track> = playlist
                    .tracks
                    .into_iter()
                    .filter(|track| track.streamable)
                    .map(|track| track.into_track(requested_by))
                    .collect();

                if tracks.len() < total {
                    warn!(
                        "🚫 Playlist {}: {} de {} tracks no se pueden reproducir",
                        playlist.title,
                        total - tracks.len(),
                        total
                    );
                }
                if tracks.is_empty() {
                    return Err(SourceError::Empty);
                }
                Ok(tracks)
            }
            SoundcloudResource::Other => Err(SourceError::Empty),
        }
    }
}

/// Cliente de la API pública de SoundCloud.
pub struct SoundCloudClient {
    http: reqwest::Client,
    client_id: String,
    api_base: Url,
}

impl SoundCloudClient {
    pub fn new(client_id: String) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            client_id,
            api_base: Url::parse(API_BASE)?,
        })
    }

    pub fn is_soundcloud_url(input: &str) -> bool {
        Url::parse(input)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .and_then(|url| url.host_str().map(str::to_owned))
            .is_some_and(|host| host == "soundcloud.com" || host.ends_with(".soundcloud.com"))
    }

    fn resolve_url(&self, target: &str) -> Result<Url, SourceError> {
        let mut url = self
            .api_base
            .join("resolve")
            .map_err(|_| SourceError::UnsupportedUrl(target.to_string()))?;
        url.query_pairs_mut()
            .append_pair("url", target)
            .append_pair("client_id", &self.client_id);
        Ok(url)
    }

    /// La URL de stream de la API solo responde con el client id en la query.
    fn sign_stream(&self, track: Track) -> Track {
        let signed = track.stream_url().and_then(|stream_url| {
            let mut url = Url::parse(stream_url).ok()?;
            url.query_pairs_mut().append_pair("client_id", &self.client_id);
            Some(String::from(url))
        });

        match signed {
            Some(stream_url) => track.with_stream_url(stream_url),
            None => track,
        }
    }

    async fn fetch(&self, target: &str) -> Result<SoundcloudResource, SourceError> {
        let url = self.resolve_url(target)?;
        debug!("🔗 Resolviendo {} en SoundCloud", target);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn api_error(status: u16, body: &str) -> SourceError {
    let message = serde_json::from_str::<SoundcloudError>(body)
        .ok()
        .and_then(|error| error.errors.into_iter().next())
        .map(|error| error.error_message)
        .unwrap_or_else(|| "sin detalle".to_string());

    SourceError::Api { status, message }
}

#[async_trait]
impl TrackResolver for SoundCloudClient {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Vec<Track>, SourceError> {
        if !Self::is_soundcloud_url(query) {
            return Err(SourceError::UnsupportedUrl(query.to_string()));
        }

        let tracks: Vec<Track> = self
            .fetch(query)
            .await?
            .into_tracks(requested_by)?
            .into_iter()
            .map(|track| self.sign_stream(track))
            .collect();
        info!("🎵 SoundCloud resolvió {} track(s) para {}", tracks.len(), query);
        Ok(tracks)
    }

    fn source_name(&self) -> &'static str {
        "soundcloud"
    }
}
