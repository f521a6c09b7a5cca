use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{SearchHit, SearchProvider};
use crate::error::ResolveError;

/// Cliente de búsqueda en YouTube usando yt-dlp
pub struct YouTubeClient {
    // Limitar procesos concurrentes de yt-dlp para evitar rate limiting
    rate_limiter: Semaphore,
}

/// Entrada de búsqueda extraída de yt-dlp (`--flat-playlist`)
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    ie_key: Option<String>,
    live_status: Option<String>,
}

impl YouTubeClient {
    pub fn new() -> Self {
        Self {
            rate_limiter: Semaphore::new(3),
        }
    }

    /// Verifica que yt-dlp esté instalado y pueda ejecutarse
    pub async fn verify_installed() -> anyhow::Result<String> {
        let output = Command::new("yt-dlp").arg("--version").output().await?;

        if !output.status.success() {
            anyhow::bail!("yt-dlp no puede ejecutarse correctamente");
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for YouTubeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for YouTubeClient {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>, ResolveError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| ResolveError::SearchFailed(e.to_string()))?;

        info!("🔍 Buscando en YouTube: {}", text);

        let search_query = format!("ytsearch{}:{}", limit, text);

        let output = Command::new("yt-dlp")
            .args([
                "--no-playlist",
                "--dump-json",
                "--flat-playlist",
                "--skip-download",
                "--no-warnings",
                search_query.as_str(),
            ])
            .output()
            .await
            .map_err(|e| ResolveError::SearchFailed(format!("error al ejecutar yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("❌ yt-dlp error: {}", error.trim());
            return Err(ResolveError::SearchFailed(format!("yt-dlp error: {}", error.trim())));
        }

        let hits = parse_search_output(&String::from_utf8_lossy(&output.stdout));
        debug!("📊 {} resultados para '{}'", hits.len(), text);

        Ok(hits)
    }
}

/// Convierte la salida JSON por líneas de yt-dlp en resultados de búsqueda.
/// Las líneas que no se pueden parsear se ignoran.
fn parse_search_output(stdout: &str) -> Vec<SearchHit> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<YtDlpEntry>(line).ok())
        .filter_map(entry_to_hit)
        .collect()
}

fn entry_to_hit(entry: YtDlpEntry) -> Option<SearchHit> {
    let url = entry
        .webpage_url
        .or(entry.url)
        .or_else(|| entry.id.as_ref().map(|id| format!("https://www.youtube.com/watch?v={}", id)))?;

    // Canales y playlists llegan con ie_key "YoutubeTab"; los estrenos aún no tienen audio
    let is_video = entry.ie_key.as_deref().map_or(true, |key| key == "Youtube");
    let is_upcoming = entry.live_status.as_deref() == Some("is_upcoming");

    Some(SearchHit {
        title: entry.title.unwrap_or_else(|| url.clone()),
        url,
        playable: is_video && !is_upcoming,
    })
}
