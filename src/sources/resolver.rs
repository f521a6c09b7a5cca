use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use super::{CatalogProvider, SearchHit, SearchProvider, Track, TrackResolver};
use crate::error::ResolveError;

/// Sufijo agregado al título derivado del catálogo para favorecer versiones de audio
const CATALOG_SEARCH_SUFFIX: &str = "audio";

/// Resolver que combina un buscador de texto con un catálogo opcional.
///
/// Las URLs de tracks del catálogo se resuelven consultando sus metadatos y
/// buscando `"<artista> - <nombre> audio"`; cualquier otra consulta se busca
/// directamente. En ambos casos gana el primer resultado reproducible.
pub struct QueryResolver<S, C> {
    search: S,
    catalog: Option<C>,
    search_limit: usize,
}

impl<S, C> QueryResolver<S, C>
where
    S: SearchProvider,
    C: CatalogProvider,
{
    pub fn new(search: S, catalog: Option<C>, search_limit: usize) -> Self {
        Self {
            search,
            catalog,
            search_limit,
        }
    }

    /// Resuelve un link de track del catálogo
    async fn resolve_catalog(&self, id: &str) -> Result<Track, ResolveError> {
        let catalog = self.catalog.as_ref().ok_or_else(|| {
            ResolveError::MetadataLookupFailed("credenciales del catálogo no configuradas".into())
        })?;

        let credential = catalog.fetch_credential().await?;
        let item = catalog.lookup_track(id, &credential).await?;

        let title = item.display_title();
        info!("🎼 Track de catálogo {}: {}", id, title);

        let hits = self
            .search
            .search(&format!("{} {}", title, CATALOG_SEARCH_SUFFIX), self.search_limit)
            .await?;

        let hit = first_playable(hits).ok_or_else(|| ResolveError::NoPlayableResultFound(title.clone()))?;
        Ok(Track::new(title, hit.url))
    }

    /// Resuelve texto libre con una búsqueda directa
    async fn resolve_search(&self, query: &str) -> Result<Track, ResolveError> {
        let hits = self.search.search(query, self.search_limit).await?;
        let hit = first_playable(hits).ok_or_else(|| ResolveError::NoPlayableResultFound(query.to_string()))?;
        Ok(Track::new(hit.title, hit.url))
    }
}

#[async_trait]
impl<S, C> TrackResolver for QueryResolver<S, C>
where
    S: SearchProvider,
    C: CatalogProvider,
{
    async fn resolve(&self, query: &str) -> Result<Track, ResolveError> {
        let query = query.trim();
        debug!("🔍 Resolviendo consulta: {}", query);

        let result = match catalog_track_id(query) {
            Some(id) => self.resolve_catalog(&id).await,
            None => self.resolve_search(query).await,
        };

        if let Err(e) = &result {
            warn!("❌ No se pudo resolver '{}': {}", query, e);
        }
        result
    }
}

fn first_playable(hits: Vec<SearchHit>) -> Option<SearchHit> {
    hits.into_iter().find(|hit| hit.playable)
}

/// Extrae el ID de un link `open.spotify.com/track/<id>`, con o sin esquema
pub fn catalog_track_id(query: &str) -> Option<String> {
    let url = Url::parse(query)
        .or_else(|_| Url::parse(&format!("https://{}", query)))
        .ok()?;
    let host = url.host_str()?;
    if host != "spotify.com" && !host.ends_with(".spotify.com") {
        return None;
    }

    // Acepta también prefijos de idioma como /intl-es/track/<id>
    let mut segments = url.path_segments()?.skip_while(|s| *s != "track");
    segments.next()?;
    segments
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
