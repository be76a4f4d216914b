mod cache;
pub mod models;

pub use cache::FreshCache;
pub use models::{ChapterSummary, LibraryEntry, MangaDetail};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::auth::CredentialProvider;
use crate::http::{HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse};
use crate::settings::AppConfig;

use models::AddToLibraryRequest;

const ENABLE_LOGS: bool = false;

use crate::log_debug;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not signed in or session expired")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(String),
    #[error("catalog API responded with status {0}")]
    Upstream(u16),
    #[error("invalid catalog URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Transport(#[from] HttpError),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read side of the manga API: detail pages, chapter lists, the reader's
/// library. GETs are served from a freshness-window cache.
#[derive(Clone)]
pub struct CatalogClient {
    client: Arc<dyn HttpClient>,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
    manga: Arc<Mutex<FreshCache<String, MangaDetail>>>,
    chapters: Arc<Mutex<FreshCache<String, Vec<ChapterSummary>>>>,
    library: Arc<Mutex<FreshCache<(), Vec<LibraryEntry>>>>,
    // Bumped on every library write; a fetch started under an older
    // generation must not repopulate the cache.
    library_generation: Arc<AtomicU64>,
}

impl CatalogClient {
    pub fn new(
        client: Arc<dyn HttpClient>,
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        ttl: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            manga: Arc::new(Mutex::new(FreshCache::new(ttl))),
            chapters: Arc::new(Mutex::new(FreshCache::new(ttl))),
            library: Arc::new(Mutex::new(FreshCache::new(ttl))),
            library_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        client: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self::new(client, config.base_url(), credentials, config.catalog_ttl())
    }

    pub async fn manga(&self, id: &str) -> Result<MangaDetail, CatalogError> {
        if let Some(hit) = self.manga.lock().await.get(&id.to_string()) {
            log_debug!("manga {id} served from cache");
            return Ok(hit);
        }

        let detail: MangaDetail = self.get_json(&["api", "manga", id], "manga").await?;
        let mut cache = self.manga.lock().await;
        cache.purge_stale();
        cache.insert(id.to_string(), detail.clone());
        Ok(detail)
    }

    pub async fn chapters(&self, manga_id: &str) -> Result<Vec<ChapterSummary>, CatalogError> {
        if let Some(hit) = self.chapters.lock().await.get(&manga_id.to_string()) {
            return Ok(hit);
        }

        let mut chapters: Vec<ChapterSummary> = self
            .get_json(&["api", "manga", manga_id, "chapters"], "chapters")
            .await?;
        chapters.sort_by_key(|chapter| chapter.chapter_number);

        let mut cache = self.chapters.lock().await;
        cache.purge_stale();
        cache.insert(manga_id.to_string(), chapters.clone());
        Ok(chapters)
    }

    pub async fn library(&self) -> Result<Vec<LibraryEntry>, CatalogError> {
        if let Some(hit) = self.library.lock().await.get(&()) {
            return Ok(hit);
        }

        let generation = self.library_generation.load(Ordering::Acquire);
        let entries: Vec<LibraryEntry> = self.get_json(&["api", "library"], "library").await?;

        let mut cache = self.library.lock().await;
        if self.library_generation.load(Ordering::Acquire) == generation {
            cache.insert((), entries.clone());
        } else {
            log_debug!("library changed during fetch; not caching");
        }
        Ok(entries)
    }

    pub async fn add_to_library(&self, manga_id: &str) -> Result<(), CatalogError> {
        let body = serde_json::to_string(&AddToLibraryRequest { manga_id })?;
        let request = self
            .request(HttpMethod::Post, &["api", "library"])?
            .with_json_body(body);

        let response = self.client.send(request).await?;
        check_status(&response, "manga")?;

        let mut cache = self.library.lock().await;
        self.library_generation.fetch_add(1, Ordering::AcqRel);
        cache.invalidate(&());
        Ok(())
    }

    /// Joins `segments` onto the base URL, percent-encoding each one so an id
    /// can never leak into the query or fragment.
    fn url(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| CatalogError::InvalidUrl(format!("{}: {err}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: HttpMethod, segments: &[&str]) -> Result<HttpRequest, CatalogError> {
        let url = self.url(segments)?;
        let token = self.credentials.bearer_token();
        Ok(HttpRequest::new(url.as_str(), method).with_bearer(token.as_deref()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        what: &str,
    ) -> Result<T, CatalogError> {
        let response = self.client.send(self.request(HttpMethod::Get, segments)?).await?;
        check_status(&response, what)?;
        Ok(response.json()?)
    }
}

fn check_status(response: &HttpResponse, what: &str) -> Result<(), CatalogError> {
    match response.status {
        _ if response.is_success() => Ok(()),
        401 | 403 => Err(CatalogError::Unauthorized),
        404 => Err(CatalogError::NotFound(what.to_string())),
        status => Err(CatalogError::Upstream(status)),
    }
}
