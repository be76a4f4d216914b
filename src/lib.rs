pub mod auth;
pub mod catalog;
pub mod db;
pub mod heartbeat;
pub mod http;
pub mod settings;
pub mod theme;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::warn;

use auth::CredentialProvider;
use catalog::CatalogClient;
use db::LocalStore;
use heartbeat::{ActivityReporter, SessionCoordinates, TabVisibility};
use http::{HttpClient, ReqwestHttpClient};
use settings::AppConfig;
use theme::ThemeStore;

/// Everything a reader view needs, wired from one config and one store.
pub struct AppContext {
    pub config: AppConfig,
    pub store: LocalStore,
    pub http: Arc<dyn HttpClient>,
    pub visibility: TabVisibility,
}

impl AppContext {
    pub fn new(config: AppConfig, store_path: PathBuf) -> Result<Self> {
        let store = LocalStore::open(store_path)?;
        let http = ReqwestHttpClient::new(config.request_timeout())
            .map_err(|err| anyhow!("failed to build HTTP client: {err}"))?;
        Ok(Self::with_parts(config, store, Arc::new(http)))
    }

    pub fn with_parts(config: AppConfig, store: LocalStore, http: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            store,
            http,
            visibility: TabVisibility::default(),
        }
    }

    fn credentials(&self) -> Arc<dyn CredentialProvider> {
        Arc::new(self.store.clone())
    }

    /// A fresh reporter for one reader view. Call `stop` on it when the view
    /// closes.
    pub fn reporter(&self) -> ActivityReporter {
        ActivityReporter::from_config(
            &self.config,
            Arc::clone(&self.http),
            self.credentials(),
            Arc::new(self.visibility.clone()),
        )
    }

    pub fn catalog(&self) -> CatalogClient {
        CatalogClient::from_config(&self.config, Arc::clone(&self.http), self.credentials())
    }

    /// Coordinates for reading `chapter` of `manga`. Without an explicit genre
    /// the manga's primary genre is looked up; a failed lookup only drops the
    /// genre.
    pub async fn reading_coordinates(
        &self,
        manga: &str,
        chapter: u32,
        page: u32,
        genre: Option<String>,
    ) -> SessionCoordinates {
        let genre = match genre {
            Some(genre) => Some(genre),
            None => match self.catalog().manga(manga).await {
                Ok(detail) => detail.primary_genre().map(str::to_string),
                Err(err) => {
                    warn!("Could not look up genre for {manga}: {err}");
                    None
                }
            },
        };

        let mut coordinates = SessionCoordinates::new(manga, Some(chapter)).with_page(page);
        coordinates.genre = genre;
        coordinates
    }

    pub fn themes(&self) -> ThemeStore {
        ThemeStore::new(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::ReporterStatus;
    use crate::http::mock::MockHttpClient;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn context_wires_reporter_to_configured_collector() {
        let config = AppConfig {
            api_base_url: "https://reader.example/".into(),
            ..AppConfig::default()
        };
        let mock = Arc::new(MockHttpClient::new());
        let ctx = AppContext::with_parts(config, LocalStore::open_in_memory().unwrap(), mock.clone());

        let reporter = ctx.reporter();
        let status = reporter
            .update_coordinates(SessionCoordinates::new("m9", Some(2)))
            .await;
        assert_eq!(status, ReporterStatus::Active);
        tokio::time::sleep(Duration::from_millis(1)).await;
        reporter.stop().await;

        let requests = mock.recorded();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://reader.example/api/analytics/heartbeat");
    }

    #[tokio::test(start_paused = true)]
    async fn hiding_the_context_tab_gates_its_reporters() {
        let mock = Arc::new(MockHttpClient::new());
        let ctx = AppContext::with_parts(
            AppConfig::default(),
            LocalStore::open_in_memory().unwrap(),
            mock.clone(),
        );
        ctx.visibility.set_visible(false);

        let reporter = ctx.reporter();
        reporter
            .update_coordinates(SessionCoordinates::new("m9", Some(2)))
            .await;
        tokio::time::sleep(Duration::from_secs(61)).await;
        reporter.stop().await;

        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn genre_defaults_to_the_catalog_primary_genre() {
        let mock = Arc::new(MockHttpClient::new());
        mock.mock_route(
            "http://localhost:5000/api/manga/m1",
            200,
            json!({ "id": "m1", "title": "Blue Period", "genres": ["drama", "art"] }),
        );
        let ctx = AppContext::with_parts(
            AppConfig::default(),
            LocalStore::open_in_memory().unwrap(),
            mock.clone(),
        );

        let looked_up = ctx.reading_coordinates("m1", 3, 7, None).await;
        assert_eq!(looked_up.genre.as_deref(), Some("drama"));
        assert_eq!(looked_up.chapter_number, Some(3));
        assert_eq!(looked_up.page_number, 7);

        let explicit = ctx.reading_coordinates("m1", 3, 7, Some("seinen".into())).await;
        assert_eq!(explicit.genre.as_deref(), Some("seinen"));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_genre_lookup_still_yields_coordinates() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_status(404);
        let ctx = AppContext::with_parts(
            AppConfig::default(),
            LocalStore::open_in_memory().unwrap(),
            mock,
        );

        let coordinates = ctx.reading_coordinates("m1", 3, 1, None).await;
        assert_eq!(coordinates.genre, None);
        assert!(coordinates.is_reportable());
    }
}
