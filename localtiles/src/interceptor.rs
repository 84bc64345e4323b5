//! The hooks handed to the HTTP transport.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::LocalTilesError::StorageLocatorError;
use crate::LocalTilesResult;
use crate::catalog::ArchiveCatalog;
use crate::config::{Config, InterceptorConfig};
use crate::http::{DownloadOptions, HttpRequest, HttpResponse, USER_AGENT};
use crate::router::RequestRouter;
use crate::storage::StorageLocator;

/// Extension points of the HTTP transport.
///
/// None of the hooks may fail: whatever goes wrong inside, the transport gets a
/// request or response back.
#[async_trait]
pub trait HttpServiceInterceptor: Send + Sync {
    /// Called before a request is sent.
    fn on_request(&self, request: HttpRequest) -> HttpRequest;

    /// Called before a resource download starts.
    fn on_download(&self, download: DownloadOptions) -> DownloadOptions;

    /// Called with the transport's response, which may be replaced.
    async fn on_response(&self, response: HttpResponse) -> HttpResponse;
}

/// Serves `https://local` requests from the archives and files of the application storage.
///
/// The storage directory is located and the archive catalog built on first use.
/// If either fails, every response is passed through unchanged.
#[derive(Debug)]
pub struct LocalHttpService {
    locator: Box<dyn StorageLocator>,
    app_id: String,
    config: InterceptorConfig,
    router: OnceCell<Option<Arc<RequestRouter>>>,
}

impl LocalHttpService {
    #[must_use]
    pub fn new(
        locator: Box<dyn StorageLocator>,
        app_id: impl Into<String>,
        config: InterceptorConfig,
    ) -> Self {
        Self {
            locator,
            app_id: app_id.into(),
            config,
            router: OnceCell::new(),
        }
    }

    pub fn from_config(config: &Config) -> LocalTilesResult<Self> {
        Ok(Self::new(
            config.storage.locator()?,
            config.storage.app_id.clone().unwrap_or_default(),
            config.interceptor.clone(),
        ))
    }

    #[must_use]
    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// Build the catalog now instead of on the first local response.
    ///
    /// Concurrent callers wait for the same build. Returns `None` if the
    /// service runs as a passthrough.
    pub async fn init(&self) -> Option<&Arc<RequestRouter>> {
        self.router
            .get_or_init(|| async {
                match self.build_router().await {
                    Ok(router) => Some(Arc::new(router)),
                    Err(e) => {
                        warn!("Local tiles are disabled, all responses pass through: {e}");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    async fn build_router(&self) -> LocalTilesResult<RequestRouter> {
        let storage_dir = self
            .locator
            .storage_dir(&self.app_id)
            .map_err(|e| StorageLocatorError(e, self.app_id.clone()))?;
        info!("Using storage directory {}", storage_dir.display());
        let catalog = ArchiveCatalog::build(&storage_dir, &self.config.archive_extension).await?;
        info!(
            "Found {} vector and {} raster archives",
            catalog.vector().len(),
            catalog.raster().len()
        );
        Ok(RequestRouter::new(
            Arc::new(catalog),
            self.config.strategy,
            self.config.local_prefix.clone(),
        ))
    }
}

#[async_trait]
impl HttpServiceInterceptor for LocalHttpService {
    fn on_request(&self, mut request: HttpRequest) -> HttpRequest {
        let marker = &self.config.user_agent_marker;
        if !marker.is_empty() {
            let user_agent = match request.header(USER_AGENT) {
                Some(agent) if !agent.is_empty() => format!("{agent} {marker}"),
                _ => marker.clone(),
            };
            request.set_header(USER_AGENT, user_agent);
        }
        request
    }

    fn on_download(&self, download: DownloadOptions) -> DownloadOptions {
        download
    }

    async fn on_response(&self, response: HttpResponse) -> HttpResponse {
        if !response.request.url.starts_with(&self.config.local_prefix) {
            return response;
        }
        match self.init().await {
            Some(router) => router.route(response).await,
            None => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use super::*;
    use crate::http::HttpRequestError;
    use crate::storage::FixedStorage;

    #[derive(Debug)]
    struct NoStorage;

    impl StorageLocator for NoStorage {
        fn storage_dir(&self, app_id: &str) -> io::Result<PathBuf> {
            Err(io::Error::new(io::ErrorKind::NotFound, app_id.to_string()))
        }
    }

    fn service(locator: Box<dyn StorageLocator>) -> LocalHttpService {
        LocalHttpService::new(locator, "com.example", InterceptorConfig::default())
    }

    #[test]
    fn test_user_agent_marker() {
        let svc = service(Box::new(NoStorage));
        let req = svc.on_request(HttpRequest::new("https://a").with_header("user-agent", "sdk/1"));
        assert_eq!(req.header(USER_AGENT), Some("sdk/1 Flutter Plugin"));
        assert_eq!(req.headers.len(), 1);

        let req = svc.on_request(HttpRequest::new("https://a"));
        assert_eq!(req.header(USER_AGENT), Some("Flutter Plugin"));
    }

    #[test]
    fn test_download_passthrough() {
        let svc = service(Box::new(NoStorage));
        let download = DownloadOptions {
            request: HttpRequest::new("https://local/offline.mbtiles"),
            local_path: PathBuf::from("/tmp/offline.mbtiles"),
        };
        assert_eq!(svc.on_download(download.clone()), download);
    }

    #[actix_rt::test]
    #[tracing_test::traced_test]
    async fn test_passthrough_without_storage() {
        let svc = service(Box::new(NoStorage));
        let response = HttpResponse::new(
            HttpRequest::new("https://local/style.json"),
            Err(HttpRequestError::new("unknown host local")),
        );
        assert_eq!(svc.on_response(response.clone()).await, response);
        assert!(svc.init().await.is_none());
        assert!(logs_contain("Local tiles are disabled"));
        assert!(logs_contain("com.example"));
    }

    #[actix_rt::test]
    async fn test_missing_directory_is_passthrough() {
        let svc = service(Box::new(FixedStorage(PathBuf::from(
            "/this/directory/does/not/exist",
        ))));
        assert!(svc.init().await.is_none());
    }
}
