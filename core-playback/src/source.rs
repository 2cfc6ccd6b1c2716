//! # Media Source Factories
//!
//! The engine pulls bytes through a [`DataSourceFactory`]. The default
//! factory consults the [`CacheStore`] first and falls back to the host
//! [`HttpClient`] on a miss, writing the fetched range back into the cache.
//!
//! A `play()` carrying a bearer token gets its own factory with an
//! `Authorization` header attached to every upstream request. The shared
//! unauthenticated factory is never modified, so later calls without a token
//! go out without credentials.
//!
//! Cache failures never fail playback: a read error is treated as a miss and
//! a write error serves the fetched bytes uncached.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{DataSourceFactory, DataSpec, HttpClient, HttpRequest, MediaSource};
use bytes::Bytes;
use core_runtime::logging::redact_url;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheStore};

/// Cache-backed [`DataSourceFactory`], optionally authenticated.
#[derive(Clone)]
pub struct CacheDataSourceFactory {
    http: Arc<dyn HttpClient>,
    cache: CacheStore,
    bearer: Option<String>,
}

impl CacheDataSourceFactory {
    /// Unauthenticated factory shared by every session.
    pub fn new(http: Arc<dyn HttpClient>, cache: CacheStore) -> Self {
        Self {
            http,
            cache,
            bearer: None,
        }
    }

    /// Derive a factory that sends `Authorization: Bearer <token>`.
    pub fn with_bearer(&self, token: impl Into<String>) -> Self {
        Self {
            http: Arc::clone(&self.http),
            cache: self.cache.clone(),
            bearer: Some(token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer.is_some()
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    async fn fetch(&self, spec: &DataSpec) -> BridgeResult<Bytes> {
        let mut request = HttpRequest::get(spec.url.as_str()).range(spec.offset, spec.length);
        if let Some(token) = &self.bearer {
            request = request.bearer_token(token);
        }
        let response = self.http.execute(request).await?;
        let response = response.error_for_status(redact_url(&spec.url))?;
        Ok(response.body)
    }
}

#[async_trait]
impl DataSourceFactory for CacheDataSourceFactory {
    async fn open(&self, spec: DataSpec) -> BridgeResult<Bytes> {
        let key = CacheKey::from(&spec);
        match self.cache.get(&key).await {
            Ok(Some(bytes)) => {
                debug!(key = %key, "Serving range from cache");
                return Ok(bytes);
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed; fetching upstream"),
        }

        let body = self.fetch(&spec).await?;
        debug!(
            key = %key,
            bytes = body.len(),
            authenticated = self.is_authenticated(),
            "Fetched range upstream"
        );

        if let Err(e) = self.cache.put(key.clone(), body.clone()).await {
            warn!(key = %key, error = %e, "Cache write failed; serving uncached");
        }
        Ok(body)
    }
}

impl fmt::Debug for CacheDataSourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheDataSourceFactory")
            .field("cache", &self.cache)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// What to play. Built per `play()` call and never stored beyond the
/// session's replay slot.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub url: String,
    pub auth_token: Option<String>,
}

impl MediaRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Build the engine source, choosing the authenticated factory only when
    /// this request carries a token.
    pub fn to_source(&self, default_factory: &Arc<CacheDataSourceFactory>) -> MediaSource {
        let factory: Arc<dyn DataSourceFactory> = match &self.auth_token {
            Some(token) => Arc::new(default_factory.with_bearer(token.as_str())),
            None => Arc::clone(default_factory) as Arc<dyn DataSourceFactory>,
        };
        MediaSource::new(self.url.clone(), factory)
    }
}

impl fmt::Debug for MediaRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaRequest")
            .field("url", &redact_url(&self.url))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***REDACTED***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::StorageProbe;

    #[test]
    fn test_media_request_debug_hides_token() {
        let request = MediaRequest::new("http://h/a.mp4?sig=abc")
            .with_auth_token(Some("tok123".to_string()));
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("tok123"));
        assert!(!rendered.contains("sig=abc"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_empty_token_is_no_token() {
        let request = MediaRequest::new("http://h/a.mp4").with_auth_token(Some(String::new()));
        assert_eq!(request.auth_token, None);
    }

    struct NoHttp;

    #[async_trait]
    impl HttpClient for NoHttp {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<bridge_traits::HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable(request.url))
        }
    }

    struct Probe;

    impl StorageProbe for Probe {
        fn measure(&self, _path: &std::path::Path) -> BridgeResult<bridge_traits::StorageSpace> {
            Ok(bridge_traits::StorageSpace {
                usable_bytes: 0,
                total_bytes: 0,
            })
        }
    }

    #[tokio::test]
    async fn test_bearer_factory_is_derived_not_shared() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::open(crate::cache::CacheConfig::new(dir.path()), &Probe)
            .await
            .unwrap();
        let base = Arc::new(CacheDataSourceFactory::new(Arc::new(NoHttp), cache));

        let authed = base.with_bearer("tok");
        assert!(authed.is_authenticated());
        assert!(!base.is_authenticated());
        assert!(!format!("{:?}", authed).contains("tok\""));
    }
}
