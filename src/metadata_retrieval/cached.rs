//! Cached metadata gateway implementation
//!
//! This module provides a caching wrapper for metadata gateways that
//! automatically stores and retrieves title details from a local cache.

use super::{
    DiscoverFilters, Genre, MediaDetails, MediaPage, MetadataGateway, MetadataRetrievalError,
    Trailer,
};
use crate::cache::CacheStorage;
use crate::media::{MediaKind, MediaRef};
use tracing::{debug, warn};

/// A caching wrapper for metadata gateways
///
/// Title details are cached per kind and id; trailers and listings always go
/// to the wrapped gateway. The cache is persistent across runs.
pub struct CachedMetadataGateway<G>
where
    G: MetadataGateway,
{
    /// The underlying metadata gateway
    gateway: G,
    /// Cache storage for title details
    cache: CacheStorage<MediaDetails>,
}

impl<G> CachedMetadataGateway<G>
where
    G: MetadataGateway,
{
    /// Creates a new cached metadata gateway wrapping the given gateway
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let tmdb = TmdbGateway::new(api_key, None);
    /// let cache = CacheStorage::open("metadata", Some(Duration::from_secs(24 * 60 * 60)))?;
    /// let cached = CachedMetadataGateway::new(tmdb, cache);
    /// ```
    pub fn new(gateway: G, cache: CacheStorage<MediaDetails>) -> Self {
        Self { gateway, cache }
    }

    /// Cache key for a title; season and episode do not matter for details
    fn cache_key(media: &MediaRef) -> String {
        format!("{}_{}", media.kind(), media.external_id())
    }
}

impl<G> MetadataGateway for CachedMetadataGateway<G>
where
    G: MetadataGateway,
{
    fn fetch_details(&self, media: &MediaRef) -> Result<MediaDetails, MetadataRetrievalError> {
        let cache_key = Self::cache_key(media);

        match self.cache.load(&cache_key) {
            Ok(Some(details)) => {
                debug!(key = %cache_key, "metadata cache hit");
                return Ok(details);
            }
            Ok(None) => {}
            Err(e) => {
                // Cache failures must not prevent metadata retrieval
                warn!(key = %cache_key, error = %e, "metadata cache read failed");
            }
        }

        let details = self.gateway.fetch_details(media)?;

        if let Err(e) = self.cache.store(&cache_key, &details) {
            warn!(key = %cache_key, error = %e, "metadata cache write failed");
        }

        Ok(details)
    }

    fn fetch_trailer(&self, media: &MediaRef) -> Result<Option<Trailer>, MetadataRetrievalError> {
        self.gateway.fetch_trailer(media)
    }

    fn search(
        &self,
        query: &str,
        kind: Option<MediaKind>,
        page: u32,
    ) -> Result<MediaPage, MetadataRetrievalError> {
        self.gateway.search(query, kind, page)
    }

    fn trending(&self, kind: MediaKind, page: u32) -> Result<MediaPage, MetadataRetrievalError> {
        self.gateway.trending(kind, page)
    }

    fn top_rated(&self, kind: MediaKind, page: u32) -> Result<MediaPage, MetadataRetrievalError> {
        self.gateway.top_rated(kind, page)
    }

    fn genres(&self, kind: MediaKind) -> Result<Vec<Genre>, MetadataRetrievalError> {
        self.gateway.genres(kind)
    }

    fn discover(
        &self,
        kind: MediaKind,
        filters: &DiscoverFilters,
        page: u32,
    ) -> Result<MediaPage, MetadataRetrievalError> {
        self.gateway.discover(kind, filters, page)
    }
}
