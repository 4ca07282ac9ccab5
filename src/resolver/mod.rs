//! Stream resolution
//!
//! The resolver maps a [`MediaRef`] to a concrete embed URL and reacts to
//! load/error signals from whatever embeds that URL. It never performs I/O
//! itself: every operation is a synchronous state transition on a
//! [`ResolutionSession`].
//!
//! Fallback is two-level. A provider with several mirror domains has every
//! mirror tried before the session moves on to the next provider in catalog
//! order. Once the last provider fails the session is exhausted, which is an
//! expected end state rather than an error.
mod player;
mod session;

pub use player::{Player, SessionToken};
pub use session::{AttemptOutcome, ResolutionAttempt, ResolutionSession, SessionStatus};

use crate::catalog::ProviderCatalog;
use crate::media::{MediaKind, MediaRef};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Default number of failed loads an endpoint absorbs before moving on
pub const DEFAULT_MAX_RETRIES_PER_PROVIDER: u32 = 1;

/// Default time an attempt may stay pending before it counts as failed
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can prevent a resolution session from starting
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No provider in the catalog supports this kind of media
    #[error("No embed provider supports {kind} playback")]
    NoProviderAvailable { kind: MediaKind },
}

/// What the resolver decided after a failure signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceDecision {
    /// Reload the current URL
    RetrySameEndpoint,
    /// Same provider, next mirror domain
    NextMirror { provider_id: String, mirror: usize },
    /// Moved on to the next provider in catalog order
    NextProvider { provider_id: String },
    /// Every provider failed; no playable source was found
    AllProvidersExhausted,
    /// The session is already terminal; nothing changed
    Ignored,
    /// The signal belongs to a session that has since been replaced
    Stale,
}

impl AdvanceDecision {
    /// Whether the embedding surface should load `current_url` again
    pub fn should_load(&self) -> bool {
        matches!(
            self,
            AdvanceDecision::RetrySameEndpoint
                | AdvanceDecision::NextMirror { .. }
                | AdvanceDecision::NextProvider { .. }
        )
    }
}

/// Result of applying a success signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The session state changed
    Applied,
    /// The session is already terminal; nothing changed
    Ignored,
    /// The signal belongs to a session that has since been replaced
    Stale,
}

/// Tunables for the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Failed loads a single endpoint absorbs before the resolver moves on.
    /// `1` moves on after the first failure; `0` is treated as `1`.
    pub max_retries_per_provider: u32,
    /// Default subtitle language requested from providers that support it
    pub subtitle_language: Option<String>,
    /// Pending attempts older than this are failed by `Player::expire_stalled`
    pub load_timeout: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_retries_per_provider: DEFAULT_MAX_RETRIES_PER_PROVIDER,
            subtitle_language: None,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

/// One URL a session could try, as listed by [`StreamResolver::candidate_urls`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub provider_id: String,
    pub mirror: usize,
    /// `None` when the provider declines this reference
    pub url: Option<Url>,
}

/// Entry point for starting resolution sessions against a shared catalog
#[derive(Debug, Clone)]
pub struct StreamResolver {
    catalog: Arc<ProviderCatalog>,
    options: ResolverOptions,
}

impl StreamResolver {
    pub fn new(catalog: Arc<ProviderCatalog>, options: ResolverOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Starts a session at the most preferred provider supporting `media`
    ///
    /// Providers that decline the reference are skipped right away, so the
    /// session either points at a URL or is already exhausted.
    pub fn start_session(&self, media: MediaRef) -> Result<ResolutionSession, ResolveError> {
        let providers = self.catalog.supporting(media.kind());
        if providers.is_empty() {
            return Err(ResolveError::NoProviderAvailable { kind: media.kind() });
        }

        info!(media = %media, candidates = providers.len(), "starting resolution session");
        Ok(ResolutionSession::start(media, providers, &self.options))
    }

    /// Like `start_session`, but tries `provider_id` first when it supports the kind
    ///
    /// Unknown or unsupported provider ids fall back to plain catalog order.
    pub fn start_session_preferring(
        &self,
        media: MediaRef,
        provider_id: &str,
    ) -> Result<ResolutionSession, ResolveError> {
        let mut providers = self.catalog.supporting(media.kind());
        if providers.is_empty() {
            return Err(ResolveError::NoProviderAvailable { kind: media.kind() });
        }

        if let Some(pos) = providers.iter().position(|p| p.id() == provider_id) {
            let preferred = providers.remove(pos);
            providers.insert(0, preferred);
        }

        info!(
            media = %media,
            preferred = provider_id,
            candidates = providers.len(),
            "starting resolution session"
        );
        Ok(ResolutionSession::start(media, providers, &self.options))
    }

    /// Every URL a session for `media` could try, in the order it would try them
    pub fn candidate_urls(&self, media: &MediaRef) -> Vec<Candidate> {
        let subtitle = self.options.subtitle_language.as_deref();
        let mut candidates = Vec::new();

        for provider in self.catalog.supporting(media.kind()) {
            for mirror in 0..provider.mirror_count() {
                candidates.push(Candidate {
                    provider_id: provider.id().to_string(),
                    mirror,
                    url: provider.url_for(media, mirror, subtitle),
                });
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Endpoints, ProviderSpec};

    fn resolver(providers: Vec<ProviderSpec>) -> StreamResolver {
        let catalog = ProviderCatalog::new(providers).unwrap();
        StreamResolver::new(Arc::new(catalog), ResolverOptions::default())
    }

    fn single(id: &str) -> ProviderSpec {
        ProviderSpec::new(id, id, Endpoints::Single(format!("{id}.example")))
            .with_movie("https://{domain}/movie/{id}")
            .with_tv("https://{domain}/tv/{id}/{season}/{episode}")
    }

    #[test]
    fn test_movie_session_excludes_tv_only_providers() {
        let tv_only = ProviderSpec::new("tvonly", "TV", Endpoints::Single("tv.example".into()))
            .with_tv("https://{domain}/tv/{id}/{season}/{episode}");
        let resolver = resolver(vec![tv_only, single("a")]);

        let session = resolver.start_session(MediaRef::movie("42").unwrap()).unwrap();
        assert_eq!(session.candidate_count(), 1);
        assert_eq!(session.current_provider().map(|p| p.id()), Some("a"));
    }

    #[test]
    fn test_no_provider_available() {
        let movie_only = ProviderSpec::new("m", "M", Endpoints::Single("m.example".into()))
            .with_movie("https://{domain}/movie/{id}");
        let resolver = resolver(vec![movie_only]);

        let result = resolver.start_session(MediaRef::tv("7").unwrap());
        assert_eq!(
            result.unwrap_err(),
            ResolveError::NoProviderAvailable {
                kind: MediaKind::Tv
            }
        );
    }

    #[test]
    fn test_preferred_provider_goes_first() {
        let resolver = resolver(vec![single("a"), single("b"), single("c")]);
        let session = resolver
            .start_session_preferring(MediaRef::movie("42").unwrap(), "c")
            .unwrap();

        assert_eq!(session.current_provider().map(|p| p.id()), Some("c"));
        assert_eq!(session.candidate_count(), 3);
    }

    #[test]
    fn test_unknown_preferred_provider_keeps_order() {
        let resolver = resolver(vec![single("a"), single("b")]);
        let session = resolver
            .start_session_preferring(MediaRef::movie("42").unwrap(), "zzz")
            .unwrap();
        assert_eq!(session.current_provider().map(|p| p.id()), Some("a"));
    }

    #[test]
    fn test_preferred_provider_unsupported_kind_keeps_order() {
        let tv_only = ProviderSpec::new("t", "TV", Endpoints::Single("t.example".into()))
            .with_tv("https://{domain}/tv/{id}/{season}/{episode}");
        let resolver = resolver(vec![tv_only, single("a"), single("b")]);

        let session = resolver
            .start_session_preferring(MediaRef::movie("42").unwrap(), "t")
            .unwrap();
        assert_eq!(session.candidate_count(), 2);
        assert_eq!(session.current_provider().map(|p| p.id()), Some("a"));
        assert_eq!(
            session.current_url().map(Url::as_str),
            Some("https://a.example/movie/42")
        );
    }

    #[test]
    fn test_candidate_urls_lists_mirrors_in_order() {
        let mirrored = ProviderSpec::new(
            "m",
            "M",
            Endpoints::MultiMirror(vec!["one.example".into(), "two.example".into()]),
        )
        .with_movie("https://{domain}/movie/{id}");
        let resolver = resolver(vec![mirrored, single("b")]);

        let urls: Vec<String> = resolver
            .candidate_urls(&MediaRef::movie("42").unwrap())
            .into_iter()
            .filter_map(|c| c.url.map(|u| u.to_string()))
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://one.example/movie/42",
                "https://two.example/movie/42",
                "https://b.example/movie/42",
            ]
        );
    }

    #[test]
    fn test_should_load() {
        assert!(AdvanceDecision::RetrySameEndpoint.should_load());
        assert!(!AdvanceDecision::AllProvidersExhausted.should_load());
        assert!(!AdvanceDecision::Stale.should_load());
    }
}
