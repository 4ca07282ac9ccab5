//! StreamScout - Find a playable embed source for a movie or episode
//!
//! This library resolves media references to embed URLs across an ordered
//! catalog of third-party providers, falling back through mirror domains and
//! providers whenever a source fails to load. Title metadata and licensed
//! streaming offers are available through gateway traits.

pub mod availability;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod media;
pub mod metadata_retrieval;
pub mod probe;
pub mod resolver;
pub mod share;

// Re-export error types
pub use availability::AvailabilityError;
pub use cache::CacheError;
pub use catalog::CatalogError;
pub use config::ConfigError;
pub use media::MediaRefError;
pub use metadata_retrieval::MetadataRetrievalError;
pub use resolver::ResolveError;
pub use share::ShareLinkError;

// Re-export the types most callers need
pub use catalog::{Endpoints, ProviderCatalog, ProviderSpec};
pub use config::Settings;
pub use media::{MediaKind, MediaRef};
pub use probe::{EmbedProbe, HttpProbe, LoadSignal};
pub use resolver::{
    AdvanceDecision, Player, ResolutionSession, ResolverOptions, SessionStatus, StreamResolver,
};

use thiserror::Error;
use url::Url;

/// Progress event emitted while searching for a playable source
///
/// These events allow library users to track progress and provide feedback
/// while providers are being tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A resolution session started
    SessionStarted { media: MediaRef, candidates: usize },

    /// A provider could not build a URL for this reference and was skipped
    ProviderDeclined { provider_id: String },

    /// Loading a source
    TryingSource {
        provider_id: String,
        mirror: usize,
        url: Url,
    },

    /// A source failed to load
    SourceFailed {
        provider_id: String,
        url: Url,
        reason: String,
    },

    /// Loading the same source again
    RetryingSource { provider_id: String },

    /// Moving to another mirror domain of the same provider
    SwitchingMirror { provider_id: String, mirror: usize },

    /// Moving to the next provider
    SwitchingProvider { provider_id: String },

    /// A source loaded
    SourceLoaded { provider_id: String, url: Url },

    /// Every provider failed
    Exhausted { attempts: usize },
}

/// One load performed while searching for a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAttempt {
    pub provider_id: String,
    pub mirror: usize,
    pub url: Url,
    /// Why the load failed, `None` if it succeeded
    pub failure: Option<String>,
}

/// Outcome of [`find_playable_source`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionReport {
    /// A source loaded
    Playable {
        provider_id: String,
        url: Url,
        attempts: Vec<SourceAttempt>,
    },

    /// No provider produced a playable source
    Exhausted { attempts: Vec<SourceAttempt> },
}

impl ResolutionReport {
    pub fn attempts(&self) -> &[SourceAttempt] {
        match self {
            ResolutionReport::Playable { attempts, .. } => attempts,
            ResolutionReport::Exhausted { attempts } => attempts,
        }
    }

    /// The playable URL, if any
    pub fn url(&self) -> Option<&Url> {
        match self {
            ResolutionReport::Playable { url, .. } => Some(url),
            ResolutionReport::Exhausted { .. } => None,
        }
    }
}

/// Top-level error type for StreamScout operations
#[derive(Debug, Error)]
pub enum StreamScoutError {
    /// Error in a media reference
    #[error("Invalid media reference: {0}")]
    Media(#[from] MediaRefError),

    /// Error building the provider catalog
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error starting a resolution session
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Error loading configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error during cache operations
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error during metadata retrieval
    #[error("Metadata retrieval error: {0}")]
    MetadataRetrieval(#[from] MetadataRetrievalError),

    /// Error during availability lookups
    #[error("Availability error: {0}")]
    Availability(#[from] AvailabilityError),

    /// Error parsing a share link
    #[error("Share link error: {0}")]
    ShareLink(#[from] ShareLinkError),

    /// Error setting up the HTTP probe
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Walks the provider catalog until a source for `media` loads
///
/// A [`Player`] session is opened for `media` and every URL it hands out is
/// loaded through `probe`. Load results are fed back into the session, which
/// decides whether to retry, switch mirror or switch provider, until a source
/// loads or every provider has failed.
///
/// Progress events are emitted through the provided callback, allowing library
/// users to track progress, display status, or remain silent.
///
/// # Arguments
///
/// * `resolver` - The resolver holding the provider catalog and options
/// * `media` - The movie or episode to play
/// * `preferred` - Optional provider id to try first (e.g. from a share link)
/// * `probe` - Performs the actual loads
/// * `progress_callback` - Closure called with progress events (can be empty for silent operation)
///
/// # Returns
///
/// A `ResolutionReport` with the playable URL, or `Exhausted` if no provider
/// delivered one. Exhaustion is not an error.
///
/// # Examples
///
/// ```no_run
/// use stream_scout::{
///     find_playable_source, HttpProbe, MediaRef, ProgressEvent, ProviderCatalog,
///     ResolverOptions, StreamResolver,
/// };
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let resolver = StreamResolver::new(
///     Arc::new(ProviderCatalog::builtin()),
///     ResolverOptions::default(),
/// );
/// let probe = HttpProbe::new(Duration::from_secs(10)).unwrap();
/// let media = MediaRef::tv_episode("1399", 1, 1).unwrap();
///
/// let report = find_playable_source(&resolver, media, None, &probe, |event| {
///     if let ProgressEvent::TryingSource { provider_id, url, .. } = event {
///         println!("Trying {provider_id}: {url}");
///     }
/// })
/// .unwrap();
///
/// if let Some(url) = report.url() {
///     println!("Playable: {url}");
/// }
/// ```
pub fn find_playable_source<P, F>(
    resolver: &StreamResolver,
    media: MediaRef,
    preferred: Option<&str>,
    probe: &P,
    mut progress_callback: F,
) -> Result<ResolutionReport, StreamScoutError>
where
    P: EmbedProbe + ?Sized,
    F: FnMut(ProgressEvent),
{
    let mut player = Player::new(resolver.clone());
    let token = match preferred {
        Some(provider_id) => player.open_preferring(media.clone(), provider_id)?,
        None => player.open(media.clone())?,
    };

    let candidates = player.session().map_or(0, |s| s.candidate_count());
    progress_callback(ProgressEvent::SessionStarted { media, candidates });

    let mut attempts = Vec::new();
    let mut declined_reported = 0;

    loop {
        let Some(session) = player.session() else {
            break;
        };

        for provider_id in &session.declined()[declined_reported..] {
            progress_callback(ProgressEvent::ProviderDeclined {
                provider_id: provider_id.clone(),
            });
        }
        declined_reported = session.declined().len();

        let (Some(url), Some(attempt)) = (player.current_url(token), session.attempt()) else {
            break;
        };
        let url = url.clone();
        let provider_id = attempt.provider_id.clone();
        let mirror = attempt.mirror;

        progress_callback(ProgressEvent::TryingSource {
            provider_id: provider_id.clone(),
            mirror,
            url: url.clone(),
        });

        match probe.load(&url) {
            LoadSignal::Loaded => {
                player.on_load(token);
                attempts.push(SourceAttempt {
                    provider_id: provider_id.clone(),
                    mirror,
                    url: url.clone(),
                    failure: None,
                });
                progress_callback(ProgressEvent::SourceLoaded {
                    provider_id: provider_id.clone(),
                    url: url.clone(),
                });
                return Ok(ResolutionReport::Playable {
                    provider_id,
                    url,
                    attempts,
                });
            }
            LoadSignal::Failed { reason } => {
                attempts.push(SourceAttempt {
                    provider_id: provider_id.clone(),
                    mirror,
                    url: url.clone(),
                    failure: Some(reason.clone()),
                });
                progress_callback(ProgressEvent::SourceFailed {
                    provider_id: provider_id.clone(),
                    url,
                    reason,
                });

                match player.on_error(token) {
                    AdvanceDecision::RetrySameEndpoint => {
                        progress_callback(ProgressEvent::RetryingSource { provider_id });
                    }
                    AdvanceDecision::NextMirror {
                        provider_id,
                        mirror,
                    } => {
                        progress_callback(ProgressEvent::SwitchingMirror {
                            provider_id,
                            mirror,
                        });
                    }
                    AdvanceDecision::NextProvider { provider_id } => {
                        progress_callback(ProgressEvent::SwitchingProvider { provider_id });
                    }
                    AdvanceDecision::AllProvidersExhausted => {}
                    AdvanceDecision::Ignored | AdvanceDecision::Stale => break,
                }
            }
        }
    }

    progress_callback(ProgressEvent::Exhausted {
        attempts: attempts.len(),
    });
    Ok(ResolutionReport::Exhausted { attempts })
}
