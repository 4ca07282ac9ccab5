//! The per-playback resolution state machine.

use super::{AdvanceDecision, ResolverOptions, SignalOutcome};
use crate::catalog::ProviderSpec;
use crate::media::MediaRef;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of the live attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    Loaded,
    Failed,
}

/// Session-wide state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Waiting for the current URL to load
    Pending,
    /// The current URL loaded; no further automatic advancement
    Loaded,
    /// No provider produced a playable source
    Exhausted,
}

/// The one live attempt of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionAttempt {
    pub provider_id: String,
    /// Index into the provider's mirror list
    pub mirror: usize,
    pub url: Url,
    pub outcome: AttemptOutcome,
    /// Failed loads of this provider during the session
    pub failure_count: u32,
}

/// Resolution progress for one playback request
///
/// Created by [`StreamResolver::start_session`](super::StreamResolver::start_session).
/// The cursor into the filtered provider list only ever moves forward.
#[derive(Debug, Clone)]
pub struct ResolutionSession {
    media: MediaRef,
    providers: Vec<Arc<ProviderSpec>>,
    cursor: usize,
    attempt: Option<ResolutionAttempt>,
    endpoint_failures: u32,
    total_failures: u32,
    status: SessionStatus,
    declined: Vec<String>,
    max_retries: u32,
    subtitle_language: Option<String>,
    attempt_started: Instant,
}

impl ResolutionSession {
    pub(super) fn start(
        media: MediaRef,
        providers: Vec<Arc<ProviderSpec>>,
        options: &ResolverOptions,
    ) -> Self {
        let mut session = Self {
            media,
            providers,
            cursor: 0,
            attempt: None,
            endpoint_failures: 0,
            total_failures: 0,
            status: SessionStatus::Pending,
            declined: Vec::new(),
            max_retries: options.max_retries_per_provider.max(1),
            subtitle_language: options.subtitle_language.clone(),
            attempt_started: Instant::now(),
        };
        session.enter_provider(0);
        session
    }

    pub fn media(&self) -> &MediaRef {
        &self.media
    }

    /// Index of the current provider in the filtered list
    ///
    /// Equals `candidate_count()` once the session is exhausted.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of providers supporting this media kind
    pub fn candidate_count(&self) -> usize {
        self.providers.len()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn attempt(&self) -> Option<&ResolutionAttempt> {
        self.attempt.as_ref()
    }

    /// Ids of providers skipped because they could not build a URL
    pub fn declined(&self) -> &[String] {
        &self.declined
    }

    /// Failed loads across all providers in this session
    pub fn total_failures(&self) -> u32 {
        self.total_failures
    }

    pub fn current_provider(&self) -> Option<&Arc<ProviderSpec>> {
        self.providers.get(self.cursor)
    }

    /// URL the embedding surface should load, `None` once exhausted
    pub fn current_url(&self) -> Option<&Url> {
        match self.status {
            SessionStatus::Exhausted => None,
            _ => self.attempt.as_ref().map(|a| &a.url),
        }
    }

    /// Whether the current attempt has been pending for at least `timeout`
    pub fn is_stalled(&self, now: Instant, timeout: Duration) -> bool {
        self.status == SessionStatus::Pending
            && now.saturating_duration_since(self.attempt_started) >= timeout
    }

    /// The current URL loaded
    pub fn report_success(&mut self) -> SignalOutcome {
        if self.status != SessionStatus::Pending {
            debug!(status = ?self.status, "ignoring success signal on terminal session");
            return SignalOutcome::Ignored;
        }

        if let Some(attempt) = self.attempt.as_mut() {
            attempt.outcome = AttemptOutcome::Loaded;
            attempt.failure_count = 0;
            info!(provider = %attempt.provider_id, url = %attempt.url, "source loaded");
        }
        self.status = SessionStatus::Loaded;

        SignalOutcome::Applied
    }

    /// The current URL failed to load
    pub fn report_failure(&mut self) -> AdvanceDecision {
        if self.status != SessionStatus::Pending {
            debug!(status = ?self.status, "ignoring failure signal on terminal session");
            return AdvanceDecision::Ignored;
        }

        self.total_failures += 1;
        self.endpoint_failures += 1;
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.failure_count += 1;
        }

        if self.endpoint_failures < self.max_retries {
            debug!(failures = self.endpoint_failures, "retrying same endpoint");
            self.attempt_started = Instant::now();
            return AdvanceDecision::RetrySameEndpoint;
        }

        self.move_on()
    }

    /// A source that had loaded stopped playing
    ///
    /// Only meaningful for a loaded session; it moves on exactly like an
    /// exhausted endpoint would.
    pub fn report_interrupted(&mut self) -> AdvanceDecision {
        if self.status != SessionStatus::Loaded {
            return AdvanceDecision::Ignored;
        }

        self.status = SessionStatus::Pending;
        self.total_failures += 1;
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.failure_count += 1;
            warn!(provider = %attempt.provider_id, "playback interrupted");
        }

        self.move_on()
    }

    /// Next mirror of the current provider, or the next provider
    fn move_on(&mut self) -> AdvanceDecision {
        if let Some(decision) = self.next_mirror() {
            return decision;
        }

        if self.enter_provider(self.cursor + 1) {
            let provider_id = self
                .attempt
                .as_ref()
                .map(|a| a.provider_id.clone())
                .unwrap_or_default();
            debug!(provider = %provider_id, cursor = self.cursor, "advanced to next provider");
            AdvanceDecision::NextProvider { provider_id }
        } else {
            AdvanceDecision::AllProvidersExhausted
        }
    }

    fn next_mirror(&mut self) -> Option<AdvanceDecision> {
        let provider = self.providers.get(self.cursor)?.clone();
        let attempt = self.attempt.as_mut()?;

        let mirror = attempt.mirror + 1;
        if mirror >= provider.mirror_count() {
            return None;
        }
        let url = provider.url_for(&self.media, mirror, self.subtitle_language.as_deref())?;

        debug!(provider = provider.id(), mirror, url = %url, "switching mirror");
        attempt.mirror = mirror;
        attempt.url = url;
        attempt.outcome = AttemptOutcome::Pending;
        self.endpoint_failures = 0;
        self.attempt_started = Instant::now();

        Some(AdvanceDecision::NextMirror {
            provider_id: provider.id().to_string(),
            mirror,
        })
    }

    /// Positions the session at the first provider from `from` onwards that
    /// produces a URL. Returns false and exhausts the session if none does.
    fn enter_provider(&mut self, from: usize) -> bool {
        for index in from..self.providers.len() {
            let provider = &self.providers[index];
            match provider.url_for(&self.media, 0, self.subtitle_language.as_deref()) {
                Some(url) => {
                    self.cursor = index;
                    self.attempt = Some(ResolutionAttempt {
                        provider_id: provider.id().to_string(),
                        mirror: 0,
                        url,
                        outcome: AttemptOutcome::Pending,
                        failure_count: 0,
                    });
                    self.endpoint_failures = 0;
                    self.status = SessionStatus::Pending;
                    self.attempt_started = Instant::now();
                    return true;
                }
                None => {
                    debug!(provider = provider.id(), media = %self.media, "provider declined");
                    self.declined.push(provider.id().to_string());
                }
            }
        }

        self.cursor = self.providers.len();
        self.status = SessionStatus::Exhausted;
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.outcome = AttemptOutcome::Failed;
        }
        warn!(media = %self.media, failures = self.total_failures, "all providers exhausted");

        false
    }
}

#[cfg(test)]
mod tests {
    use super::super::{ResolverOptions, StreamResolver};
    use super::*;
    use crate::catalog::{Endpoints, ProviderCatalog};

    fn resolver_with(providers: Vec<ProviderSpec>, options: ResolverOptions) -> StreamResolver {
        StreamResolver::new(Arc::new(ProviderCatalog::new(providers).unwrap()), options)
    }

    fn resolver(providers: Vec<ProviderSpec>) -> StreamResolver {
        resolver_with(providers, ResolverOptions::default())
    }

    fn single(id: &str) -> ProviderSpec {
        ProviderSpec::new(id, id, Endpoints::Single(format!("{id}.example")))
            .with_movie("https://{domain}/movie/{id}")
            .with_tv("https://{domain}/tv/{id}/{season}/{episode}")
    }

    fn url(session: &ResolutionSession) -> Option<String> {
        session.current_url().map(|u| u.to_string())
    }

    #[test]
    fn test_mirror_then_provider_scenario() {
        let a = ProviderSpec::new(
            "a",
            "A",
            Endpoints::MultiMirror(vec!["a0.example".into(), "a1.example".into()]),
        )
        .with_movie("https://{domain}/embed?id={id}");
        let b = ProviderSpec::new("b", "B", Endpoints::Single("b.example".into()))
            .with_movie("https://{domain}/embed?id={id}");
        let resolver = resolver(vec![a, b]);

        let mut session = resolver.start_session(MediaRef::movie("42").unwrap()).unwrap();
        assert_eq!(session.cursor(), 0);
        assert_eq!(url(&session).as_deref(), Some("https://a0.example/embed?id=42"));

        assert_eq!(
            session.report_failure(),
            AdvanceDecision::NextMirror {
                provider_id: "a".to_string(),
                mirror: 1
            }
        );
        assert_eq!(session.cursor(), 0);
        assert_eq!(url(&session).as_deref(), Some("https://a1.example/embed?id=42"));

        assert_eq!(
            session.report_failure(),
            AdvanceDecision::NextProvider {
                provider_id: "b".to_string()
            }
        );
        assert_eq!(session.cursor(), 1);
        assert_eq!(url(&session).as_deref(), Some("https://b.example/embed?id=42"));
        assert_eq!(session.attempt().map(|a| a.failure_count), Some(0));

        assert_eq!(session.report_failure(), AdvanceDecision::AllProvidersExhausted);
        assert_eq!(session.status(), SessionStatus::Exhausted);
        assert_eq!(session.current_url(), None);
        assert_eq!(
            session.attempt().map(|a| a.outcome),
            Some(AttemptOutcome::Failed)
        );
    }

    #[test]
    fn test_exhausts_on_exactly_nth_failure() {
        let providers: Vec<_> = ["a", "b", "c", "d"].iter().map(|id| single(id)).collect();
        let n = providers.len();
        let resolver = resolver(providers);
        let mut session = resolver.start_session(MediaRef::movie("1").unwrap()).unwrap();

        for call in 1..=n {
            let decision = session.report_failure();
            if call < n {
                assert!(matches!(decision, AdvanceDecision::NextProvider { .. }));
            } else {
                assert_eq!(decision, AdvanceDecision::AllProvidersExhausted);
            }
        }
        assert_eq!(session.total_failures(), n as u32);
    }

    #[test]
    fn test_cursor_never_decreases() {
        let mirrored = ProviderSpec::new(
            "m",
            "M",
            Endpoints::MultiMirror(vec!["x.example".into(), "y.example".into(), "z.example".into()]),
        )
        .with_movie("https://{domain}/movie/{id}");
        let resolver = resolver(vec![mirrored, single("a"), single("b")]);
        let mut session = resolver.start_session(MediaRef::movie("1").unwrap()).unwrap();

        let mut previous = session.cursor();
        for _ in 0..10 {
            session.report_failure();
            assert!(session.cursor() >= previous);
            previous = session.cursor();
        }
        assert_eq!(session.status(), SessionStatus::Exhausted);
    }

    #[test]
    fn test_current_url_is_idempotent() {
        let resolver = resolver(vec![single("a"), single("b")]);
        let session = resolver.start_session(MediaRef::movie("9").unwrap()).unwrap();
        assert_eq!(session.current_url(), session.current_url());
        assert!(session.current_url().is_some());
    }

    #[test]
    fn test_declining_provider_is_skipped_without_failure() {
        let needs_episode = ProviderSpec::new("c", "C", Endpoints::Single("c.example".into()))
            .with_tv("https://{domain}/tv/{id}/{season}/{episode}");
        let series_page = ProviderSpec::new("s", "S", Endpoints::Single("s.example".into()))
            .with_tv("https://{domain}/tv/{id}");
        let resolver = resolver(vec![needs_episode, series_page]);

        let session = resolver.start_session(MediaRef::tv("7").unwrap()).unwrap();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.declined(), ["c".to_string()]);
        assert_eq!(session.total_failures(), 0);
        assert_eq!(url(&session).as_deref(), Some("https://s.example/tv/7"));
    }

    #[test]
    fn test_declined_provider_skipped_when_advancing() {
        let series_page = ProviderSpec::new("s", "S", Endpoints::Single("s.example".into()))
            .with_tv("https://{domain}/tv/{id}");
        let needs_episode = ProviderSpec::new("c", "C", Endpoints::Single("c.example".into()))
            .with_tv("https://{domain}/tv/{id}/{season}/{episode}");
        let resolver = resolver(vec![series_page, needs_episode]);

        let mut session = resolver.start_session(MediaRef::tv("7").unwrap()).unwrap();
        assert_eq!(session.report_failure(), AdvanceDecision::AllProvidersExhausted);
        assert_eq!(session.declined(), ["c".to_string()]);
    }

    #[test]
    fn test_all_declined_starts_exhausted() {
        let needs_episode = ProviderSpec::new("c", "C", Endpoints::Single("c.example".into()))
            .with_tv("https://{domain}/tv/{id}/{season}/{episode}");
        let resolver = resolver(vec![needs_episode]);

        let mut session = resolver.start_session(MediaRef::tv("7").unwrap()).unwrap();
        assert_eq!(session.status(), SessionStatus::Exhausted);
        assert_eq!(session.current_url(), None);
        assert_eq!(session.report_failure(), AdvanceDecision::Ignored);
    }

    #[test]
    fn test_tv_episode_url_embeds_season_and_episode() {
        let c = ProviderSpec::new("c", "C", Endpoints::Single("c.example".into()))
            .with_tv("https://{domain}/embed/tv?tmdb={id}&season={season}&episode={episode}");
        let resolver = resolver(vec![c]);

        let session = resolver
            .start_session(MediaRef::tv_episode("7", 1, 3).unwrap())
            .unwrap();
        let current = session.current_url().unwrap();
        let pairs: Vec<(String, String)> = current
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("season".to_string(), "1".to_string())));
        assert!(pairs.contains(&("episode".to_string(), "3".to_string())));
    }

    #[test]
    fn test_failure_after_success_is_ignored() {
        let resolver = resolver(vec![single("a"), single("b")]);
        let mut session = resolver.start_session(MediaRef::movie("1").unwrap()).unwrap();

        assert_eq!(session.report_success(), SignalOutcome::Applied);
        assert_eq!(session.status(), SessionStatus::Loaded);

        let before = url(&session);
        assert_eq!(session.report_failure(), AdvanceDecision::Ignored);
        assert_eq!(session.report_success(), SignalOutcome::Ignored);
        assert_eq!(url(&session), before);
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_success_resets_provider_failure_count() {
        let options = ResolverOptions {
            max_retries_per_provider: 3,
            ..ResolverOptions::default()
        };
        let resolver = resolver_with(vec![single("a")], options);
        let mut session = resolver.start_session(MediaRef::movie("1").unwrap()).unwrap();

        assert_eq!(session.report_failure(), AdvanceDecision::RetrySameEndpoint);
        assert_eq!(session.report_failure(), AdvanceDecision::RetrySameEndpoint);
        assert_eq!(session.attempt().map(|a| a.failure_count), Some(2));

        session.report_success();
        assert_eq!(session.attempt().map(|a| a.failure_count), Some(0));
        assert_eq!(
            session.attempt().map(|a| a.outcome),
            Some(AttemptOutcome::Loaded)
        );
    }

    #[test]
    fn test_retries_before_switching_mirror() {
        let mirrored = ProviderSpec::new(
            "m",
            "M",
            Endpoints::MultiMirror(vec!["x.example".into(), "y.example".into()]),
        )
        .with_movie("https://{domain}/movie/{id}");
        let options = ResolverOptions {
            max_retries_per_provider: 2,
            ..ResolverOptions::default()
        };
        let resolver = resolver_with(vec![mirrored], options);
        let mut session = resolver.start_session(MediaRef::movie("1").unwrap()).unwrap();

        assert_eq!(session.report_failure(), AdvanceDecision::RetrySameEndpoint);
        assert!(matches!(
            session.report_failure(),
            AdvanceDecision::NextMirror { mirror: 1, .. }
        ));
        assert_eq!(session.report_failure(), AdvanceDecision::RetrySameEndpoint);
        assert_eq!(session.report_failure(), AdvanceDecision::AllProvidersExhausted);
    }

    #[test]
    fn test_interrupted_playback_moves_on() {
        let resolver = resolver(vec![single("a"), single("b")]);
        let mut session = resolver.start_session(MediaRef::movie("1").unwrap()).unwrap();

        assert_eq!(session.report_interrupted(), AdvanceDecision::Ignored);
        session.report_success();
        assert_eq!(
            session.report_interrupted(),
            AdvanceDecision::NextProvider {
                provider_id: "b".to_string()
            }
        );
        assert_eq!(session.status(), SessionStatus::Pending);
    }

    #[test]
    fn test_stall_detection() {
        let resolver = resolver(vec![single("a")]);
        let mut session = resolver.start_session(MediaRef::movie("1").unwrap()).unwrap();
        let timeout = Duration::from_secs(10);

        assert!(!session.is_stalled(Instant::now(), timeout));
        assert!(session.is_stalled(Instant::now() + Duration::from_secs(11), timeout));

        session.report_success();
        assert!(!session.is_stalled(Instant::now() + Duration::from_secs(11), timeout));
    }
}
