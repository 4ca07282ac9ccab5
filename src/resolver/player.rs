//! Single-writer owner of a player's resolution session
//!
//! A player has at most one live session. Opening a new media reference
//! replaces the session and bumps a generation counter; load/error signals
//! carry the [`SessionToken`] they were issued for, and signals for an older
//! generation are dropped instead of being applied to the new session.
//!
//! Every mutating method takes `&mut self`. Hosts that deliver signals from
//! several threads must put the player behind a `Mutex`, since success and
//! failure signals do not commute.

use super::{AdvanceDecision, ResolutionSession, ResolveError, SignalOutcome, StreamResolver};
use crate::media::MediaRef;
use std::time::Instant;
use tracing::debug;
use ulid::Ulid;
use url::Url;

/// Identifies one session of one player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken {
    player: Ulid,
    generation: u64,
}

impl SessionToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// An open player and its current resolution session
#[derive(Debug)]
pub struct Player {
    id: Ulid,
    resolver: StreamResolver,
    generation: u64,
    session: Option<ResolutionSession>,
}

impl Player {
    pub fn new(resolver: StreamResolver) -> Self {
        Self {
            id: Ulid::new(),
            resolver,
            generation: 0,
            session: None,
        }
    }

    /// Starts resolving `media`, invalidating any previous session
    pub fn open(&mut self, media: MediaRef) -> Result<SessionToken, ResolveError> {
        let token = self.next_token();
        self.session = Some(self.resolver.start_session(media)?);
        Ok(token)
    }

    /// Like `open`, trying `provider_id` first
    pub fn open_preferring(
        &mut self,
        media: MediaRef,
        provider_id: &str,
    ) -> Result<SessionToken, ResolveError> {
        let token = self.next_token();
        self.session = Some(self.resolver.start_session_preferring(media, provider_id)?);
        Ok(token)
    }

    /// Drops the current session; outstanding tokens become stale
    pub fn close(&mut self) {
        self.next_token();
    }

    pub fn session(&self) -> Option<&ResolutionSession> {
        self.session.as_ref()
    }

    /// Token of the live session, if any
    pub fn current_token(&self) -> Option<SessionToken> {
        self.session.as_ref().map(|_| SessionToken {
            player: self.id,
            generation: self.generation,
        })
    }

    /// URL to load for `token`, `None` if stale or exhausted
    pub fn current_url(&self, token: SessionToken) -> Option<&Url> {
        self.live(token)?.current_url()
    }

    /// Load signal from the embedding surface
    pub fn on_load(&mut self, token: SessionToken) -> SignalOutcome {
        match self.live_mut(token) {
            Some(session) => session.report_success(),
            None => SignalOutcome::Stale,
        }
    }

    /// Error signal from the embedding surface
    pub fn on_error(&mut self, token: SessionToken) -> AdvanceDecision {
        match self.live_mut(token) {
            Some(session) => session.report_failure(),
            None => AdvanceDecision::Stale,
        }
    }

    /// A loaded source stopped playing
    pub fn on_interrupted(&mut self, token: SessionToken) -> AdvanceDecision {
        match self.live_mut(token) {
            Some(session) => session.report_interrupted(),
            None => AdvanceDecision::Stale,
        }
    }

    /// Fails the current attempt if it has been pending past the load timeout
    ///
    /// Embedding surfaces do not always signal an error for a hung load;
    /// hosts call this from a timer. Returns `None` when nothing expired.
    pub fn expire_stalled(&mut self, token: SessionToken, now: Instant) -> Option<AdvanceDecision> {
        let timeout = self.resolver.options().load_timeout;
        let session = self.live_mut(token)?;
        if !session.is_stalled(now, timeout) {
            return None;
        }

        debug!(timeout_secs = timeout.as_secs(), "load timed out");
        Some(session.report_failure())
    }

    fn next_token(&mut self) -> SessionToken {
        self.generation += 1;
        self.session = None;
        SessionToken {
            player: self.id,
            generation: self.generation,
        }
    }

    fn is_current(&self, token: SessionToken) -> bool {
        let current = token.player == self.id && token.generation == self.generation;
        if !current {
            debug!(
                token_generation = token.generation,
                generation = self.generation,
                "dropping stale signal"
            );
        }
        current
    }

    fn live(&self, token: SessionToken) -> Option<&ResolutionSession> {
        if !self.is_current(token) {
            return None;
        }
        self.session.as_ref()
    }

    fn live_mut(&mut self, token: SessionToken) -> Option<&mut ResolutionSession> {
        if !self.is_current(token) {
            return None;
        }
        self.session.as_mut()
    }
}
