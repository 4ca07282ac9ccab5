//! Media identifiers
//!
//! A [`MediaRef`] is the canonical address of a movie or TV episode across
//! every gateway in this crate: the resolver, TMDB and WatchMode all consume it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while constructing a media reference
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaRefError {
    /// The external id was empty
    #[error("External id must not be empty")]
    EmptyId,

    /// Unknown media kind string
    #[error("Unknown media kind '{0}', expected 'movie' or 'tv'")]
    UnknownKind(String),

    /// Season or episode given for a movie
    #[error("Movies do not have seasons or episodes")]
    EpisodeOnMovie,

    /// Season and episode must be given together
    #[error("Season and episode must be given together")]
    IncompleteEpisode,

    /// Season or episode number was zero
    #[error("Season and episode numbers start at 1")]
    ZeroNumber,
}

/// The two kinds of media the catalog knows how to embed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A feature film
    Movie,
    /// A TV series
    Tv,
}

impl MediaKind {
    /// Path segment used by TMDB and by share links
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = MediaRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            other => Err(MediaRefError::UnknownKind(other.to_string())),
        }
    }
}

/// Immutable reference to a movie, a TV series or a single TV episode
///
/// A `Tv` reference without season and episode is valid: it asks the caller
/// to let the user pick an episode rather than asking the resolver to guess.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef {
    kind: MediaKind,
    external_id: String,
    season: Option<u32>,
    episode: Option<u32>,
}

impl MediaRef {
    /// Builds a validated media reference
    pub fn new(
        kind: MediaKind,
        external_id: impl Into<String>,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Result<Self, MediaRefError> {
        let external_id = external_id.into().trim().to_string();
        if external_id.is_empty() {
            return Err(MediaRefError::EmptyId);
        }

        match (kind, season, episode) {
            (MediaKind::Movie, None, None) => {}
            (MediaKind::Movie, _, _) => return Err(MediaRefError::EpisodeOnMovie),
            (MediaKind::Tv, None, None) => {}
            (MediaKind::Tv, Some(s), Some(e)) => {
                if s == 0 || e == 0 {
                    return Err(MediaRefError::ZeroNumber);
                }
            }
            (MediaKind::Tv, _, _) => return Err(MediaRefError::IncompleteEpisode),
        }

        Ok(Self {
            kind,
            external_id,
            season,
            episode,
        })
    }

    /// A movie reference
    pub fn movie(external_id: impl Into<String>) -> Result<Self, MediaRefError> {
        Self::new(MediaKind::Movie, external_id, None, None)
    }

    /// A TV series reference without a specific episode
    pub fn tv(external_id: impl Into<String>) -> Result<Self, MediaRefError> {
        Self::new(MediaKind::Tv, external_id, None, None)
    }

    /// A specific TV episode
    pub fn tv_episode(
        external_id: impl Into<String>,
        season: u32,
        episode: u32,
    ) -> Result<Self, MediaRefError> {
        Self::new(MediaKind::Tv, external_id, Some(season), Some(episode))
    }

    /// Returns a copy of this series reference pointing at the given episode
    pub fn with_episode(&self, season: u32, episode: u32) -> Result<Self, MediaRefError> {
        Self::new(self.kind, self.external_id.clone(), Some(season), Some(episode))
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn season(&self) -> Option<u32> {
        self.season
    }

    pub fn episode(&self) -> Option<u32> {
        self.episode
    }

    /// True for TV references that still need an episode picked
    pub fn needs_episode_pick(&self) -> bool {
        self.kind == MediaKind::Tv && self.episode.is_none()
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => write!(f, "{}:{} S{:02}E{:02}", self.kind, self.external_id, s, e),
            _ => write!(f, "{}:{}", self.kind, self.external_id),
        }
    }
}
