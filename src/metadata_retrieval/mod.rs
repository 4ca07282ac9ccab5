//! Data structures and traits for movie and TV metadata retrieval.
//!
//! This module provides structures to represent title details, seasons,
//! trailers and search hits, as well as the trait metadata gateways implement.
//! The resolver never calls a gateway; callers use it to show what is being
//! played and to let users pick an episode.
mod cached;
mod tmdb;
mod tmdb_types;

pub use cached::CachedMetadataGateway;
pub use tmdb::TmdbGateway;

use crate::media::{MediaKind, MediaRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base URL for poster images
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// No API key was configured
    #[error("No TMDB API key configured")]
    MissingApiKey,

    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The requested title was not found
    #[error("Title not found: {0}")]
    NotFound(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),
}

/// Season of a TV series as listed in its details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonSummary {
    /// The season number (never 0; specials are dropped)
    pub season_number: u32,
    /// Number of episodes in the season
    pub episode_count: u32,
    /// Season title, e.g. "Season 1"
    pub name: String,
}

/// Title details for a movie or TV series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    pub kind: MediaKind,
    /// The external (TMDB) id
    pub id: String,
    pub title: String,
    pub overview: String,
    /// Relative artwork path; combine with [`IMAGE_BASE_URL`]
    pub poster_path: Option<String>,
    /// Release date for movies, first air date for series
    pub release_date: Option<String>,
    pub genres: Vec<String>,
    /// Regular seasons in ascending order (empty for movies)
    pub seasons: Vec<SeasonSummary>,
}

impl MediaDetails {
    /// Absolute poster URL, if the title has artwork
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path
            .as_ref()
            .map(|path| format!("{}{}", IMAGE_BASE_URL, path))
    }

    pub fn season(&self, season_number: u32) -> Option<&SeasonSummary> {
        self.seasons
            .iter()
            .find(|s| s.season_number == season_number)
    }

    /// Chooses the episode to play for a series
    ///
    /// A requested season is used if the series has it, otherwise the first
    /// season's episode 1. A requested episode is used if it lies within the
    /// requested season, otherwise episode 1. Series without season data fall
    /// back to S1E1. Returns `None` for movies.
    pub fn pick_episode(&self, season: Option<u32>, episode: Option<u32>) -> Option<(u32, u32)> {
        if self.kind != MediaKind::Tv {
            return None;
        }

        let Some(first) = self.seasons.first() else {
            return Some((1, 1));
        };

        let Some(chosen) = season.and_then(|s| self.season(s)) else {
            return Some((first.season_number, 1));
        };
        let episode = episode
            .filter(|e| *e >= 1 && *e <= chosen.episode_count)
            .unwrap_or(1);

        Some((chosen.season_number, episode))
    }
}

/// A trailer hosted on YouTube
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    /// YouTube video key
    pub key: String,
    pub name: String,
}

impl Trailer {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.key)
    }
}

/// A movie or series found by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub kind: MediaKind,
    pub id: String,
    pub title: String,
    pub release_date: Option<String>,
}

impl SearchHit {
    /// Media reference for this hit (series without a picked episode)
    pub fn media_ref(&self) -> Option<MediaRef> {
        MediaRef::new(self.kind, self.id.clone(), None, None).ok()
    }
}

/// One page of a title listing (search, trending, top rated, discover)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPage {
    /// 1-based page number
    pub page: u32,
    pub total_pages: u32,
    pub results: Vec<SearchHit>,
}

impl MediaPage {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// A genre as used by discover filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// Default discover ordering
pub const DEFAULT_SORT: &str = "popularity.desc";

/// Filters for [`MetadataGateway::discover`]
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverFilters {
    /// Genre ids that must all match
    pub genres: Vec<u32>,
    /// Minimum average vote (0-10)
    pub min_rating: Option<f64>,
    /// Original language as ISO 639-1 code, e.g. "ko"
    pub original_language: Option<String>,
    /// Sort order such as "popularity.desc" or "vote_average.desc"
    pub sort_by: String,
}

impl Default for DiscoverFilters {
    fn default() -> Self {
        Self {
            genres: Vec::new(),
            min_rating: None,
            original_language: None,
            sort_by: DEFAULT_SORT.to_string(),
        }
    }
}

/// Trait for gateways that can fetch movie and TV metadata.
///
/// Implementors of this trait can retrieve title metadata from sources such
/// as TMDB.
pub trait MetadataGateway {
    /// Fetches details for the title a reference points at.
    ///
    /// Season and episode of the reference are ignored; series details always
    /// cover all seasons.
    fn fetch_details(&self, media: &MediaRef) -> Result<MediaDetails, MetadataRetrievalError>;

    /// Fetches the preferred trailer, if the title has one.
    fn fetch_trailer(&self, media: &MediaRef) -> Result<Option<Trailer>, MetadataRetrievalError>;

    /// Searches titles by name, optionally restricted to one kind.
    fn search(
        &self,
        query: &str,
        kind: Option<MediaKind>,
        page: u32,
    ) -> Result<MediaPage, MetadataRetrievalError>;

    /// Titles trending this week.
    fn trending(&self, kind: MediaKind, page: u32) -> Result<MediaPage, MetadataRetrievalError>;

    /// Highest rated titles.
    fn top_rated(&self, kind: MediaKind, page: u32) -> Result<MediaPage, MetadataRetrievalError>;

    /// Genres available for a kind.
    fn genres(&self, kind: MediaKind) -> Result<Vec<Genre>, MetadataRetrievalError>;

    /// Titles matching the given filters.
    fn discover(
        &self,
        kind: MediaKind,
        filters: &DiscoverFilters,
        page: u32,
    ) -> Result<MediaPage, MetadataRetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(seasons: &[(u32, u32)]) -> MediaDetails {
        MediaDetails {
            kind: MediaKind::Tv,
            id: "7".to_string(),
            title: "Some Show".to_string(),
            overview: String::new(),
            poster_path: Some("/poster.jpg".to_string()),
            release_date: None,
            genres: Vec::new(),
            seasons: seasons
                .iter()
                .map(|(number, count)| SeasonSummary {
                    season_number: *number,
                    episode_count: *count,
                    name: format!("Season {number}"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_pick_requested_episode() {
        let details = series(&[(1, 10), (2, 8)]);
        assert_eq!(details.pick_episode(Some(2), Some(5)), Some((2, 5)));
    }

    #[test]
    fn test_pick_falls_back_to_first_season() {
        let details = series(&[(1, 10), (2, 8)]);
        assert_eq!(details.pick_episode(Some(9), Some(5)), Some((1, 1)));
        assert_eq!(details.pick_episode(None, Some(3)), Some((1, 1)));
        assert_eq!(details.pick_episode(None, None), Some((1, 1)));
    }

    #[test]
    fn test_pick_clamps_out_of_range_episode() {
        let details = series(&[(1, 10), (2, 8)]);
        assert_eq!(details.pick_episode(Some(2), Some(9)), Some((2, 1)));
        assert_eq!(details.pick_episode(Some(2), Some(0)), Some((2, 1)));
    }

    #[test]
    fn test_pick_without_season_data() {
        assert_eq!(series(&[]).pick_episode(Some(3), Some(3)), Some((1, 1)));
    }

    #[test]
    fn test_pick_for_movie_is_none() {
        let mut movie = series(&[]);
        movie.kind = MediaKind::Movie;
        assert_eq!(movie.pick_episode(None, None), None);
    }

    #[test]
    fn test_media_page_has_next() {
        let page = MediaPage {
            page: 1,
            total_pages: 3,
            results: Vec::new(),
        };
        assert!(page.has_next());
        assert!(!MediaPage { page: 3, ..page }.has_next());
    }

    #[test]
    fn test_poster_and_trailer_urls() {
        assert_eq!(
            series(&[]).poster_url().as_deref(),
            Some("https://image.tmdb.org/t/p/w500/poster.jpg")
        );
        let trailer = Trailer {
            key: "abc123".to_string(),
            name: "Official Trailer".to_string(),
        };
        assert_eq!(trailer.watch_url(), "https://www.youtube.com/watch?v=abc123");
    }
}
