//! TMDB API response types for deserialization.
//!
//! These structures mirror the JSON response format of the TMDB v3 API.
use serde::Deserialize;

/// Movie or TV details from `/movie/{id}` or `/tv/{id}`.
///
/// Movies carry `title`/`release_date`, series carry `name`/`first_air_date`
/// and `seasons`.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbDetails {
    pub id: u64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub seasons: Vec<TmdbSeason>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbGenre {
    pub id: u32,
    pub name: String,
}

/// Response of `/genre/{kind}/list`.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeason {
    /// 0 is the "Specials" pseudo-season
    pub season_number: u32,
    #[serde(default)]
    pub episode_count: u32,
    pub name: Option<String>,
}

/// Response of `/{kind}/{id}/videos`.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbVideos {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbVideo {
    pub key: String,
    pub name: String,
    /// Hosting site, e.g. "YouTube"
    pub site: String,
    /// Video type, e.g. "Trailer" or "Teaser"
    #[serde(rename = "type")]
    pub video_type: String,
}

/// Paged listing returned by search, trending, top rated and discover.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbSearchPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub results: Vec<TmdbSearchResult>,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbSearchResult {
    pub id: u64,
    /// Only present on `/search/multi`; "movie", "tv" or "person"
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
}
