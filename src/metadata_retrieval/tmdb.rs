//! TMDB metadata gateway implementation.
use super::tmdb_types::{TmdbDetails, TmdbGenreList, TmdbSearchPage, TmdbVideos};
use super::{
    DiscoverFilters, Genre, MediaDetails, MediaPage, MetadataGateway, MetadataRetrievalError,
    SearchHit, SeasonSummary, Trailer,
};
use crate::media::{MediaKind, MediaRef};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Default metadata language
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Metadata gateway for the TMDB v3 API.
///
/// This gateway fetches title information from https://api.themoviedb.org
/// using an API key passed as a query parameter.
pub struct TmdbGateway {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbGateway {
    /// Creates a new TMDB gateway instance.
    pub fn new(api_key: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://api.themoviedb.org/3".to_string(),
            api_key: api_key.into(),
            language: language.unwrap_or(DEFAULT_LANGUAGE).to_string(),
        }
    }

    /// Builds the request URL; every segment is percent-encoded on its own.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, MetadataRetrievalError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| MetadataRetrievalError::RequestError(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Performs a GET against the endpoint made of `segments` and decodes the JSON body.
    fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
    ) -> Result<T, MetadataRetrievalError> {
        if self.api_key.is_empty() {
            return Err(MetadataRetrievalError::MissingApiKey);
        }

        let url = self.endpoint_url(segments)?;
        debug!(path = url.path(), "requesting TMDB");

        let response = self
            .client
            .get(url.clone())
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .query(params)
            .send()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        if response.status() == 404 {
            return Err(MetadataRetrievalError::NotFound(url.path().to_string()));
        }

        if !response.status().is_success() {
            return Err(MetadataRetrievalError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json()
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))
    }

    /// Fetches one page of a listing endpoint
    fn get_page(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
        kind: Option<MediaKind>,
        page: u32,
    ) -> Result<MediaPage, MetadataRetrievalError> {
        let page = page.max(1).to_string();
        let mut params = params.to_vec();
        params.push(("page", page.as_str()));

        let raw: TmdbSearchPage = self.get(segments, &params)?;
        Ok(Self::convert_search(raw, kind))
    }

    /// Query parameters for `/discover/{kind}`
    fn discover_params(filters: &DiscoverFilters) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sort_by", filters.sort_by.clone()),
            ("include_adult", "false".to_string()),
            ("include_video", "false".to_string()),
        ];
        if let Some(rating) = filters.min_rating {
            params.push(("vote_average.gte", rating.to_string()));
        }
        if !filters.genres.is_empty() {
            let genres: Vec<String> = filters.genres.iter().map(u32::to_string).collect();
            params.push(("with_genres", genres.join(",")));
        }
        if let Some(language) = filters.original_language.as_ref().filter(|l| !l.is_empty()) {
            params.push(("with_original_language", language.clone()));
        }
        params
    }

    /// Converts TMDB details to our internal MediaDetails structure.
    ///
    /// Drops the specials season and sorts the remaining seasons.
    fn convert_details(
        kind: MediaKind,
        details: TmdbDetails,
    ) -> Result<MediaDetails, MetadataRetrievalError> {
        let title = match kind {
            MediaKind::Movie => details.title.or(details.name),
            MediaKind::Tv => details.name.or(details.title),
        }
        .ok_or_else(|| MetadataRetrievalError::InvalidData("Title is missing".to_string()))?;

        let release_date = match kind {
            MediaKind::Movie => details.release_date,
            MediaKind::Tv => details.first_air_date,
        }
        .filter(|d| !d.is_empty());

        let mut seasons: Vec<SeasonSummary> = details
            .seasons
            .into_iter()
            .filter(|s| s.season_number > 0)
            .map(|s| SeasonSummary {
                season_number: s.season_number,
                episode_count: s.episode_count,
                name: s
                    .name
                    .unwrap_or_else(|| format!("Season {}", s.season_number)),
            })
            .collect();
        seasons.sort_by_key(|s| s.season_number);

        Ok(MediaDetails {
            kind,
            id: details.id.to_string(),
            title,
            overview: details.overview.unwrap_or_default(),
            poster_path: details.poster_path,
            release_date,
            genres: details.genres.into_iter().map(|g| g.name).collect(),
            seasons,
        })
    }

    /// Picks the first YouTube trailer, falling back to the first YouTube teaser.
    fn select_trailer(videos: TmdbVideos) -> Option<Trailer> {
        let youtube: Vec<_> = videos
            .results
            .into_iter()
            .filter(|v| v.site.eq_ignore_ascii_case("youtube"))
            .collect();

        ["Trailer", "Teaser"].iter().find_map(|wanted| {
            youtube
                .iter()
                .find(|v| v.video_type == *wanted)
                .map(|v| Trailer {
                    key: v.key.clone(),
                    name: v.name.clone(),
                })
        })
    }

    /// Converts a listing page, dropping people and untitled entries.
    fn convert_search(page: TmdbSearchPage, kind: Option<MediaKind>) -> MediaPage {
        let results = page
            .results
            .into_iter()
            .filter_map(|result| {
                let hit_kind = match (kind, result.media_type.as_deref()) {
                    (Some(kind), _) => kind,
                    (None, Some("movie")) => MediaKind::Movie,
                    (None, Some("tv")) => MediaKind::Tv,
                    _ => return None,
                };
                let (title, release_date) = match hit_kind {
                    MediaKind::Movie => (result.title.or(result.name), result.release_date),
                    MediaKind::Tv => (result.name.or(result.title), result.first_air_date),
                };

                Some(SearchHit {
                    kind: hit_kind,
                    id: result.id.to_string(),
                    title: title?,
                    release_date: release_date.filter(|d| !d.is_empty()),
                })
            })
            .collect();

        MediaPage {
            page: page.page,
            total_pages: page.total_pages.max(page.page),
            results,
        }
    }
}

impl MetadataGateway for TmdbGateway {
    fn fetch_details(&self, media: &MediaRef) -> Result<MediaDetails, MetadataRetrievalError> {
        let details: TmdbDetails =
            self.get(&[media.kind().as_str(), media.external_id()], &[])?;
        Self::convert_details(media.kind(), details)
    }

    fn fetch_trailer(&self, media: &MediaRef) -> Result<Option<Trailer>, MetadataRetrievalError> {
        let videos: TmdbVideos =
            self.get(&[media.kind().as_str(), media.external_id(), "videos"], &[])?;
        Ok(Self::select_trailer(videos))
    }

    fn search(
        &self,
        query: &str,
        kind: Option<MediaKind>,
        page: u32,
    ) -> Result<MediaPage, MetadataRetrievalError> {
        let target = kind.map_or("multi", |k| k.as_str());
        self.get_page(&["search", target], &[("query", query)], kind, page)
    }

    fn trending(&self, kind: MediaKind, page: u32) -> Result<MediaPage, MetadataRetrievalError> {
        self.get_page(&["trending", kind.as_str(), "week"], &[], Some(kind), page)
    }

    fn top_rated(&self, kind: MediaKind, page: u32) -> Result<MediaPage, MetadataRetrievalError> {
        self.get_page(&[kind.as_str(), "top_rated"], &[], Some(kind), page)
    }

    fn genres(&self, kind: MediaKind) -> Result<Vec<Genre>, MetadataRetrievalError> {
        let list: TmdbGenreList = self.get(&["genre", kind.as_str(), "list"], &[])?;
        Ok(list
            .genres
            .into_iter()
            .map(|g| Genre {
                id: g.id,
                name: g.name,
            })
            .collect())
    }

    fn discover(
        &self,
        kind: MediaKind,
        filters: &DiscoverFilters,
        page: u32,
    ) -> Result<MediaPage, MetadataRetrievalError> {
        let owned = Self::discover_params(filters);
        let params: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.get_page(&["discover", kind.as_str()], &params, Some(kind), page)
    }
}
