//! WatchMode availability gateway implementation.
use super::watchmode_types::{WatchModeSearch, WatchModeSource, WatchModeTitle};
use super::{AvailabilityError, AvailabilityGateway, OfferType, StreamingOffer};
use crate::media::MediaKind;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Availability gateway for the WatchMode v1 API.
///
/// A lookup is two requests: a name search to find the WatchMode title id,
/// then the source listing for that id.
pub struct WatchModeGateway {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl WatchModeGateway {
    /// Creates a new WatchMode gateway instance.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://api.watchmode.com/v1".to_string(),
            api_key: api_key.into(),
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, AvailabilityError> {
        if self.api_key.is_empty() {
            return Err(AvailabilityError::MissingApiKey);
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint, "requesting WatchMode");

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(params)
            .send()
            .map_err(|e| AvailabilityError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AvailabilityError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json()
            .map_err(|e| AvailabilityError::ParseError(e.to_string()))
    }

    /// Search type filter for a media kind
    fn search_type(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv_series",
        }
    }

    /// Prefers an exact (case-insensitive) name match, else the first result
    fn best_match<'a>(title: &str, results: &'a [WatchModeTitle]) -> Option<&'a WatchModeTitle> {
        results
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(title.trim()))
            .or_else(|| results.first())
    }

    /// Keeps the listable offer types and entries that link somewhere
    fn convert_sources(sources: Vec<WatchModeSource>) -> Vec<StreamingOffer> {
        sources
            .into_iter()
            .filter_map(|source| {
                let offer_type = OfferType::from_code(&source.source_type)?;
                let url = source.web_url.filter(|u| !u.is_empty())?;
                Some(StreamingOffer {
                    service_name: source.name,
                    url,
                    offer_type,
                    price: source.price,
                    format: source.format,
                })
            })
            .collect()
    }
}

impl AvailabilityGateway for WatchModeGateway {
    fn find_offers(
        &self,
        title: &str,
        kind: MediaKind,
    ) -> Result<Vec<StreamingOffer>, AvailabilityError> {
        let search: WatchModeSearch = self.get(
            "search/",
            &[
                ("search_field", "name"),
                ("search_value", title),
                ("types", Self::search_type(kind)),
            ],
        )?;

        let found = Self::best_match(title, &search.title_results)
            .ok_or_else(|| AvailabilityError::TitleNotFound(title.to_string()))?;

        let sources: Vec<WatchModeSource> =
            self.get(&format!("title/{}/sources/", found.id), &[])?;

        Ok(Self::convert_sources(sources))
    }
}
