//! WatchMode API response types for deserialization.
use serde::Deserialize;

/// Response of the `/search/` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct WatchModeSearch {
    #[serde(default)]
    pub title_results: Vec<WatchModeTitle>,
}

/// One title matched by a name search.
#[derive(Debug, Deserialize)]
pub(super) struct WatchModeTitle {
    pub id: u64,
    pub name: String,
}

/// One entry of `/title/{id}/sources/`.
#[derive(Debug, Deserialize)]
pub(super) struct WatchModeSource {
    pub name: String,
    /// "sub", "free", "rent", "buy", "addon", "tve", ...
    #[serde(rename = "type")]
    pub source_type: String,
    pub web_url: Option<String>,
    pub price: Option<f64>,
    /// Video quality, e.g. "HD" or "4K"
    pub format: Option<String>,
}
