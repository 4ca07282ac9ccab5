//! URL templates for embed providers
//!
//! Templates are plain strings with placeholders:
//! - `{domain}` - the mirror domain currently being tried
//! - `{id}` - the external (TMDB) id
//! - `{season}` or `{season:NN}` - season number with optional zero-padding
//! - `{episode}` or `{episode:NN}` - episode number with optional zero-padding

use crate::media::MediaRef;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// A provider-specific URL template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether rendering this template requires a season and episode
    pub fn needs_episode(&self) -> bool {
        self.0.contains("{season") || self.0.contains("{episode")
    }

    /// Renders the template for one domain and media reference
    ///
    /// Returns `None` when the template asks for a season or episode that the
    /// reference does not carry. That is a provider declining, not an error.
    pub fn render(&self, domain: &str, media: &MediaRef) -> Option<String> {
        let id: String = form_urlencoded::byte_serialize(media.external_id().as_bytes()).collect();

        let mut result = self.0.replace("{domain}", domain);
        result = result.replace("{id}", &id);

        if let (Some(season), Some(episode)) = (media.season(), media.episode()) {
            result = replace_with_padding(&result, "season", season);
            result = replace_with_padding(&result, "episode", episode);
        }

        if result.contains("{season") || result.contains("{episode") {
            return None;
        }

        Some(result)
    }
}

/// Replaces `{name}` and `{name:NN}` placeholders with `value`
///
/// Placeholders with an unparseable width are left untouched.
fn replace_with_padding(text: &str, name: &str, value: u32) -> String {
    let mut result = String::with_capacity(text.len());
    let padded_start = format!("{{{name}:");
    let simple = format!("{{{name}}}");

    let mut rest = text;
    while let Some(start) = rest.find('{') {
        result.push_str(&rest[..start]);
        let candidate = &rest[start..];

        if candidate.starts_with(&simple) {
            result.push_str(&value.to_string());
            rest = &candidate[simple.len()..];
            continue;
        }

        if candidate.starts_with(&padded_start) {
            if let Some(end) = candidate.find('}') {
                let width_str = &candidate[padded_start.len()..end];
                if let Ok(width) = width_str.parse::<usize>() {
                    result.push_str(&format!("{:0width$}", value, width = width));
                    rest = &candidate[end + 1..];
                    continue;
                }
            }
        }

        result.push('{');
        rest = &candidate[1..];
    }
    result.push_str(rest);

    result
}
