//! Share links
//!
//! Builds and parses the web app's routes so a playback target can be passed
//! around as a link:
//! - `/movie/{id}`
//! - `/tv/{id}`
//! - `/tv/{id}/season/{season}/episode/{episode}`
//!
//! Each optionally followed by `?source=<provider id>`.

use crate::media::{MediaKind, MediaRef, MediaRefError};
use thiserror::Error;
use url::Url;

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";

/// Errors that can occur while parsing a share link
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareLinkError {
    /// The input is neither an absolute URL nor a path
    #[error("Not a valid link: {0}")]
    InvalidUrl(String),

    /// The path does not match any known route
    #[error("Unrecognized route: {0}")]
    UnrecognizedRoute(String),

    /// A season or episode segment is not a number
    #[error("Invalid number in link: {0}")]
    InvalidNumber(String),

    /// The route describes an invalid media reference
    #[error(transparent)]
    Media(#[from] MediaRefError),
}

/// A playback target decoded from a share link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedTarget {
    pub media: MediaRef,
    /// Preferred provider id from `?source=`
    pub source: Option<String>,
}

/// Builds a share link for `media` below `base`
pub fn share_link(base: &Url, media: &MediaRef, source: Option<&str>) -> Url {
    let id = urlencoding::encode(media.external_id());
    let route = match (media.kind(), media.season(), media.episode()) {
        (MediaKind::Tv, Some(season), Some(episode)) => {
            format!("/tv/{id}/season/{season}/episode/{episode}")
        }
        (kind, _, _) => format!("/{kind}/{id}"),
    };

    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{prefix}{route}"));
    url.set_query(None);
    url.set_fragment(None);

    if let Some(source) = source.filter(|s| !s.is_empty()) {
        url.query_pairs_mut().append_pair("source", source);
    }

    url
}

/// Parses a share link given as an absolute URL or a bare path
pub fn parse_share_link(link: &str) -> Result<SharedTarget, ShareLinkError> {
    let link = link.trim();
    let url = if link.starts_with('/') {
        Url::parse("http://localhost")
            .and_then(|base| base.join(link))
            .map_err(|_| ShareLinkError::InvalidUrl(link.to_string()))?
    } else {
        Url::parse(link).map_err(|_| ShareLinkError::InvalidUrl(link.to_string()))?
    };

    let segments = url
        .path_segments()
        .map(|s| {
            s.filter(|seg| !seg.is_empty())
                .map(|seg| decode_segment(seg, link))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    // Links may live below a path prefix; the route starts at the kind segment
    let start = segments
        .iter()
        .position(|s| s == "movie" || s == "tv")
        .ok_or_else(|| ShareLinkError::UnrecognizedRoute(url.path().to_string()))?;
    let route: Vec<&str> = segments[start..].iter().map(String::as_str).collect();

    let media = match route.as_slice() {
        ["movie", id] => MediaRef::movie(*id)?,
        ["tv", id] => MediaRef::tv(*id)?,
        ["tv", id, "season", season, "episode", episode] => {
            MediaRef::tv_episode(*id, parse_number(season)?, parse_number(episode)?)?
        }
        _ => return Err(ShareLinkError::UnrecognizedRoute(url.path().to_string())),
    };

    let source = url
        .query_pairs()
        .find(|(key, _)| key == "source")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty());

    Ok(SharedTarget { media, source })
}

/// Percent-decodes one path segment; `+`, `&` and `=` are kept literally
fn decode_segment(segment: &str, link: &str) -> Result<String, ShareLinkError> {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ShareLinkError::InvalidUrl(link.to_string()))
}

fn parse_number(segment: &str) -> Result<u32, ShareLinkError> {
    segment
        .parse()
        .map_err(|_| ShareLinkError::InvalidNumber(segment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://watch.example").unwrap()
    }

    #[test]
    fn test_episode_link() {
        let media = MediaRef::tv_episode("1399", 2, 5).unwrap();
        let link = share_link(&base(), &media, Some("vidsrc"));
        assert_eq!(
            link.as_str(),
            "https://watch.example/tv/1399/season/2/episode/5?source=vidsrc"
        );
        assert_eq!(
            parse_share_link(link.as_str()).unwrap(),
            SharedTarget {
                media,
                source: Some("vidsrc".to_string())
            }
        );
    }

    #[test]
    fn test_movie_link_under_prefix() {
        let base = Url::parse("https://watch.example/app/").unwrap();
        let link = share_link(&base, &MediaRef::movie("42").unwrap(), None);
        assert_eq!(link.as_str(), "https://watch.example/app/movie/42");

        let target = parse_share_link(link.as_str()).unwrap();
        assert_eq!(target.media, MediaRef::movie("42").unwrap());
        assert_eq!(target.source, None);
    }

    #[test]
    fn test_series_link_without_episode() {
        let link = share_link(&base(), &MediaRef::tv("7").unwrap(), Some(""));
        assert_eq!(link.as_str(), "https://watch.example/tv/7");
    }

    #[test]
    fn test_parse_bare_path() {
        let target = parse_share_link("/tv/7/season/1/episode/3").unwrap();
        assert_eq!(target.media, MediaRef::tv_episode("7", 1, 3).unwrap());
    }

    #[test]
    fn test_ids_with_query_characters() {
        let target = parse_share_link("/movie/a&b").unwrap();
        assert_eq!(target.media.external_id(), "a&b");

        let target = parse_share_link("/tv/x=1+2/season/1/episode/2").unwrap();
        assert_eq!(target.media.external_id(), "x=1+2");

        let media = MediaRef::movie("a b&c/d").unwrap();
        let link = share_link(&base(), &media, None);
        assert_eq!(link.as_str(), "https://watch.example/movie/a%20b%26c%2Fd");
        assert_eq!(parse_share_link(link.as_str()).unwrap().media, media);
    }

    #[test]
    fn test_invalid_utf8_segment_rejected() {
        assert!(matches!(
            parse_share_link("/movie/%FF"),
            Err(ShareLinkError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_routes() {
        assert!(matches!(
            parse_share_link("https://watch.example/person/5"),
            Err(ShareLinkError::UnrecognizedRoute(_))
        ));
        assert!(matches!(
            parse_share_link("/tv/7/season/one/episode/3"),
            Err(ShareLinkError::InvalidNumber(_))
        ));
        assert_eq!(
            parse_share_link("/tv/7/season/0/episode/3"),
            Err(ShareLinkError::Media(MediaRefError::ZeroNumber))
        );
        assert!(matches!(
            parse_share_link("not a link"),
            Err(ShareLinkError::InvalidUrl(_))
        ));
    }
}
