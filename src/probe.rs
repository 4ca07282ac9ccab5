//! Embedding surface abstraction
//!
//! The resolver only computes URLs. Something else has to actually load them
//! and say whether that worked; in a browser that is an iframe's load/error
//! events, here it is an [`EmbedProbe`].

use std::time::Duration;
use tracing::debug;
use url::Url;

/// Result of loading one embed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSignal {
    /// The embed page loaded
    Loaded,
    /// The load failed or timed out
    Failed { reason: String },
}

/// Loads embed URLs and reports load/error
pub trait EmbedProbe {
    fn load(&self, url: &Url) -> LoadSignal;
}

impl<F> EmbedProbe for F
where
    F: Fn(&Url) -> LoadSignal,
{
    fn load(&self, url: &Url) -> LoadSignal {
        self(url)
    }
}

/// Probe that fetches the embed page over HTTP
///
/// A load counts as successful when the page answers with a 2xx status and a
/// non-empty body within the timeout. Requests that hang past the timeout are
/// reported as failures, so silent hangs do not stall a session.
pub struct HttpProbe {
    client: reqwest::blocking::Client,
}

impl HttpProbe {
    /// Creates a probe whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl EmbedProbe for HttpProbe {
    fn load(&self, url: &Url) -> LoadSignal {
        let response = match self.client.get(url.as_str()).send() {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return LoadSignal::Failed {
                    reason: "timed out".to_string(),
                };
            }
            Err(e) => {
                return LoadSignal::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return LoadSignal::Failed {
                reason: format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            };
        }

        match response.bytes() {
            Ok(body) if !body.is_empty() => {
                debug!(url = %url, bytes = body.len(), "embed page loaded");
                LoadSignal::Loaded
            }
            Ok(_) => LoadSignal::Failed {
                reason: "empty response".to_string(),
            },
            Err(e) => LoadSignal::Failed {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_probe() {
        let probe = |url: &Url| {
            if url.host_str() == Some("good.example") {
                LoadSignal::Loaded
            } else {
                LoadSignal::Failed {
                    reason: "nope".to_string(),
                }
            }
        };

        let good = Url::parse("https://good.example/x").unwrap();
        let bad = Url::parse("https://bad.example/x").unwrap();
        assert_eq!(probe.load(&good), LoadSignal::Loaded);
        assert!(matches!(probe.load(&bad), LoadSignal::Failed { .. }));
    }
}
