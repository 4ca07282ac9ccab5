//! Licensed streaming availability
//!
//! Purely informational lookups of where a title can be watched legally
//! (subscription services, free tiers, rentals, purchases). Nothing here feeds
//! into stream resolution.
mod watchmode;
mod watchmode_types;

pub use watchmode::WatchModeGateway;

use crate::media::MediaKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during availability lookups
#[derive(Debug, Error)]
pub enum AvailabilityError {
    /// No API key was configured
    #[error("No WatchMode API key configured")]
    MissingApiKey,

    /// Request to the availability service failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the service's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The title is unknown to the service
    #[error("Title not found: {0}")]
    TitleNotFound(String),
}

/// How an offer lets you watch a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferType {
    /// Included in a subscription
    Subscription,
    /// Free, usually ad-supported
    Free,
    Rent,
    Buy,
    /// Paid add-on channel on top of a subscription
    Addon,
}

impl OfferType {
    /// Maps the service's type code; unknown codes are not offers we list
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "sub" => Some(OfferType::Subscription),
            "free" => Some(OfferType::Free),
            "rent" => Some(OfferType::Rent),
            "buy" => Some(OfferType::Buy),
            "addon" => Some(OfferType::Addon),
            _ => None,
        }
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OfferType::Subscription => "subscription",
            OfferType::Free => "free",
            OfferType::Rent => "rent",
            OfferType::Buy => "buy",
            OfferType::Addon => "add-on",
        };
        f.write_str(label)
    }
}

/// A licensed way to watch a title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingOffer {
    pub service_name: String,
    pub url: String,
    pub offer_type: OfferType,
    pub price: Option<f64>,
    /// Video quality, e.g. "HD" or "4K"
    pub format: Option<String>,
}

/// Trait for services listing licensed viewing options
pub trait AvailabilityGateway {
    /// Finds offers for a title by name
    fn find_offers(
        &self,
        title: &str,
        kind: MediaKind,
    ) -> Result<Vec<StreamingOffer>, AvailabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_type_codes() {
        assert_eq!(OfferType::from_code("sub"), Some(OfferType::Subscription));
        assert_eq!(OfferType::from_code("addon"), Some(OfferType::Addon));
        assert_eq!(OfferType::from_code("tve"), None);
        assert_eq!(OfferType::Addon.to_string(), "add-on");
    }
}
