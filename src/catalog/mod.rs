//! Embed provider catalog
//!
//! The catalog is the static, ordered list of embed providers the resolver
//! walks through. Catalog order is preference order. It is built once at
//! startup, validated, and shared read-only behind an `Arc`.
mod builtin;
mod template;

pub use template::UrlTemplate;

use crate::media::{MediaKind, MediaRef};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors that can occur while building a provider catalog
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The same provider id appears twice
    #[error("Duplicate provider id: {0}")]
    DuplicateProvider(String),

    /// A provider has neither a movie nor a tv template
    #[error("Provider '{0}' has no URL template")]
    NoTemplate(String),

    /// A multi-mirror provider was configured without domains
    #[error("Provider '{0}' has no mirror domains")]
    NoMirrors(String),

    /// A template does not render to an absolute http(s) URL
    #[error("Provider '{provider}' has an invalid {kind} template '{template}'")]
    InvalidTemplate {
        provider: String,
        kind: MediaKind,
        template: String,
    },
}

/// Where a provider is reachable
///
/// Most providers live on a single domain. Some serve the same paths from
/// several interchangeable mirror domains, which are tried in order before
/// the provider counts as exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoints {
    /// One domain
    Single(String),
    /// Ordered list of interchangeable domains
    MultiMirror(Vec<String>),
}

impl Endpoints {
    /// Number of mirror domains (1 for `Single`)
    pub fn len(&self) -> usize {
        match self {
            Endpoints::Single(_) => 1,
            Endpoints::MultiMirror(domains) => domains.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Domain of the given mirror index
    pub fn domain(&self, mirror: usize) -> Option<&str> {
        match self {
            Endpoints::Single(domain) if mirror == 0 => Some(domain),
            Endpoints::Single(_) => None,
            Endpoints::MultiMirror(domains) => domains.get(mirror).map(String::as_str),
        }
    }
}

/// A single embed provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    id: String,
    name: String,
    endpoints: Endpoints,
    movie: Option<UrlTemplate>,
    tv: Option<UrlTemplate>,
    subtitle_param: Option<String>,
}

impl ProviderSpec {
    /// Creates a provider without templates; add them with `with_movie` / `with_tv`
    pub fn new(id: impl Into<String>, name: impl Into<String>, endpoints: Endpoints) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            endpoints,
            movie: None,
            tv: None,
            subtitle_param: None,
        }
    }

    pub fn with_movie(mut self, template: impl Into<String>) -> Self {
        self.movie = Some(UrlTemplate::new(template));
        self
    }

    pub fn with_tv(mut self, template: impl Into<String>) -> Self {
        self.tv = Some(UrlTemplate::new(template));
        self
    }

    /// Query parameter used to request a default subtitle language
    pub fn with_subtitle_param(mut self, param: impl Into<String>) -> Self {
        self.subtitle_param = Some(param.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn mirror_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn template_for(&self, kind: MediaKind) -> Option<&UrlTemplate> {
        match kind {
            MediaKind::Movie => self.movie.as_ref(),
            MediaKind::Tv => self.tv.as_ref(),
        }
    }

    /// Whether this provider can embed the given kind at all
    pub fn supports(&self, kind: MediaKind) -> bool {
        self.template_for(kind).is_some()
    }

    /// Builds the embed URL for one mirror
    ///
    /// Returns `None` when the provider declines this reference, e.g. its tv
    /// template needs an episode number the reference does not have.
    pub fn url_for(
        &self,
        media: &MediaRef,
        mirror: usize,
        subtitle_language: Option<&str>,
    ) -> Option<Url> {
        let template = self.template_for(media.kind())?;
        let domain = self.endpoints.domain(mirror)?;
        let mut url = Url::parse(&template.render(domain, media)?).ok()?;

        if let (Some(param), Some(lang)) = (&self.subtitle_param, subtitle_language) {
            if !lang.is_empty() {
                url.query_pairs_mut().append_pair(param, lang);
            }
        }

        Some(url)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.movie.is_none() && self.tv.is_none() {
            return Err(CatalogError::NoTemplate(self.id.clone()));
        }
        if self.endpoints.is_empty() {
            return Err(CatalogError::NoMirrors(self.id.clone()));
        }

        let samples = [
            (MediaKind::Movie, MediaRef::movie("1")),
            (MediaKind::Tv, MediaRef::tv_episode("1", 1, 1)),
        ];
        for (kind, sample) in samples {
            let Some(template) = self.template_for(kind) else {
                continue;
            };
            let invalid = || CatalogError::InvalidTemplate {
                provider: self.id.clone(),
                kind,
                template: template.as_str().to_string(),
            };
            let sample = sample.map_err(|_| invalid())?;

            for mirror in 0..self.endpoints.len() {
                let url = self.url_for(&sample, mirror, None).ok_or_else(invalid)?;
                if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                    return Err(invalid());
                }
            }
        }

        Ok(())
    }
}

/// Immutable, validated, ordered provider catalog
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    providers: Vec<Arc<ProviderSpec>>,
}

impl ProviderCatalog {
    /// Validates and wraps the given providers, keeping their order
    pub fn new(providers: Vec<ProviderSpec>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.id.clone()) {
                return Err(CatalogError::DuplicateProvider(provider.id.clone()));
            }
            provider.validate()?;
        }

        Ok(Self {
            providers: providers.into_iter().map(Arc::new).collect(),
        })
    }

    /// The catalog shipped with the crate
    pub fn builtin() -> Self {
        Self {
            providers: builtin::providers().into_iter().map(Arc::new).collect(),
        }
    }

    pub fn providers(&self) -> &[Arc<ProviderSpec>] {
        &self.providers
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ProviderSpec>> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Providers supporting `kind`, in catalog order
    pub fn supporting(&self, kind: MediaKind) -> Vec<Arc<ProviderSpec>> {
        self.providers
            .iter()
            .filter(|p| p.supports(kind))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
