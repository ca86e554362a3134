//! Media metadata resolution seam.

use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while resolving a requested media URL.
#[derive(Error, Debug)]
pub enum MediaError {
    /// No service knows how to play this URL.
    #[error("unsupported service for {0}")]
    UnsupportedService(String),
    /// The service was recognized but metadata could not be fetched.
    #[error("metadata fetch failed: {0}")]
    FetchFailed(String),
}

/// Metadata for a playable media item.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMedia {
    /// Canonical playback URL.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Duration in milliseconds, when known.
    pub duration_ms: Option<u64>,
    /// Thumbnail image URL, when available.
    pub thumbnail_url: Option<String>,
}

/// Resolves a requested URL into playable media metadata.
///
/// Implemented by the embedding application over whatever media services
/// it supports; the lobby only needs the result. Resolution failures are
/// contained in the requesting handler and never reach the caller.
pub trait MediaResolver: Send + Sync {
    /// Resolves `url` into media metadata.
    fn resolve(&self, url: &str) -> Result<ResolvedMedia, MediaError>;
}

/// A resolver backed by a fixed table, for tests.
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: HashMap<String, ResolvedMedia>,
}

impl StaticResolver {
    /// Creates an empty resolver that rejects every URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a known URL.
    pub fn with_media(mut self, media: ResolvedMedia) -> Self {
        self.entries.insert(media.url.clone(), media);
        self
    }
}

impl MediaResolver for StaticResolver {
    fn resolve(&self, url: &str) -> Result<ResolvedMedia, MediaError> {
        self.entries
            .get(url)
            .cloned()
            .ok_or_else(|| MediaError::UnsupportedService(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResolvedMedia {
        ResolvedMedia {
            url: "https://media.example/v/1".into(),
            title: "First".into(),
            duration_ms: Some(90_000),
            thumbnail_url: None,
        }
    }

    #[test]
    fn static_resolver_returns_known_media() {
        let resolver = StaticResolver::new().with_media(sample());
        let media = resolver.resolve("https://media.example/v/1").unwrap();
        assert_eq!(media.title, "First");
    }

    #[test]
    fn static_resolver_rejects_unknown_urls() {
        let resolver = StaticResolver::new();
        let result = resolver.resolve("https://media.example/v/404");
        assert!(matches!(result, Err(MediaError::UnsupportedService(_))));
    }
}
