//! Engine construction from configuration.

use crate::engine::ReplayEngine;
use crate::error::EngineError;
use log::info;
use reprise_config::{CacheConfig, MatcherSelection, ReplayConfig, ReplaySettings};
use reprise_history::LogFormat;
use reprise_match::{
    EmbeddingCache, EmbeddingProvider, FileEmbeddingCache, HttpEmbeddingProvider, MatcherKind,
    NoEmbeddingCache, SimilarityMatcher, TextMatcher, VectorMatcher,
};
use std::path::PathBuf;

/// Matcher used for a log format under a selection; `auto` embeds structured logs.
pub fn resolve_matcher_kind(selection: MatcherSelection, format: LogFormat) -> MatcherKind {
    match (selection, format) {
        (MatcherSelection::Text, _) => MatcherKind::Text,
        (MatcherSelection::Vector, _) => MatcherKind::Vector,
        (MatcherSelection::Auto, LogFormat::Structured) => MatcherKind::Vector,
        (MatcherSelection::Auto, LogFormat::Text) => MatcherKind::Text,
    }
}

/// Threshold applied for a matcher kind.
pub fn threshold_for(kind: MatcherKind, settings: &ReplaySettings) -> f64 {
    match kind {
        MatcherKind::Text => settings.effective_text_threshold(),
        MatcherKind::Vector => settings.effective_vector_threshold(),
    }
}

fn cache_from_config(config: &CacheConfig) -> Box<dyn EmbeddingCache> {
    if config.enabled {
        Box::new(FileEmbeddingCache::from_config(config))
    } else {
        Box::new(NoEmbeddingCache)
    }
}

impl ReplayEngine {
    /// Build an engine for `source`, picking parser and matcher from config.
    ///
    /// Vector matching resolves embedding credentials here, so missing keys
    /// fail construction instead of degrading to text matching.
    pub fn from_config(
        source: impl Into<PathBuf>,
        config: &ReplayConfig,
    ) -> Result<Self, EngineError> {
        let source = source.into();
        let kind = resolve_matcher_kind(config.replay.matcher, LogFormat::from_path(&source));
        let provider: Option<Box<dyn EmbeddingProvider>> = match kind {
            MatcherKind::Vector => Some(Box::new(HttpEmbeddingProvider::from_config(
                &config.embedding,
            )?)),
            MatcherKind::Text => None,
        };
        Ok(Self::assemble(source, config, kind, provider))
    }

    /// Like [`ReplayEngine::from_config`], with an explicit embedding provider.
    pub fn from_config_with_provider(
        source: impl Into<PathBuf>,
        config: &ReplayConfig,
        provider: Box<dyn EmbeddingProvider>,
    ) -> Self {
        let source = source.into();
        let kind = resolve_matcher_kind(config.replay.matcher, LogFormat::from_path(&source));
        Self::assemble(source, config, kind, Some(provider))
    }

    fn assemble(
        source: PathBuf,
        config: &ReplayConfig,
        kind: MatcherKind,
        provider: Option<Box<dyn EmbeddingProvider>>,
    ) -> Self {
        let format = LogFormat::from_path(&source);
        let matcher: Box<dyn SimilarityMatcher> = match (kind, provider) {
            (MatcherKind::Vector, Some(provider)) => Box::new(VectorMatcher::new(
                provider,
                cache_from_config(&config.cache),
            )),
            _ => Box::new(TextMatcher::new()),
        };
        let threshold = threshold_for(matcher.kind(), &config.replay);
        info!(
            "replay engine configured (path={}, format={format}, matcher={}, threshold={threshold})",
            source.display(),
            matcher.kind()
        );
        Self::new(source, format.parser(), matcher, threshold)
    }
}
