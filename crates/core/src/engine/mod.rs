use crate::catalog::query::DEFAULT_LIMIT;
use crate::catalog::{CatalogQuery, ImageResolver, RacketCatalog};
use crate::domain::preference::{PreferenceSelection, SelectionPolicy};
use crate::domain::racket::RecommendedRacket;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod error;
pub mod score;

pub use error::FetchError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which records get scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringScope {
    /// Send every selection filter to the catalog and score what comes back.
    #[default]
    Filtered,
    /// Pull up to `limit` records unfiltered and let the score do the sorting, so near
    /// matches show up below exact ones.
    Broad,
}

impl FromStr for ScoringScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filtered" => Ok(ScoringScope::Filtered),
            "broad" => Ok(ScoringScope::Broad),
            other => anyhow::bail!("unknown scoring scope: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub policy: SelectionPolicy,
    pub scope: ScoringScope,
    /// Maximum number of catalog records scored per fetch.
    pub limit: usize,
    pub timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::RequireAll,
            scope: ScoringScope::Filtered,
            limit: DEFAULT_LIMIT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl EngineOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("SELECTION_POLICY") {
            match s.parse::<SelectionPolicy>() {
                Ok(policy) => out.policy = policy,
                Err(e) => tracing::warn!(error = %e, "ignoring SELECTION_POLICY"),
            }
        }

        if let Ok(s) = std::env::var("SCORING_SCOPE") {
            match s.parse::<ScoringScope>() {
                Ok(scope) => out.scope = scope,
                Err(e) => tracing::warn!(error = %e, "ignoring SCORING_SCOPE"),
            }
        }

        if let Ok(s) = std::env::var("RECOMMEND_LIMIT") {
            match positive(&s) {
                Some(n) => out.limit = n as usize,
                None => tracing::warn!(value = %s, "ignoring RECOMMEND_LIMIT"),
            }
        }

        if let Ok(s) = std::env::var("RECOMMEND_TIMEOUT_SECS") {
            match positive(&s) {
                Some(n) => out.timeout = Duration::from_secs(n),
                None => tracing::warn!(value = %s, "ignoring RECOMMEND_TIMEOUT_SECS"),
            }
        }

        out
    }
}

/// Parses a numeric knob that must be at least 1.
fn positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n >= 1)
}

/// Turns a preference selection into a ranked racket list.
#[derive(Clone)]
pub struct RecommendationEngine {
    catalog: Arc<dyn RacketCatalog>,
    images: Arc<dyn ImageResolver>,
    options: EngineOptions,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn RacketCatalog>,
        images: Arc<dyn ImageResolver>,
        options: EngineOptions,
    ) -> Self {
        Self {
            catalog,
            images,
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn initial_selection(&self) -> PreferenceSelection {
        PreferenceSelection::initial(self.options.policy)
    }

    pub fn build_query(&self, selection: &PreferenceSelection) -> CatalogQuery {
        match self.options.scope {
            ScoringScope::Filtered => CatalogQuery::for_selection(selection, self.options.limit),
            ScoringScope::Broad => CatalogQuery::broad(self.options.limit),
        }
    }

    pub async fn fetch_recommendations(
        &self,
        selection: &PreferenceSelection,
    ) -> Result<Vec<RecommendedRacket>, FetchError> {
        if self.options.policy == SelectionPolicy::RequireAll && !selection.is_complete() {
            tracing::debug!("selection incomplete; skipping catalog read");
            return Ok(Vec::new());
        }

        let backend = self.catalog.backend_name();
        let query = self.build_query(selection);
        let t0 = Instant::now();

        let mut rackets =
            match tokio::time::timeout(self.options.timeout, self.catalog.query_rackets(&query))
                .await
            {
                Ok(Ok(rackets)) => rackets,
                Ok(Err(err)) => {
                    tracing::warn!(backend, error = %format!("{err:#}"), "catalog read failed");
                    return Err(FetchError::catalog(backend, &err));
                }
                Err(_) => {
                    tracing::warn!(backend, timeout = ?self.options.timeout, "catalog read timed out");
                    return Err(FetchError::Timeout {
                        backend,
                        after: self.options.timeout,
                    });
                }
            };
        rackets.truncate(self.options.limit);

        let scored = rackets
            .into_iter()
            .map(|racket| {
                let image_url = self.images.public_url(racket.image_path.as_deref());
                let pct = score::match_percentage(&racket, selection);
                RecommendedRacket::new(racket, image_url, pct)
            })
            .collect();
        let ranked = score::rank(scored);

        tracing::info!(
            backend,
            filters = query.filters.len(),
            results = ranked.len(),
            top = ranked.first().map(|r| r.match_percentage),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "recommendations ranked"
        );

        Ok(ranked)
    }
}
