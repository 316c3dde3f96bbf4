use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::aggregate::Aggregator;
use crate::cancel::CancellationToken;
use crate::config::OrbitConfig;
use crate::enrich::Enricher;
use crate::error::OrbitError;
use crate::fetcher::{FetchOptions, FollowOutcome};
use crate::pacing::Pacer;
use crate::progress::ProgressReporter;
use crate::rank::rank;
use crate::traits::FollowGraph;
use crate::types::Recommendation;

#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// The origin's own follow list was cut short, so some accounts it
    /// follows may appear among the recommendations.
    pub origin_partial: bool,
    pub first_hop: usize,
    pub hops_complete: usize,
    pub hops_partial: usize,
    pub hops_failed: usize,
    pub hops_cancelled: usize,
    pub edges_seen: usize,
    pub edges_excluded: usize,
    pub candidates: usize,
    pub recommendations: usize,
    pub enrich_failures: usize,
    pub enrich_skipped: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Orbit Run Complete ===")?;
        writeln!(f, "Accounts followed:   {}", self.first_hop)?;
        writeln!(f, "  complete:          {}", self.hops_complete)?;
        writeln!(f, "  partial:           {}", self.hops_partial)?;
        writeln!(f, "  failed:            {}", self.hops_failed)?;
        writeln!(f, "  cancelled:         {}", self.hops_cancelled)?;
        if self.origin_partial {
            writeln!(f, "  (origin follow list incomplete)")?;
        }
        writeln!(f, "Follow edges seen:   {}", self.edges_seen)?;
        writeln!(f, "  already followed:  {}", self.edges_excluded)?;
        writeln!(f, "Candidates found:    {}", self.candidates)?;
        writeln!(f, "Recommendations:     {}", self.recommendations)?;
        writeln!(f, "Profiles missing:    {}", self.enrich_failures)?;
        writeln!(f, "Profiles skipped:    {}", self.enrich_skipped)?;
        write!(f, "Elapsed:             {:.1}s", self.elapsed.as_secs_f64())?;
        if self.cancelled {
            write!(f, "\n(run was cancelled; results are partial)")?;
        }
        Ok(())
    }
}

/// The JSON artifact: the origin handle and its ranked recommendations.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub user: String,
    pub recommendations: Vec<Recommendation>,
    #[serde(skip)]
    pub stats: RunStats,
}

/// Strip a leading `@` and surrounding whitespace.
pub fn normalize_handle(raw: &str) -> Result<String, OrbitError> {
    let trimmed = raw.trim();
    let handle = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();
    if handle.is_empty() || handle.contains(char::is_whitespace) {
        return Err(OrbitError::InvalidHandle(raw.to_string()));
    }
    Ok(handle.to_string())
}

/// Runs the whole pipeline: resolve → aggregate → rank → enrich.
pub struct Orbit {
    graph: Arc<dyn FollowGraph>,
    config: OrbitConfig,
    progress: ProgressReporter,
}

impl Orbit {
    pub fn new(graph: Arc<dyn FollowGraph>, config: OrbitConfig) -> Self {
        Self {
            graph,
            config,
            progress: ProgressReporter::silent(),
        }
    }

    /// Receive [`Progress`](crate::progress::Progress) events while a run is underway.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Produce recommendations for `handle`.
    ///
    /// Only an unresolvable origin or an empty/unobtainable origin follow list
    /// is an error. If `cancel` fires mid-run the report is built from
    /// whatever was collected and `stats.cancelled` is set.
    pub async fn run(&self, handle: &str, cancel: &CancellationToken) -> Result<Report, OrbitError> {
        let started = Instant::now();
        let handle = normalize_handle(handle)?;
        let pacer = Pacer::new(self.config.pacing);
        let retry = self.config.retry_policy();
        let options = FetchOptions {
            page_size: self.config.page_size,
            retry,
        };

        let aggregator = Aggregator::new(
            self.graph.as_ref(),
            options,
            self.config.concurrency,
            &pacer,
            cancel,
        )
        .with_progress(self.progress.clone());
        let origin = aggregator.resolve_origin(&handle).await?;
        let neighborhood = aggregator.collect(origin).await?;

        let hops = neighborhood.tally();
        let mut stats = RunStats {
            origin_partial: neighborhood.origin_outcome != FollowOutcome::Complete,
            first_hop: neighborhood.first_hop.len(),
            hops_complete: hops.complete,
            hops_partial: hops.partial,
            hops_failed: hops.failed,
            hops_cancelled: hops.cancelled,
            edges_seen: neighborhood.candidates.edges_seen(),
            edges_excluded: neighborhood.candidates.edges_excluded(),
            candidates: neighborhood.candidates.len(),
            ..RunStats::default()
        };

        let ranked = rank(neighborhood.candidates.into_candidates(), self.config.top_n);
        info!(top = ranked.len(), "Fetching details for top recommendations");

        let enrichment = Enricher::new(
            self.graph.as_ref(),
            retry,
            self.config.concurrency,
            self.config.bio_max_len,
            &pacer,
            cancel,
        )
        .with_progress(self.progress.clone())
        .enrich(&ranked)
        .await;

        stats.recommendations = enrichment.recommendations.len();
        stats.enrich_failures = enrichment.failures;
        stats.enrich_skipped = enrichment.skipped;
        stats.cancelled = cancel.is_cancelled();
        stats.elapsed = started.elapsed();
        info!(
            recommendations = stats.recommendations,
            candidates = stats.candidates,
            cancelled = stats.cancelled,
            "Run finished"
        );

        Ok(Report {
            user: handle,
            recommendations: enrichment.recommendations,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_at() {
        assert_eq!(normalize_handle("@alice.bsky.social").unwrap(), "alice.bsky.social");
        assert_eq!(normalize_handle("alice.bsky.social").unwrap(), "alice.bsky.social");
        assert_eq!(normalize_handle("  @bob.dev ").unwrap(), "bob.dev");
    }

    #[test]
    fn rejects_empty_or_spaced_handles() {
        for raw in ["", "@", "  ", "two words"] {
            assert!(
                matches!(normalize_handle(raw), Err(OrbitError::InvalidHandle(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn stats_summary_mentions_partial_runs() {
        let stats = RunStats {
            cancelled: true,
            ..RunStats::default()
        };
        let text = stats.to_string();
        assert!(text.contains("Orbit Run Complete"));
        assert!(text.contains("results are partial"));
    }
}
