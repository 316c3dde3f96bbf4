use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::pacing::Pacer;
use crate::progress::{Progress, ProgressReporter};
use crate::retry::RetryPolicy;
use crate::text::truncate;
use crate::traits::FollowGraph;
use crate::types::{Account, RankedCandidate, Recommendation};

pub const DEFAULT_BIO_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub recommendations: Vec<Recommendation>,
    /// Profile lookups that returned an error.
    pub failures: usize,
    /// Lookups abandoned because the run was cancelled.
    pub skipped: usize,
}

/// Overlays live profile metadata onto ranked candidates.
pub struct Enricher<'a> {
    graph: &'a dyn FollowGraph,
    retry: RetryPolicy,
    concurrency: usize,
    bio_max_len: usize,
    pacer: &'a Pacer,
    cancel: &'a CancellationToken,
    progress: ProgressReporter,
}

enum Lookup {
    Found(Account),
    Failed,
    Skipped,
}

impl<'a> Enricher<'a> {
    pub fn new(
        graph: &'a dyn FollowGraph,
        retry: RetryPolicy,
        concurrency: usize,
        bio_max_len: usize,
        pacer: &'a Pacer,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            graph,
            retry,
            concurrency: concurrency.max(1),
            bio_max_len,
            pacer,
            cancel,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// One recommendation per ranked candidate, in rank order. A candidate
    /// whose profile cannot be fetched stays in the output with empty
    /// metadata.
    pub async fn enrich(&self, ranked: &[RankedCandidate]) -> Enrichment {
        let total = ranked.len();
        self.progress.emit(Progress::Enriching { count: total });

        let mut lookups = stream::iter(ranked.iter().map(move |r| async move {
            (Recommendation::bare(r), self.lookup(&r.candidate.account).await)
        }))
        .buffered(self.concurrency);

        let mut enrichment = Enrichment::default();
        while let Some((mut rec, lookup)) = lookups.next().await {
            match lookup {
                Lookup::Found(profile) => self.overlay(&mut rec, profile),
                Lookup::Failed => enrichment.failures += 1,
                Lookup::Skipped => enrichment.skipped += 1,
            }
            self.progress.emit(Progress::Profile {
                done: enrichment.recommendations.len() + 1,
                total,
                handle: rec.handle.clone(),
            });
            enrichment.recommendations.push(rec);
        }
        enrichment
    }

    async fn lookup(&self, account: &Account) -> Lookup {
        let actor = account.identifier.as_str();
        let request = self.retry.run(actor, move || async move {
            self.pacer.ready().await;
            self.graph.profile(actor).await
        });
        match self.cancel.run(request).await {
            Some(Ok(profile)) => Lookup::Found(profile),
            Some(Err(err)) => {
                debug!(handle = account.handle.as_str(), error = %err, "Profile unavailable, leaving metadata empty");
                Lookup::Failed
            }
            None => Lookup::Skipped,
        }
    }

    fn overlay(&self, rec: &mut Recommendation, profile: Account) {
        rec.display_name = profile.display_name.unwrap_or_default();
        rec.bio = profile
            .bio
            .map(|bio| truncate(&bio, self.bio_max_len))
            .unwrap_or_default();
        rec.followers_count = profile.followers_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{account, did, MockGraph};
    use crate::types::Candidate;

    fn ranked(names: &[&str]) -> Vec<RankedCandidate> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| RankedCandidate {
                rank: i + 1,
                candidate: Candidate {
                    account: account(name),
                    support: (names.len() - i) as u32,
                },
            })
            .collect()
    }

    async fn run(graph: &MockGraph, ranked: &[RankedCandidate]) -> Enrichment {
        let pacer = Pacer::unpaced();
        let cancel = CancellationToken::new();
        Enricher::new(graph, RetryPolicy::default(), 1, DEFAULT_BIO_MAX_LEN, &pacer, &cancel)
            .enrich(ranked)
            .await
    }

    #[tokio::test]
    async fn overlays_profile_metadata() {
        let graph = MockGraph::new().with_account(
            account("x")
                .with_display_name("Ex Ample")
                .with_bio("  writes\nabout rust  ")
                .with_followers(1234),
        );

        let out = run(&graph, &ranked(&["x"])).await;

        let rec = &out.recommendations[0];
        assert_eq!(rec.display_name, "Ex Ample");
        assert_eq!(rec.bio, "writes about rust");
        assert_eq!(rec.followers_count, 1234);
        assert_eq!(rec.followed_by_count, 1);
        assert_eq!(rec.url, "https://bsky.app/profile/x.bsky.social");
        assert_eq!(out.failures, 0);
    }

    #[tokio::test]
    async fn long_bios_are_bounded() {
        let graph =
            MockGraph::new().with_account(account("x").with_bio("word ".repeat(60)));
        let out = run(&graph, &ranked(&["x"])).await;
        let bio = &out.recommendations[0].bio;
        assert_eq!(bio.chars().count(), DEFAULT_BIO_MAX_LEN);
        assert!(bio.ends_with("..."));
    }

    #[tokio::test]
    async fn missing_profile_keeps_candidate_with_empty_fields() {
        let graph = MockGraph::new()
            .with_accounts([account("a").with_display_name("A"), account("c")])
            .fail_profile(&did("b"));

        let out = run(&graph, &ranked(&["a", "b", "c"])).await;

        assert_eq!(out.recommendations.len(), 3);
        assert_eq!(out.failures, 1);
        let b = &out.recommendations[1];
        assert_eq!(b.rank, 2);
        assert_eq!(b.handle, "b.bsky.social");
        assert_eq!(b.display_name, "");
        assert_eq!(b.bio, "");
        assert_eq!(b.followers_count, 0);
        assert_eq!(b.followed_by_count, 2);
    }

    #[tokio::test]
    async fn cancelled_lookups_are_skipped_not_dropped() {
        let graph = MockGraph::new().with_account(account("a"));
        let pacer = Pacer::unpaced();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let out = Enricher::new(&graph, RetryPolicy::default(), 1, 100, &pacer, &cancel)
            .enrich(&ranked(&["a", "b"]))
            .await;

        assert_eq!(out.recommendations.len(), 2);
        assert_eq!(out.skipped, 2);
        assert_eq!(out.failures, 0);
        assert!(graph.requests().is_empty());
    }

    #[tokio::test]
    async fn preserves_rank_order_with_concurrency() {
        let names: Vec<String> = (0..12).map(|i| format!("p{i:02}")).collect();
        let graph = MockGraph::new()
            .with_accounts(names.iter().map(|n| account(n)))
            .with_latency(std::time::Duration::from_millis(5));
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let pacer = Pacer::unpaced();
        let cancel = CancellationToken::new();

        let out = Enricher::new(&graph, RetryPolicy::default(), 4, 100, &pacer, &cancel)
            .enrich(&ranked(&refs))
            .await;

        let ranks: Vec<usize> = out.recommendations.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=12).collect::<Vec<_>>());
        assert!(graph.max_in_flight() <= 4);
    }
}
