use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::OrbitError;
use crate::fetcher::{fetch_all_follows, FetchOptions, FollowList, FollowOutcome};
use crate::pacing::Pacer;
use crate::progress::{Progress, ProgressReporter};
use crate::traits::FollowGraph;
use crate::types::{Account, Candidate};

/// Identifiers that must never be recommended: the origin and everyone it
/// already follows.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    ids: HashSet<String>,
}

impl ExclusionSet {
    pub fn new(origin: &str, first_hop: &[Account]) -> Self {
        let mut ids: HashSet<String> = first_hop.iter().map(|a| a.identifier.clone()).collect();
        ids.insert(origin.to_string());
        Self { ids }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.ids.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Owned support-count accumulator for second-hop accounts.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    candidates: HashMap<String, Candidate>,
    edges_seen: usize,
    edges_excluded: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one sighting of `account`. The first snapshot seen for an
    /// identifier is kept; later sightings only bump its support.
    /// Returns false when the account is excluded.
    pub fn record(&mut self, account: &Account, exclusion: &ExclusionSet) -> bool {
        self.edges_seen += 1;
        if exclusion.contains(&account.identifier) {
            self.edges_excluded += 1;
            return false;
        }
        self.candidates
            .entry(account.identifier.clone())
            .and_modify(|c| c.support += 1)
            .or_insert_with(|| Candidate {
                account: account.clone(),
                support: 1,
            });
        true
    }

    /// Fold in one first-hop account's follow list. A target listed twice in
    /// the same list still counts once, since support is per first-hop account.
    pub fn absorb(&mut self, follows: &[Account], exclusion: &ExclusionSet) {
        let mut seen = HashSet::with_capacity(follows.len());
        for account in follows {
            if seen.insert(account.identifier.as_str()) {
                self.record(account, exclusion);
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&Candidate> {
        self.candidates.get(identifier)
    }

    pub fn support(&self, identifier: &str) -> u32 {
        self.get(identifier).map_or(0, |c| c.support)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn edges_seen(&self) -> usize {
        self.edges_seen
    }

    pub fn edges_excluded(&self) -> usize {
        self.edges_excluded
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates.into_values().collect()
    }
}

/// What happened when one first-hop account's follows were fetched.
#[derive(Debug, Clone)]
pub struct HopResult {
    pub account: Account,
    pub outcome: FollowOutcome,
}

/// First-hop accounts grouped by how their follow-list walk ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HopCounts {
    pub complete: usize,
    pub partial: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// The origin's two-hop neighborhood, reduced to support counts.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub origin: Account,
    /// How the walk of the origin's own follow list ended. When it is not
    /// `Complete`, accounts on the missing pages are not excluded and can
    /// show up as candidates.
    pub origin_outcome: FollowOutcome,
    pub first_hop: Vec<Account>,
    pub exclusion: ExclusionSet,
    pub candidates: Accumulator,
    pub hops: Vec<HopResult>,
    pub cancelled: bool,
}

impl Neighborhood {
    pub fn tally(&self) -> HopCounts {
        self.hops.iter().fold(HopCounts::default(), |mut counts, hop| {
            match hop.outcome {
                FollowOutcome::Complete => counts.complete += 1,
                FollowOutcome::Partial { .. } => counts.partial += 1,
                FollowOutcome::Failed { .. } => counts.failed += 1,
                FollowOutcome::Cancelled => counts.cancelled += 1,
            }
            counts
        })
    }
}

pub struct Aggregator<'a> {
    graph: &'a dyn FollowGraph,
    options: FetchOptions,
    concurrency: usize,
    pacer: &'a Pacer,
    cancel: &'a CancellationToken,
    progress: ProgressReporter,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        graph: &'a dyn FollowGraph,
        options: FetchOptions,
        concurrency: usize,
        pacer: &'a Pacer,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            graph,
            options,
            concurrency: concurrency.max(1),
            pacer,
            cancel,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Look up the origin account. Failure here is fatal to the run.
    pub async fn resolve_origin(&self, handle: &str) -> Result<Account, OrbitError> {
        let lookup = self.options.retry.run(handle, move || async move {
            self.pacer.ready().await;
            self.graph.profile(handle).await
        });
        match self.cancel.run(lookup).await {
            Some(Ok(origin)) => {
                info!(handle, did = origin.identifier.as_str(), "Resolved origin");
                Ok(origin)
            }
            Some(Err(source)) => Err(OrbitError::OriginNotFound {
                handle: handle.to_string(),
                source,
            }),
            None => Err(OrbitError::Cancelled {
                handle: handle.to_string(),
            }),
        }
    }

    /// Fetch the origin's follows, then every first-hop account's follows,
    /// and count support for each second-hop account.
    pub async fn collect(&self, origin: Account) -> Result<Neighborhood, OrbitError> {
        let own = self.fetch(&origin.identifier).await;
        let origin_outcome = own.outcome;
        let first_hop = match &origin_outcome {
            FollowOutcome::Failed { reason } => {
                return Err(OrbitError::FollowsUnavailable {
                    handle: origin.handle,
                    reason: reason.clone(),
                });
            }
            FollowOutcome::Cancelled if own.accounts.is_empty() => {
                return Err(OrbitError::Cancelled {
                    handle: origin.handle,
                });
            }
            FollowOutcome::Partial { reason } => {
                warn!(
                    handle = origin.handle.as_str(),
                    follows = own.accounts.len(),
                    reason = reason.as_str(),
                    "Origin follow list is incomplete, continuing with what was fetched"
                );
                dedup_by_identifier(own.accounts)
            }
            FollowOutcome::Complete | FollowOutcome::Cancelled => dedup_by_identifier(own.accounts),
        };

        if first_hop.is_empty() {
            return Err(OrbitError::NoFollows {
                handle: origin.handle,
            });
        }
        info!(follows = first_hop.len(), "Fetched origin follow list");
        self.progress.emit(Progress::FollowsFound {
            count: first_hop.len(),
        });

        let exclusion = ExclusionSet::new(&origin.identifier, &first_hop);
        let mut candidates = Accumulator::new();
        let mut hops = Vec::with_capacity(first_hop.len());
        let total = first_hop.len();

        // `buffered` yields in first-hop order, so this loop is the single
        // writer to the accumulator whatever the concurrency.
        let mut lists = stream::iter(first_hop.iter().map(move |account| async move {
            (account, self.fetch(&account.identifier).await)
        }))
        .buffered(self.concurrency);

        while let Some((account, list)) = lists.next().await {
            candidates.absorb(&list.accounts, &exclusion);
            debug!(
                progress = hops.len() + 1,
                total,
                handle = account.handle.as_str(),
                follows = list.accounts.len(),
                outcome = list.outcome.label(),
                "Processed first-hop account"
            );
            hops.push(HopResult {
                account: account.clone(),
                outcome: list.outcome,
            });
            self.progress.emit(Progress::Hop {
                done: hops.len(),
                total,
                handle: account.handle.clone(),
            });
        }
        // Release the borrow of `first_hop` before it moves into the result.
        drop(lists);

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!(processed = hops.len(), total, "Aggregation cancelled, keeping partial counts");
        }
        info!(
            candidates = candidates.len(),
            edges = candidates.edges_seen(),
            "Aggregated extended network"
        );

        Ok(Neighborhood {
            origin,
            origin_outcome,
            first_hop,
            exclusion,
            candidates,
            hops,
            cancelled,
        })
    }

    async fn fetch(&self, actor: &str) -> FollowList {
        fetch_all_follows(self.graph, actor, &self.options, self.pacer, self.cancel).await
    }
}

fn dedup_by_identifier(accounts: Vec<Account>) -> Vec<Account> {
    let mut seen = HashSet::with_capacity(accounts.len());
    accounts
        .into_iter()
        .filter(|a| seen.insert(a.identifier.clone()))
        .collect()
}
