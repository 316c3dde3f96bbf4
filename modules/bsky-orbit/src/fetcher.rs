use std::collections::HashSet;

use tracing::debug;

use crate::cancel::CancellationToken;
use crate::pacing::Pacer;
use crate::retry::RetryPolicy;
use crate::traits::FollowGraph;
use crate::types::Account;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub page_size: u32,
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: bsky_client::MAX_PAGE_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// How a follow-list walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    /// Every page was retrieved.
    Complete,
    /// A page after the first failed; earlier pages are kept.
    Partial { reason: String },
    /// The first page failed; nothing was retrieved.
    Failed { reason: String },
    /// The run was cancelled mid-walk; pages retrieved so far are kept.
    Cancelled,
}

impl FollowOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FollowOutcome::Complete => "complete",
            FollowOutcome::Partial { .. } => "partial",
            FollowOutcome::Failed { .. } => "failed",
            FollowOutcome::Cancelled => "cancelled",
        }
    }
}

/// The accounts `actor` follows, in the order the pages returned them.
#[derive(Debug, Clone)]
pub struct FollowList {
    pub actor: String,
    pub accounts: Vec<Account>,
    pub pages: usize,
    pub outcome: FollowOutcome,
}

/// Walk every page of `actor`'s follow list, one page at a time, feeding each
/// cursor back into the next request.
///
/// Never fails: a page error ends the walk and whatever was collected so far
/// is returned, with the reason recorded in [`FollowList::outcome`]. A cursor
/// the walk has already followed ends it as `Partial`.
pub async fn fetch_all_follows(
    graph: &dyn FollowGraph,
    actor: &str,
    options: &FetchOptions,
    pacer: &Pacer,
    cancel: &CancellationToken,
) -> FollowList {
    let mut accounts = Vec::new();
    let mut cursor: Option<String> = None;
    let mut followed: HashSet<String> = HashSet::new();
    let mut pages = 0usize;
    let page_size = options.page_size;

    let outcome = loop {
        let current = cursor.as_deref();
        let request = options.retry.run(actor, move || async move {
            pacer.ready().await;
            graph.follows_page(actor, current, page_size).await
        });

        let result = match cancel.run(request).await {
            Some(result) => result,
            None => break FollowOutcome::Cancelled,
        };

        match result {
            Ok(page) => {
                pages += 1;
                accounts.extend(page.accounts);
                match page.cursor {
                    None => break FollowOutcome::Complete,
                    Some(next) if followed.contains(&next) => {
                        break FollowOutcome::Partial {
                            reason: format!("cursor {next:?} was already followed"),
                        };
                    }
                    Some(next) => {
                        followed.insert(next.clone());
                        cursor = Some(next);
                    }
                }
            }
            Err(err) => {
                let reason = err.to_string();
                break if pages == 0 {
                    FollowOutcome::Failed { reason }
                } else {
                    FollowOutcome::Partial { reason }
                };
            }
        }
    };

    match &outcome {
        FollowOutcome::Complete => {
            debug!(actor, pages, follows = accounts.len(), "Fetched follow list")
        }
        FollowOutcome::Partial { reason } | FollowOutcome::Failed { reason } => debug!(
            actor,
            pages,
            follows = accounts.len(),
            outcome = outcome.label(),
            reason = reason.as_str(),
            "Follow list truncated"
        ),
        FollowOutcome::Cancelled => {
            debug!(actor, pages, follows = accounts.len(), "Follow list walk cancelled")
        }
    }

    FollowList {
        actor: actor.to_string(),
        accounts,
        pages,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{account, accounts, MockGraph};

    fn options(page_size: u32) -> FetchOptions {
        FetchOptions {
            page_size,
            retry: RetryPolicy::default(),
        }
    }

    async fn fetch(graph: &MockGraph, actor: &str) -> FollowList {
        fetch_all_follows(
            graph,
            actor,
            &options(100),
            &Pacer::unpaced(),
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn walks_chained_cursors_in_page_order() {
        let all = accounts("f", 250);
        let graph = MockGraph::new().on_paged_follows(
            "did:plc:origin",
            vec![all[..100].to_vec(), all[100..200].to_vec(), all[200..].to_vec()],
        );

        let list = fetch(&graph, "did:plc:origin").await;

        assert_eq!(list.outcome, FollowOutcome::Complete);
        assert_eq!(list.pages, 3);
        assert_eq!(list.accounts, all);
        assert_eq!(graph.follow_requests("did:plc:origin"), 3);
    }

    #[tokio::test]
    async fn requests_configured_page_size() {
        let graph = MockGraph::new().on_follows("did:plc:origin", accounts("f", 2));
        fetch_all_follows(
            &graph,
            "did:plc:origin",
            &options(25),
            &Pacer::unpaced(),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(graph.requested_limits("did:plc:origin"), vec![25]);
    }

    #[tokio::test]
    async fn short_list_returns_exactly_what_exists() {
        let graph = MockGraph::new().on_follows("did:plc:origin", accounts("f", 7));
        let list = fetch(&graph, "did:plc:origin").await;
        assert_eq!(list.accounts.len(), 7);
        assert_eq!(list.outcome, FollowOutcome::Complete);
    }

    #[tokio::test]
    async fn empty_list_is_complete() {
        let graph = MockGraph::new().on_follows("did:plc:loner", vec![]);
        let list = fetch(&graph, "did:plc:loner").await;
        assert!(list.accounts.is_empty());
        assert_eq!(list.outcome, FollowOutcome::Complete);
    }

    #[tokio::test]
    async fn mid_walk_failure_keeps_earlier_pages() {
        let all = accounts("f", 30);
        let graph = MockGraph::new()
            .on_paged_follows(
                "did:plc:origin",
                vec![all[..10].to_vec(), all[10..20].to_vec(), all[20..].to_vec()],
            )
            .fail_page("did:plc:origin", 2);

        let list = fetch(&graph, "did:plc:origin").await;

        assert_eq!(list.accounts, all[..20].to_vec());
        assert!(matches!(list.outcome, FollowOutcome::Partial { .. }));
    }

    #[tokio::test]
    async fn unknown_actor_fails_without_edges() {
        let graph = MockGraph::new();
        let list = fetch(&graph, "did:plc:ghost").await;
        assert!(list.accounts.is_empty());
        assert!(matches!(list.outcome, FollowOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn stalled_cursor_stops_the_walk() {
        let graph = MockGraph::new()
            .on_follows("did:plc:loop", vec![account("x")])
            .stuck_cursor("did:plc:loop");
        let list = fetch(&graph, "did:plc:loop").await;
        assert!(matches!(list.outcome, FollowOutcome::Partial { .. }));
        assert_eq!(graph.follow_requests("did:plc:loop"), 2);
    }

    #[tokio::test]
    async fn cursor_cycle_stops_the_walk() {
        let graph = MockGraph::new()
            .on_paged_follows("did:plc:cycle", vec![vec![account("x")], vec![account("y")]])
            .cycling_cursor("did:plc:cycle");

        let list = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            fetch(&graph, "did:plc:cycle"),
        )
        .await
        .expect("a cursor cycle must not loop forever");

        assert!(matches!(list.outcome, FollowOutcome::Partial { .. }));
        // first page, page-1, then page-0 hands back page-1 again.
        assert_eq!(graph.follow_requests("did:plc:cycle"), 3);
        assert_eq!(list.pages, 3);
    }

    #[tokio::test]
    async fn retries_recover_transient_page_failures() {
        let graph = MockGraph::new()
            .on_follows("did:plc:flaky", accounts("f", 3))
            .flaky_follows("did:plc:flaky", 2);
        let list = fetch_all_follows(
            &graph,
            "did:plc:flaky",
            &FetchOptions {
                page_size: 100,
                retry: RetryPolicy::new(2, std::time::Duration::from_millis(1)),
            },
            &Pacer::unpaced(),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(list.outcome, FollowOutcome::Complete);
        assert_eq!(list.accounts.len(), 3);
        assert_eq!(graph.follow_requests("did:plc:flaky"), 3);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_requesting() {
        let graph = MockGraph::new().on_follows("did:plc:origin", accounts("f", 3));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let list =
            fetch_all_follows(&graph, "did:plc:origin", &options(100), &Pacer::unpaced(), &cancel)
                .await;
        assert_eq!(list.outcome, FollowOutcome::Cancelled);
        assert!(list.accounts.is_empty());
    }
}
