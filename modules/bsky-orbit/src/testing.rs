// In-memory FollowGraph for deterministic tests: no network, no pacing.
//
// Builder pattern: `.with_account()`, `.on_follows()`, `.on_paged_follows()`,
// plus failure injection (`.fail_page()`, `.fail_profile()`, `.flaky_follows()`,
// `.hang_follows()`, `.hang_page()`, `.stuck_cursor()`, `.cycling_cursor()`).
// Every request is logged so tests can assert on traffic as well as results.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bsky_client::BskyError;

use crate::traits::FollowGraph;
use crate::types::{Account, FollowPage};

/// `did:plc:<name>` / `<name>.bsky.social`.
pub fn account(name: &str) -> Account {
    Account::new(did(name), format!("{name}.bsky.social"))
}

pub fn did(name: &str) -> String {
    format!("did:plc:{name}")
}

/// `n` distinct accounts named `<prefix>000`, `<prefix>001`, ...
pub fn accounts(prefix: &str, n: usize) -> Vec<Account> {
    (0..n).map(|i| account(&format!("{prefix}{i:03}"))).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Profile { actor: String },
    Follows { actor: String, cursor: Option<String>, limit: u32 },
}

#[derive(Default)]
pub struct MockGraph {
    profiles: HashMap<String, Account>,
    follows: HashMap<String, Vec<Vec<Account>>>,
    failing_pages: HashMap<String, usize>,
    failing_profiles: HashSet<String>,
    hanging: HashSet<String>,
    hanging_pages: HashMap<String, usize>,
    stuck: HashSet<String>,
    cycling: HashSet<String>,
    flaky: Mutex<HashMap<String, u32>>,
    latency: Option<Duration>,
    requests: Mutex<Vec<Request>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile, resolvable by both identifier and handle.
    pub fn with_account(mut self, account: Account) -> Self {
        self.profiles.insert(account.handle.clone(), account.clone());
        self.profiles.insert(account.identifier.clone(), account);
        self
    }

    pub fn with_accounts(self, accounts: impl IntoIterator<Item = Account>) -> Self {
        accounts.into_iter().fold(self, MockGraph::with_account)
    }

    /// Single-page follow list for `actor` (an identifier).
    pub fn on_follows(self, actor: &str, follows: Vec<Account>) -> Self {
        self.on_paged_follows(actor, vec![follows])
    }

    pub fn on_paged_follows(mut self, actor: &str, pages: Vec<Vec<Account>>) -> Self {
        self.follows.insert(actor.to_string(), pages);
        self
    }

    /// Page `index` (0-based) of `actor`'s follow list always fails.
    pub fn fail_page(mut self, actor: &str, index: usize) -> Self {
        self.failing_pages.insert(actor.to_string(), index);
        self
    }

    pub fn fail_profile(mut self, actor: &str) -> Self {
        self.failing_profiles.insert(actor.to_string());
        self
    }

    /// The first `failures` follow requests for `actor` fail with a transient error.
    pub fn flaky_follows(self, actor: &str, failures: u32) -> Self {
        if let Ok(mut flaky) = self.flaky.lock() {
            flaky.insert(actor.to_string(), failures);
        }
        self
    }

    /// Follow requests for `actor` never complete.
    pub fn hang_follows(mut self, actor: &str) -> Self {
        self.hanging.insert(actor.to_string());
        self
    }

    /// Page `index` (0-based) of `actor`'s follow list never completes.
    pub fn hang_page(mut self, actor: &str, index: usize) -> Self {
        self.hanging_pages.insert(actor.to_string(), index);
        self
    }

    /// Every page for `actor` hands back the same cursor.
    pub fn stuck_cursor(mut self, actor: &str) -> Self {
        self.stuck.insert(actor.to_string());
        self
    }

    /// The last page for `actor` points back at the first one.
    pub fn cycling_cursor(mut self, actor: &str) -> Self {
        self.cycling.insert(actor.to_string());
        self
    }

    /// Delay every request, so concurrent workers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn follow_requests(&self, actor: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, Request::Follows { actor: a, .. } if a == actor))
            .count()
    }

    pub fn requested_limits(&self, actor: &str) -> Vec<u32> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Follows { actor: a, limit, .. } if a == actor => Some(limit),
                _ => None,
            })
            .collect()
    }

    /// Highest number of requests that were outstanding at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, request: Request) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }

    fn take_flaky_failure(&self, actor: &str) -> bool {
        let Ok(mut flaky) = self.flaky.lock() else {
            return false;
        };
        match flaky.get_mut(actor) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn page_index(cursor: Option<&str>) -> usize {
    cursor
        .and_then(|c| c.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl FollowGraph for MockGraph {
    async fn profile(&self, actor: &str) -> Result<Account, BskyError> {
        self.record(Request::Profile {
            actor: actor.to_string(),
        });
        let _guard = self.enter();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing_profiles.contains(actor) {
            return Err(BskyError::Api {
                status: 500,
                message: format!("MockGraph: profile failure injected for {actor}"),
            });
        }
        self.profiles
            .get(actor)
            .cloned()
            .ok_or_else(|| BskyError::NotFound(actor.to_string()))
    }

    async fn follows_page(
        &self,
        actor: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<FollowPage, BskyError> {
        self.record(Request::Follows {
            actor: actor.to_string(),
            cursor: cursor.map(str::to_string),
            limit,
        });
        let _guard = self.enter();
        if self.hanging.contains(actor) {
            std::future::pending::<()>().await;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.take_flaky_failure(actor) {
            return Err(BskyError::Network(format!("MockGraph: flaky failure for {actor}")));
        }

        let Some(pages) = self.follows.get(actor) else {
            return Err(BskyError::NotFound(actor.to_string()));
        };

        let index = page_index(cursor);
        if self.hanging_pages.get(actor) == Some(&index) {
            std::future::pending::<()>().await;
        }
        if self.failing_pages.get(actor) == Some(&index) {
            return Err(BskyError::Api {
                status: 500,
                message: format!("MockGraph: page {index} failure injected for {actor}"),
            });
        }

        let accounts = pages.get(index).cloned().unwrap_or_default();
        let cursor = if self.stuck.contains(actor) {
            Some("page-stuck".to_string())
        } else if index + 1 < pages.len() {
            Some(format!("page-{}", index + 1))
        } else if self.cycling.contains(actor) {
            Some("page-0".to_string())
        } else {
            None
        };
        Ok(FollowPage { accounts, cursor })
    }
}
