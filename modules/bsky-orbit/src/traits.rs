// FollowGraph is the only seam between the engine and the network. BskyClient
// implements it for real runs; testing::MockGraph implements it in memory.

use async_trait::async_trait;
use bsky_client::{BskyClient, BskyError};

use crate::types::{Account, FollowPage};

#[async_trait]
pub trait FollowGraph: Send + Sync {
    /// Look up one account's profile by handle or identifier.
    async fn profile(&self, actor: &str) -> Result<Account, BskyError>;

    /// Fetch one page of the accounts `actor` follows.
    async fn follows_page(
        &self,
        actor: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<FollowPage, BskyError>;
}

#[async_trait]
impl FollowGraph for BskyClient {
    async fn profile(&self, actor: &str) -> Result<Account, BskyError> {
        Ok(self.get_profile(actor).await?.into())
    }

    async fn follows_page(
        &self,
        actor: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<FollowPage, BskyError> {
        let page = self.get_follows(actor, cursor, limit).await?;
        let cursor = page.next_cursor().map(str::to_string);
        Ok(FollowPage {
            accounts: page.follows.into_iter().map(Account::from).collect(),
            cursor,
        })
    }
}
