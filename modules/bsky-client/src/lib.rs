pub mod error;
pub mod types;

pub use error::{BskyError, Result};
pub use types::{FollowsPage, ProfileView, ProfileViewDetailed, XrpcErrorBody};

use std::time::Duration;

use serde::de::DeserializeOwned;

/// Public, unauthenticated AppView endpoint.
pub const DEFAULT_BASE_URL: &str = "https://public.api.bsky.app/xrpc";

/// Largest `limit` the getFollows endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

const USER_AGENT: &str = "bsky-orbit/1.0";

const GET_PROFILE: &str = "app.bsky.actor.getProfile";
const GET_FOLLOWS: &str = "app.bsky.graph.getFollows";

pub struct BskyClient {
    client: reqwest::Client,
    base_url: String,
}

impl BskyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the detailed profile for a handle or DID.
    pub async fn get_profile(&self, actor: &str) -> Result<ProfileViewDetailed> {
        self.get(GET_PROFILE, actor, &[("actor", actor)]).await
    }

    /// Fetch one page of the accounts `actor` follows. Pass the cursor from the
    /// previous page to continue; `None` starts from the beginning.
    pub async fn get_follows(
        &self,
        actor: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<FollowsPage> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut query = vec![("actor", actor), ("limit", limit.as_str())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let page: FollowsPage = self.get(GET_FOLLOWS, actor, &query).await?;
        tracing::trace!(actor, count = page.follows.len(), has_next = page.next_cursor().is_some(), "Fetched follows page");
        Ok(page)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        actor: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        let resp = self.client.get(&url).query(query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), body, actor));
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Map a non-2xx response to a typed error. The AppView reports unknown actors
/// as `400 InvalidRequest` with a "not found" message rather than a 404.
fn classify_failure(status: u16, body: String, actor: &str) -> BskyError {
    if status == 404 {
        return BskyError::NotFound(actor.to_string());
    }
    if status == 400 {
        if let Ok(parsed) = serde_json::from_str::<XrpcErrorBody>(&body) {
            if parsed.is_not_found() {
                return BskyError::NotFound(actor.to_string());
            }
        }
    }
    BskyError::Api {
        status,
        message: body,
    }
}
