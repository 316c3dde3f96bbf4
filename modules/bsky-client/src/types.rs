use serde::{Deserialize, Serialize};

/// Full profile returned by `app.bsky.actor.getProfile`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileViewDetailed {
    pub did: String,
    pub handle: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "followersCount", default)]
    pub followers_count: u64,
    #[serde(rename = "followsCount", default)]
    pub follows_count: u64,
}

/// Abbreviated profile used as the entries of a follow list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileView {
    pub did: String,
    pub handle: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub description: Option<String>,
}

/// One page of `app.bsky.graph.getFollows`.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowsPage {
    #[serde(default)]
    pub follows: Vec<ProfileView>,
    pub cursor: Option<String>,
}

impl FollowsPage {
    /// The continuation cursor, with the empty string treated as "no more pages".
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// XRPC error envelope, e.g. `{"error":"InvalidRequest","message":"Profile not found"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct XrpcErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl XrpcErrorBody {
    pub fn is_not_found(&self) -> bool {
        let message = self.message.as_deref().unwrap_or_default().to_lowercase();
        message.contains("not found")
            || message.contains("could not find")
            || matches!(self.error.as_deref(), Some("ActorNotFound") | Some("NotFound"))
    }
}
