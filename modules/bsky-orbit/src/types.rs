use bsky_client::{ProfileView, ProfileViewDetailed};
use serde::{Deserialize, Serialize};

const PROFILE_URL_BASE: &str = "https://bsky.app/profile/";

/// Snapshot of an account as first observed during a run. Never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// DID. Stable across handle changes.
    pub identifier: String,
    pub handle: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    /// Zero when the record came from a follow list (which does not carry counts).
    pub followers_count: u64,
}

impl Account {
    pub fn new(identifier: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            handle: handle.into(),
            display_name: None,
            bio: None,
            followers_count: 0,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn with_followers(mut self, count: u64) -> Self {
        self.followers_count = count;
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<ProfileView> for Account {
    fn from(view: ProfileView) -> Self {
        Self {
            identifier: view.did,
            handle: view.handle,
            display_name: non_empty(view.display_name),
            bio: non_empty(view.description),
            followers_count: 0,
        }
    }
}

impl From<ProfileViewDetailed> for Account {
    fn from(profile: ProfileViewDetailed) -> Self {
        Self {
            identifier: profile.did,
            handle: profile.handle,
            display_name: non_empty(profile.display_name),
            bio: non_empty(profile.description),
            followers_count: profile.followers_count,
        }
    }
}

/// One page of a follow list, already normalized: an empty cursor is `None`.
#[derive(Debug, Clone, Default)]
pub struct FollowPage {
    pub accounts: Vec<Account>,
    pub cursor: Option<String>,
}

/// A second-hop account and how many distinct first-hop accounts follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub account: Account,
    pub support: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCandidate {
    /// 1-based.
    pub rank: usize,
    pub candidate: Candidate,
}

/// A single row of the final output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rank: usize,
    pub handle: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub bio: String,
    #[serde(rename = "followersCount")]
    pub followers_count: u64,
    #[serde(rename = "followedByCount")]
    pub followed_by_count: u32,
    pub url: String,
}

impl Recommendation {
    /// A row with no profile metadata overlaid yet.
    pub fn bare(ranked: &RankedCandidate) -> Self {
        let account = &ranked.candidate.account;
        Self {
            rank: ranked.rank,
            handle: account.handle.clone(),
            display_name: String::new(),
            bio: String::new(),
            followers_count: 0,
            followed_by_count: ranked.candidate.support,
            url: profile_url(&account.handle),
        }
    }

    /// Display name, falling back to the handle when the account has none.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.handle
        } else {
            &self.display_name
        }
    }
}

pub fn profile_url(handle: &str) -> String {
    format!("{PROFILE_URL_BASE}{handle}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_url_is_derived_from_handle() {
        assert_eq!(
            profile_url("jay.bsky.team"),
            "https://bsky.app/profile/jay.bsky.team"
        );
    }

    #[test]
    fn blank_profile_fields_become_none() {
        let account: Account = ProfileViewDetailed {
            did: "did:plc:x".into(),
            handle: "x.bsky.social".into(),
            display_name: Some("  ".into()),
            description: Some(String::new()),
            followers_count: 12,
            follows_count: 3,
        }
        .into();
        assert_eq!(account.display_name, None);
        assert_eq!(account.bio, None);
        assert_eq!(account.followers_count, 12);
    }

    #[test]
    fn label_falls_back_to_handle() {
        let ranked = RankedCandidate {
            rank: 1,
            candidate: Candidate {
                account: Account::new("did:plc:x", "x.bsky.social"),
                support: 4,
            },
        };
        let mut rec = Recommendation::bare(&ranked);
        assert_eq!(rec.label(), "x.bsky.social");
        assert_eq!(rec.followed_by_count, 4);
        assert_eq!(rec.url, "https://bsky.app/profile/x.bsky.social");

        rec.display_name = "Ex".into();
        assert_eq!(rec.label(), "Ex");
    }

    #[test]
    fn recommendation_serializes_with_camel_case_fields() {
        let rec = Recommendation {
            rank: 1,
            handle: "x.bsky.social".into(),
            display_name: "Ex".into(),
            bio: "hello".into(),
            followers_count: 10,
            followed_by_count: 2,
            url: profile_url("x.bsky.social"),
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["displayName"], "Ex");
        assert_eq!(value["followersCount"], 10);
        assert_eq!(value["followedByCount"], 2);
    }
}
