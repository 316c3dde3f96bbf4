use std::fmt;
use std::sync::Arc;

/// Milestones of a run, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The origin's follow list is in.
    FollowsFound { count: usize },
    /// One first-hop account's follow list has been counted.
    Hop { done: usize, total: usize, handle: String },
    /// Profile lookups for the top `count` candidates are starting.
    Enriching { count: usize },
    /// One recommendation's profile lookup finished (or was skipped).
    Profile { done: usize, total: usize, handle: String },
}

/// Callback sink for [`Progress`] events. The default reports nothing.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<Arc<dyn Fn(&Progress) + Send + Sync>>,
}

impl ProgressReporter {
    pub fn new(callback: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: Progress) {
        if let Some(callback) = &self.callback {
            callback(&event);
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("active", &self.callback.is_some())
            .finish()
    }
}
