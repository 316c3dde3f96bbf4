pub mod aggregate;
pub mod cancel;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fetcher;
pub mod orbit;
pub mod pacing;
pub mod progress;
pub mod rank;
pub mod render;
pub mod retry;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod text;
pub mod traits;
pub mod types;

pub use cancel::CancellationToken;
pub use config::OrbitConfig;
pub use error::OrbitError;
pub use orbit::{normalize_handle, Orbit, Report, RunStats};
pub use progress::{Progress, ProgressReporter};
pub use traits::FollowGraph;
pub use types::{Account, Candidate, FollowPage, RankedCandidate, Recommendation};
