use std::cmp::Ordering;

use crate::types::{Candidate, RankedCandidate};

/// Highest support first; equal support falls back to identifier order so the
/// ranking is reproducible across runs.
fn by_support(a: &Candidate, b: &Candidate) -> Ordering {
    b.support
        .cmp(&a.support)
        .then_with(|| a.account.identifier.cmp(&b.account.identifier))
}

/// Sort candidates, keep the first `top_n`, and number them from 1.
pub fn rank(candidates: impl IntoIterator<Item = Candidate>, top_n: usize) -> Vec<RankedCandidate> {
    let mut sorted: Vec<Candidate> = candidates.into_iter().collect();
    sorted.sort_by(by_support);
    sorted.truncate(top_n);
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| RankedCandidate {
            rank: i + 1,
            candidate,
        })
        .collect()
}
