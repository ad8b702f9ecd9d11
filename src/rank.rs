use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::Candidate;
use crate::fetch::{self, FetchError};
use crate::phash::{self, CoverHash, HashError};
use crate::pipeline::CancelFlag;

#[derive(Debug, Clone, Serialize)]
pub struct ScoredMatch {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Percentage in [0, 100], two decimals.
    pub similarity: f64,
    /// Raw Hamming distance behind the percentage.
    pub distance: u32,
    /// Candidate cover hash, for display and audit.
    pub hash: String,
    /// True when the candidate came from the title-based tier.
    pub title_match: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RankOptions {
    /// Minimum similarity percentage to keep a match.
    pub threshold: f64,
    pub top_n: usize,
    /// 1 is strictly sequential; larger values fetch covers through an
    /// order-preserving bounded stream, so results stay deterministic.
    pub concurrency: usize,
}

#[derive(Debug)]
pub struct RankOutcome {
    pub matches: Vec<ScoredMatch>,
    /// Candidates whose covers were actually fetched, hashed, and compared.
    pub compared: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RankError {
    #[error("ranking cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
enum CoverError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Compares every candidate cover against the target hash. A fetch or decode
/// failure skips that candidate only. Matches come back sorted by similarity
/// descending (ties keep discovery order) and truncated to `top_n`.
pub async fn rank(
    http: &Client,
    target: &CoverHash,
    candidates: &[Candidate],
    title_match: bool,
    opts: &RankOptions,
    cancel: &CancelFlag,
    mut on_progress: impl FnMut(usize, usize, &str),
) -> Result<RankOutcome, RankError> {
    let total = candidates.len();
    let mut matches: Vec<ScoredMatch> = Vec::new();
    let mut compared = 0usize;

    // The map closure runs when `buffered` pulls the next item, so the
    // notification goes out before that candidate's fetch is initiated,
    // in input order.
    let hashes = stream::iter(candidates.iter().enumerate())
        .map(|(index, candidate)| {
            on_progress(index + 1, total, &candidate.title);
            async move { (index, fetch_and_hash(http, candidate).await) }
        })
        .buffered(opts.concurrency.max(1));
    let mut hashes = std::pin::pin!(hashes);

    while let Some((index, outcome)) = hashes.next().await {
        if cancel.is_cancelled() {
            return Err(RankError::Cancelled);
        }
        let candidate = &candidates[index];

        let hash = match outcome {
            Ok(hash) => hash,
            Err(e) => {
                warn!(title = %candidate.title, url = %candidate.cover_url, error = %e,
                    "candidate skipped");
                continue;
            }
        };

        compared += 1;
        let distance = target.distance(&hash);
        let similarity = phash::similarity(distance);
        if similarity >= opts.threshold {
            matches.push(ScoredMatch {
                candidate: candidate.clone(),
                similarity,
                distance,
                hash: hash.to_hex(),
                title_match,
            });
        }
    }

    debug!(compared, kept = matches.len(), "ranking complete");
    Ok(RankOutcome {
        matches: sort_and_truncate(matches, opts.top_n),
        compared,
    })
}

async fn fetch_and_hash(http: &Client, candidate: &Candidate) -> Result<CoverHash, CoverError> {
    let bytes = fetch::download_image(http, &candidate.cover_url).await?;
    Ok(phash::hash_bytes(&bytes)?)
}

fn sort_and_truncate(mut matches: Vec<ScoredMatch>, top_n: usize) -> Vec<ScoredMatch> {
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches.truncate(top_n);
    matches
}
