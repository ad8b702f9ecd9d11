use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::catalog::CatalogSearch;
use crate::fetch::{self, FetchError};
use crate::phash::{self, HashError};
use crate::rank::{self, RankError, RankOptions, ScoredMatch};
use crate::search::{SearchError, SearchMethod, SearchOptions, find_candidates};
use crate::translate::Translator;

/// Cooperative cancellation, checked between search variations and between
/// candidate comparisons. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Url(String),
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub image: ImageSource,
    /// Filename the title tier mines for search terms. May be empty.
    pub image_name: String,
    pub fallback_query: String,
    pub search: SearchOptions,
    pub rank: RankOptions,
}

#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub target_hash: String,
    pub matches: Vec<ScoredMatch>,
    /// Candidates actually compared (fetched and hashed).
    pub compared: usize,
    pub method: SearchMethod,
    /// The query behind the winning search tier.
    pub query: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to load target image: {0}")]
    TargetFetch(#[from] FetchError),

    #[error("failed to hash target image: {0}")]
    TargetHash(#[from] HashError),

    #[error("cancelled")]
    Cancelled,
}

impl From<SearchError> for PipelineError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Cancelled => PipelineError::Cancelled,
        }
    }
}

impl From<RankError> for PipelineError {
    fn from(e: RankError) -> Self {
        match e {
            RankError::Cancelled => PipelineError::Cancelled,
        }
    }
}

/// End-to-end cover similarity search. Fatal only on a target-hash failure
/// or cancellation; everything else degrades to a best-effort result whose
/// `method` tag records what succeeded.
pub async fn run<C, T>(
    catalog: &C,
    translator: Option<&T>,
    http: &Client,
    request: &PipelineRequest,
    cancel: &CancelFlag,
    on_progress: impl FnMut(usize, usize, &str),
) -> Result<PipelineResult, PipelineError>
where
    C: CatalogSearch,
    T: Translator,
{
    let bytes: Cow<'_, [u8]> = match &request.image {
        ImageSource::Bytes(bytes) => Cow::Borrowed(bytes.as_slice()),
        ImageSource::Url(url) => Cow::Owned(fetch::download_image(http, url).await?),
    };
    let target = phash::hash_bytes(&bytes)?;
    info!(hash = %target.to_hex(), "target hash computed");

    let outcome = find_candidates(
        catalog,
        translator,
        &request.image_name,
        &request.fallback_query,
        &request.search,
        cancel,
    )
    .await?;
    info!(
        candidates = outcome.candidates.len(),
        method = %outcome.method,
        "candidate search complete"
    );

    let title_match = outcome.method == SearchMethod::TitleBased;
    let ranked = rank::rank(
        http,
        &target,
        &outcome.candidates,
        title_match,
        &request.rank,
        cancel,
        on_progress,
    )
    .await?;

    Ok(PipelineResult {
        target_hash: target.to_hex(),
        matches: ranked.matches,
        compared: ranked.compared,
        method: outcome.method,
        query: outcome.query,
    })
}
