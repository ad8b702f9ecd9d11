use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{Candidate, CatalogSearch};
use crate::pipeline::CancelFlag;
use crate::title::{expand, extract_from_filename};
use crate::translate::Translator;

/// Which search tier populated the candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMethod {
    /// Title variations found candidates.
    TitleBased,
    /// The title tier was skipped; the generic query found candidates.
    Generic,
    /// The title tier ran but came up empty; the generic query found candidates.
    GenericFallback,
    /// Nothing found on any tier.
    None,
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            SearchMethod::TitleBased => "title-based",
            SearchMethod::Generic => "generic",
            SearchMethod::GenericFallback => "generic-fallback",
            SearchMethod::None => "none",
        };
        f.write_str(tag)
    }
}

#[derive(Debug)]
pub struct SearchOutcome {
    /// Deduplicated candidates in discovery order.
    pub candidates: Vec<Candidate>,
    pub method: SearchMethod,
    /// The query that drove the winning tier: the extracted title for
    /// `TitleBased`, the fallback query otherwise.
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results_per_variation: u32,
    pub max_generic_results: u32,
    /// Extracted titles at or below this length skip the title tier.
    pub min_title_len: usize,
    pub max_languages: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results_per_variation: 5,
            max_generic_results: 20,
            min_title_len: 2,
            max_languages: 3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search cancelled")]
    Cancelled,
}

/// Two-tier candidate search: title variations first, one generic query as
/// the fallback. A failure on one variation never aborts the others; only
/// cancellation aborts the call.
pub async fn find_candidates<C, T>(
    catalog: &C,
    translator: Option<&T>,
    image_name: &str,
    fallback_query: &str,
    opts: &SearchOptions,
    cancel: &CancelFlag,
) -> Result<SearchOutcome, SearchError>
where
    C: CatalogSearch,
    T: Translator,
{
    let title = extract_from_filename(image_name);
    let mut attempted = false;

    if !image_name.is_empty() && title.chars().count() > opts.min_title_len {
        attempted = true;
        let candidates = search_title_tier(catalog, translator, &title, opts, cancel).await?;
        if !candidates.is_empty() {
            return Ok(SearchOutcome {
                candidates,
                method: SearchMethod::TitleBased,
                query: title,
            });
        }
        debug!(%title, "title tier empty, falling back to generic search");
    }

    if cancel.is_cancelled() {
        return Err(SearchError::Cancelled);
    }

    let candidates = match catalog
        .search(fallback_query, 1, opts.max_generic_results)
        .await
    {
        Ok(found) => found
            .into_iter()
            .filter(|c| !c.cover_url.is_empty())
            .collect::<Vec<_>>(),
        Err(e) => {
            warn!(query = fallback_query, error = %e, "generic search failed");
            Vec::new()
        }
    };

    let method = if candidates.is_empty() {
        SearchMethod::None
    } else if attempted {
        SearchMethod::GenericFallback
    } else {
        SearchMethod::Generic
    };

    Ok(SearchOutcome {
        candidates,
        method,
        query: fallback_query.to_string(),
    })
}

async fn search_title_tier<C, T>(
    catalog: &C,
    translator: Option<&T>,
    title: &str,
    opts: &SearchOptions,
    cancel: &CancelFlag,
) -> Result<Vec<Candidate>, SearchError>
where
    C: CatalogSearch,
    T: Translator,
{
    let queries = expand(title, translator, opts.max_languages).await;

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for query in &queries {
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        let found = match catalog
            .search(&query.text, 1, opts.max_results_per_variation)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(query = %query.text, error = %e, "variation search failed (continuing)");
                continue;
            }
        };

        for candidate in found {
            if candidate.cover_url.is_empty() {
                continue;
            }
            // First-seen wins; unidentified candidates cannot be deduplicated.
            let fresh = match &candidate.id {
                Some(id) => seen.insert(id.clone()),
                None => true,
            };
            if fresh {
                candidates.push(candidate);
            }
        }
    }

    debug!(
        variations = queries.len(),
        count = candidates.len(),
        "title tier complete"
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::translate::HttpTranslator;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct MockCatalog {
        responses: Mutex<VecDeque<Result<Vec<Candidate>, CatalogError>>>,
        queries: Mutex<Vec<String>>,
    }

    impl MockCatalog {
        fn with(responses: Vec<Result<Vec<Candidate>, CatalogError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn captured_queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl CatalogSearch for MockCatalog {
        async fn search(
            &self,
            query: &str,
            _page: u32,
            _page_size: u32,
        ) -> Result<Vec<Candidate>, CatalogError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn make_candidate(id: Option<&str>, title: &str) -> Candidate {
        Candidate {
            id: id.map(String::from),
            title: title.to_string(),
            authors: vec![],
            publisher: None,
            published: None,
            cover_url: format!("https://covers.example/{title}.jpg"),
        }
    }

    fn coverless(id: &str, title: &str) -> Candidate {
        Candidate {
            cover_url: String::new(),
            ..make_candidate(Some(id), title)
        }
    }

    async fn run(
        catalog: &MockCatalog,
        image_name: &str,
        fallback: &str,
    ) -> Result<SearchOutcome, SearchError> {
        find_candidates(
            catalog,
            None::<&HttpTranslator>,
            image_name,
            fallback,
            &SearchOptions::default(),
            &CancelFlag::new(),
        )
        .await
    }

    #[tokio::test]
    async fn title_search_deduplicates_across_variations() {
        // "The_Hobbit.jpg" expands to "the hobbit" / "The Hobbit" / "hobbit";
        // the same ISBN shows up in all of them.
        let catalog = MockCatalog::with(vec![
            Ok(vec![make_candidate(Some("isbn-1"), "A")]),
            Ok(vec![
                make_candidate(Some("isbn-1"), "A"),
                make_candidate(Some("isbn-2"), "B"),
            ]),
            Ok(vec![make_candidate(Some("isbn-2"), "B")]),
        ]);

        let outcome = run(&catalog, "The_Hobbit.jpg", "book").await.unwrap();

        assert_eq!(outcome.method, SearchMethod::TitleBased);
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].id.as_deref(), Some("isbn-1"));
        assert_eq!(outcome.candidates[1].id.as_deref(), Some("isbn-2"));
        assert_eq!(outcome.query, "The Hobbit");
    }

    #[tokio::test]
    async fn unidentified_candidates_are_kept_as_unique() {
        let catalog = MockCatalog::with(vec![
            Ok(vec![make_candidate(None, "X")]),
            Ok(vec![make_candidate(None, "X")]),
        ]);

        let outcome = run(&catalog, "The_Hobbit.jpg", "book").await.unwrap();
        assert_eq!(outcome.candidates.len(), 2);
    }

    #[tokio::test]
    async fn variation_failure_does_not_abort_others() {
        let catalog = MockCatalog::with(vec![
            Err(CatalogError::RateLimited),
            Ok(vec![make_candidate(Some("isbn-1"), "A")]),
        ]);

        let outcome = run(&catalog, "The_Hobbit.jpg", "book").await.unwrap();
        assert_eq!(outcome.method, SearchMethod::TitleBased);
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[tokio::test]
    async fn empty_title_tier_falls_back_to_generic() {
        let catalog = MockCatalog::with(vec![
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![make_candidate(Some("isbn-9"), "Fallback")]),
        ]);

        let outcome = run(&catalog, "The_Hobbit.jpg", "fantasy novel").await.unwrap();

        assert_eq!(outcome.method, SearchMethod::GenericFallback);
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.query, "fantasy novel");
        let queries = catalog.captured_queries();
        assert_eq!(queries.last().map(String::as_str), Some("fantasy novel"));
    }

    #[tokio::test]
    async fn empty_image_name_goes_straight_to_generic() {
        let catalog = MockCatalog::with(vec![Ok(vec![make_candidate(Some("isbn-1"), "G")])]);

        let outcome = run(&catalog, "", "mystery").await.unwrap();

        assert_eq!(outcome.method, SearchMethod::Generic);
        assert_eq!(catalog.captured_queries(), vec!["mystery"]);
    }

    #[tokio::test]
    async fn short_title_skips_title_tier() {
        let catalog = MockCatalog::with(vec![Ok(vec![make_candidate(Some("isbn-1"), "G")])]);

        let outcome = run(&catalog, "ab.jpg", "mystery").await.unwrap();

        assert_eq!(outcome.method, SearchMethod::Generic);
        assert_eq!(catalog.captured_queries(), vec!["mystery"]);
    }

    #[tokio::test]
    async fn nothing_found_anywhere_is_method_none() {
        let catalog = MockCatalog::with(vec![]);

        let outcome = run(&catalog, "The_Hobbit.jpg", "book").await.unwrap();

        assert_eq!(outcome.method, SearchMethod::None);
        assert!(outcome.candidates.is_empty());
    }

    #[tokio::test]
    async fn generic_failure_is_tolerated_as_none() {
        let catalog = MockCatalog::with(vec![Err(CatalogError::RateLimited)]);

        let outcome = run(&catalog, "", "mystery").await.unwrap();

        assert_eq!(outcome.method, SearchMethod::None);
        assert!(outcome.candidates.is_empty());
    }

    #[tokio::test]
    async fn coverless_candidates_never_enter_the_outcome() {
        let catalog = MockCatalog::with(vec![Ok(vec![
            coverless("isbn-1", "NoCover"),
            make_candidate(Some("isbn-2"), "Cover"),
        ])]);

        let outcome = run(&catalog, "The_Hobbit.jpg", "book").await.unwrap();
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].id.as_deref(), Some("isbn-2"));
    }

    #[tokio::test]
    async fn cancellation_aborts_between_variations() {
        let catalog = MockCatalog::with(vec![]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = find_candidates(
            &catalog,
            None::<&HttpTranslator>,
            "The_Hobbit.jpg",
            "book",
            &SearchOptions::default(),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(SearchError::Cancelled)));
        assert!(catalog.captured_queries().is_empty());
    }
}
