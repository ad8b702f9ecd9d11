use std::collections::HashSet;

use tracing::debug;

use crate::title::normalize::{QuerySource, SearchQuery, normalize, variations};
use crate::translate::Translator;

/// Target languages in priority order. `max_languages` takes a prefix.
pub const LANGUAGE_PRIORITY: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "ru", "ja", "zh", "ko", "ar", "hi",
];

/// Curated alternate-script variants for titles where machine translation is
/// unavailable or unreliable. Keyed by the normalized English title.
const CURATED_VARIANTS: &[(&str, &[&str])] = &[
    ("the art of war", &["孫子兵法", "el arte de la guerra"]),
    ("the little prince", &["le petit prince", "el principito", "星の王子さま"]),
    ("don quixote", &["don quijote de la mancha", "дон кихот"]),
    ("war and peace", &["война и мир", "guerre et paix"]),
    (
        "one hundred years of solitude",
        &["cien años de soledad", "百年の孤独"],
    ),
];

/// Expands a title into search queries: the lexical variations, best-effort
/// translations of the normalized form, and any curated variants. Translation
/// failures contribute nothing and never propagate.
pub async fn expand<T: Translator>(
    raw: &str,
    translator: Option<&T>,
    max_languages: usize,
) -> Vec<SearchQuery> {
    let normalized = normalize(raw);

    let mut queries = variations(raw);
    let mut seen: HashSet<String> = queries.iter().map(|q| q.text.clone()).collect();
    let mut push = |text: String, source: QuerySource| {
        if !text.is_empty() && text != normalized && seen.insert(text.clone()) {
            queries.push(SearchQuery { text, source });
        }
    };

    if let Some(translator) = translator {
        for lang in LANGUAGE_PRIORITY.iter().take(max_languages) {
            match translator.translate(&normalized, lang).await {
                Ok(translated) => push(translated, QuerySource::Translated),
                Err(e) => debug!(lang, error = %e, "translation skipped"),
            }
        }
    }

    if let Some((_, curated)) = CURATED_VARIANTS.iter().find(|(title, _)| *title == normalized) {
        for variant in *curated {
            push((*variant).to_string(), QuerySource::Translated);
        }
    }

    queries
}
