use std::collections::HashSet;

/// Words that carry no signal for a catalog title search.
const STOP_WORDS: &[&str] = &["the", "a", "an", "copy", "book", "novel"];

/// Spelled-out numbers that catalogs usually index as digits.
const NUMBER_WORDS: &[(&str, &str)] = &[("one", "1"), ("two", "2"), ("three", "3")];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// Where a search query came from. First-seen tag wins on duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    Original,
    Normalized,
    Translated,
    LexicalVariant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub source: QuerySource,
}

/// Lower-cases, collapses `-`/`_` and whitespace runs to single spaces, trims.
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lexical variation set for one title: the normalized form, the original
/// input, a stop-word-stripped form, and a digit-swapped form. Deduplicated
/// by string value in first-seen order.
pub fn variations(raw: &str) -> Vec<SearchQuery> {
    let normalized = normalize(raw);

    let mut seen: HashSet<String> = HashSet::new();
    let mut queries: Vec<SearchQuery> = Vec::new();
    let mut push = |text: String, source: QuerySource| {
        if !text.is_empty() && seen.insert(text.clone()) {
            queries.push(SearchQuery { text, source });
        }
    };

    push(normalized.clone(), QuerySource::Normalized);
    push(raw.to_string(), QuerySource::Original);
    push(strip_stop_words(&normalized), QuerySource::LexicalVariant);
    push(swap_number_words(&normalized), QuerySource::LexicalVariant);

    queries
}

/// Turns an image filename into a searchable title: strips the extension,
/// replaces separators with spaces, drops a trailing `copy` / `copy (N)`,
/// collapses whitespace. Case is preserved.
pub fn extract_from_filename(filename: &str) -> String {
    let stem = strip_image_extension(filename);
    let spaced: String = stem
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect();
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_copy_suffix(&collapsed)
}

fn strip_image_extension(filename: &str) -> &str {
    if let Some((stem, ext)) = filename.rsplit_once('.')
        && IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    {
        stem
    } else {
        filename
    }
}

fn strip_copy_suffix(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    if let Some(last) = tokens.last()
        && is_copy_counter(last)
        && tokens.len() >= 2
        && tokens[tokens.len() - 2].eq_ignore_ascii_case("copy")
    {
        tokens.truncate(tokens.len() - 2);
    } else if let Some(last) = tokens.last()
        && last.eq_ignore_ascii_case("copy")
    {
        tokens.truncate(tokens.len() - 1);
    }
    tokens.join(" ")
}

/// `(N)` with at least one digit between the parens.
fn is_copy_counter(token: &str) -> bool {
    token.len() > 2
        && token.starts_with('(')
        && token.ends_with(')')
        && token[1..token.len() - 1].chars().all(|c| c.is_ascii_digit())
}

fn strip_stop_words(normalized: &str) -> String {
    normalized
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn swap_number_words(normalized: &str) -> String {
    normalized
        .split_whitespace()
        .map(|w| {
            NUMBER_WORDS
                .iter()
                .find(|(word, _)| *word == w)
                .map_or(w, |(_, digit)| *digit)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
