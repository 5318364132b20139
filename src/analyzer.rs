//! Query analysis: pulls language hints, path filters, and content keywords
//! out of a free-form question.
//!
//! - **Languages** come from a fixed keyword table matched case-insensitively
//!   as substrings; each canonical language is added once.
//! - **Path globs** follow phrases like `in directory` or `from path`; the
//!   text after the phrase up to the next punctuation mark becomes a glob,
//!   wrapped as `*<p>*` when the user gave no wildcard.
//! - **Keywords** are the lowercased, punctuation-stripped words left after
//!   removing stop words and single characters. The retriever only uses
//!   keywords longer than three characters.

/// Filters extracted from a natural-language query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilters {
    pub languages: Vec<String>,
    pub path_globs: Vec<String>,
    pub keywords: Vec<String>,
}

/// Free-text hint → canonical language label. Matched in order; first
/// occurrence of each canonical label wins.
const LANGUAGE_KEYWORDS: &[(&str, &str)] = &[
    ("golang", "Go"),
    ("go code", "Go"),
    ("python", "Python"),
    ("py", "Python"),
    ("javascript", "JavaScript"),
    ("js", "JavaScript"),
    ("typescript", "TypeScript"),
    ("ts", "TypeScript"),
    ("java", "Java"),
    ("c#", "C#"),
    ("csharp", "C#"),
    ("c++", "C++"),
    ("cpp", "C++"),
    ("ruby", "Ruby"),
    ("rust", "Rust"),
    ("php", "PHP"),
    ("swift", "Swift"),
    ("kotlin", "Kotlin"),
    ("scala", "Scala"),
    ("shell", "Shell"),
    ("bash", "Shell"),
    ("sql", "SQL"),
];

const PATH_PHRASES: &[&str] = &[
    "in directory",
    "in dir",
    "in folder",
    "in path",
    "from directory",
    "from dir",
    "from folder",
    "from path",
];

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "do", "does", "did", "to", "from",
    "in", "out", "on", "off", "over", "under", "again", "further", "then",
    "once", "here", "there", "when", "where", "why", "how", "all", "any",
    "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "can",
    "will", "just", "should", "now",
];

const PATH_TERMINATORS: &str = ".,:;!?";

/// Extract language, path, and keyword filters from a query.
pub fn analyze(query: &str) -> QueryFilters {
    QueryFilters {
        languages: detect_languages(query),
        path_globs: extract_path_globs(query),
        keywords: extract_keywords(query),
    }
}

fn detect_languages(query: &str) -> Vec<String> {
    let query_lower = query.to_ascii_lowercase();
    let mut languages: Vec<String> = Vec::new();

    for (keyword, language) in LANGUAGE_KEYWORDS {
        if query_lower.contains(keyword) && !languages.iter().any(|l| l == language) {
            languages.push((*language).to_string());
        }
    }

    languages
}

fn extract_path_globs(query: &str) -> Vec<String> {
    // ASCII lowercasing preserves byte offsets, so indexes found in the
    // lowered copy slice the original query safely.
    let query_lower = query.to_ascii_lowercase();
    let mut globs = Vec::new();

    for phrase in PATH_PHRASES {
        let Some(idx) = query_lower.find(phrase) else {
            continue;
        };
        let start = idx + phrase.len();
        if start >= query.len() {
            continue;
        }

        let path_text = &query[start..];
        let end = path_text
            .find(|c| PATH_TERMINATORS.contains(c))
            .unwrap_or(path_text.len());

        let path = path_text[..end]
            .trim_matches(|c: char| c == ' ' || c == '\t' || c == '"' || c == '\'');
        if path.is_empty() {
            continue;
        }

        let glob = if path.contains('*') {
            path.to_string()
        } else {
            format!("*{}*", path)
        };
        globs.push(glob);
    }

    globs
}

/// Lowercase, split on whitespace, strip surrounding punctuation, and drop
/// empties, single characters, and stop words.
pub fn extract_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| ".,;:!?()[]{}-\"'`".contains(c)))
        .filter(|word| word.len() > 1 && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Convert a glob pattern to an anchored regex.
///
/// The pattern is regex-escaped first, then the escaped wildcards are
/// rewritten: `\*` → `.*` and `\?` → `.`.
pub fn glob_to_regex(pattern: &str) -> String {
    let escaped = regex::escape(pattern);
    let converted = escaped.replace("\\*", ".*").replace("\\?", ".");
    format!("^{}$", converted)
}
