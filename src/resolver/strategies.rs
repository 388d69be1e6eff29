//! Query rewrites tried, in order, when a place name does not resolve verbatim.
//!
//! Every rewrite is a pure function of the name and the location hint and may
//! yield zero or more queries. Order matters: the resolver stops at the first
//! strategy that produces a match.

use crate::models::LocationHint;

/// A named query rewrite
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub rewrite: fn(&str, &LocationHint) -> Vec<String>,
}

pub const STRATEGIES: [Strategy; 6] = [
    Strategy {
        name: "raw",
        rewrite: raw_name,
    },
    Strategy {
        name: "before_comma",
        rewrite: before_comma,
    },
    Strategy {
        name: "without_parentheses",
        rewrite: without_parentheses,
    },
    Strategy {
        name: "inside_parentheses",
        rewrite: inside_parentheses,
    },
    Strategy {
        name: "with_city",
        rewrite: with_city,
    },
    Strategy {
        name: "longest_tokens",
        rewrite: longest_tokens,
    },
];

const MIN_FRAGMENT_CHARS: usize = 3;
const MAX_TOKENS: usize = 3;

fn is_open(c: char) -> bool {
    c == '(' || c == '（'
}

fn is_close(c: char) -> bool {
    c == ')' || c == '）'
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" ,", ",")
}

fn non_empty(query: String) -> Vec<String> {
    if query.is_empty() { vec![] } else { vec![query] }
}

/// Remove every parenthetical segment, nested ones included
#[must_use]
pub fn strip_parentheticals(text: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_open(c) {
            depth += 1;
        } else if is_close(c) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            out.push(c);
        }
    }
    collapse_whitespace(&out)
}

/// Lowercased, trimmed, single-spaced form used for cache keys and de-duplication
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 1. The name as given
pub fn raw_name(name: &str, _hint: &LocationHint) -> Vec<String> {
    non_empty(name.trim().to_string())
}

/// 2. Text before the first comma, with any parenthetical label dropped
pub fn before_comma(name: &str, _hint: &LocationHint) -> Vec<String> {
    match name.split_once(',') {
        Some((head, _)) => non_empty(strip_parentheticals(head).trim().to_string()),
        None => vec![],
    }
}

/// 3. The name without parenthetical segments
pub fn without_parentheses(name: &str, _hint: &LocationHint) -> Vec<String> {
    if !name.chars().any(is_open) {
        return vec![];
    }
    non_empty(strip_parentheticals(name))
}

/// 4. Content of the first parenthetical segment, often the local-language name
pub fn inside_parentheses(name: &str, _hint: &LocationHint) -> Vec<String> {
    let Some(open) = name.find(is_open) else {
        return vec![];
    };
    let rest = &name[open..];
    let rest = &rest[rest.chars().next().map_or(0, char::len_utf8)..];
    let inner = match rest.find(is_close) {
        Some(close) => &rest[..close],
        None => rest,
    };
    let inner = collapse_whitespace(inner);
    if inner.chars().count() >= MIN_FRAGMENT_CHARS {
        vec![inner]
    } else {
        vec![]
    }
}

/// 5. The name followed by the hinted city
pub fn with_city(name: &str, hint: &LocationHint) -> Vec<String> {
    let name = name.trim();
    let city = hint.city.trim();
    if name.is_empty() || city.is_empty() {
        return vec![];
    }
    vec![format!("{name} {city}")]
}

/// 6. Up to three longest distinct tokens, longest first
pub fn longest_tokens(name: &str, _hint: &LocationHint) -> Vec<String> {
    let mut tokens: Vec<&str> = Vec::new();
    for token in name.split(|c: char| !c.is_alphanumeric()) {
        if token.chars().count() >= MIN_FRAGMENT_CHARS
            && !tokens.iter().any(|t| t.eq_ignore_ascii_case(token))
        {
            tokens.push(token);
        }
    }
    // stable sort keeps original order among equal lengths
    tokens.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));
    tokens
        .into_iter()
        .take(MAX_TOKENS)
        .map(str::to_string)
        .collect()
}
