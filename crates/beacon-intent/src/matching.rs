//! Local lexical matching of a phrase against the cached values.
//!
//! Both matchers scan the value list in order and never reorder it, so
//! "first in list order" is the tie-break everywhere.

use std::collections::HashSet;

use beacon_core::Value;

use crate::text::{clean_snippet, keywords, tokens};

/// Minimum overlap score for [`best_match`] to accept a value.
pub const MATCH_THRESHOLD: f64 = 0.25;

/// First value whose lowercased statement contains the cleaned snippet.
pub fn find_by_snippet<'a>(values: &'a [Value], snippet: &str) -> Option<&'a Value> {
    let needle = clean_snippet(snippet);
    if needle.is_empty() {
        return None;
    }
    values.iter().find(|value| {
        value
            .active_statement()
            .is_some_and(|s| s.to_lowercase().contains(&needle))
    })
}

/// Overlap score of `keywords` against one statement.
///
/// Counts query keywords that appear as a statement token or as a substring
/// of the statement, divided by the number of distinct statement tokens. The
/// denominator is the statement side, not the query side.
pub fn overlap_score(keywords: &HashSet<String>, statement: &str) -> f64 {
    let lowered = statement.to_lowercase();
    let statement_tokens: HashSet<String> = tokens(&lowered).into_iter().collect();
    let matches = keywords
        .iter()
        .filter(|k| statement_tokens.contains(*k) || lowered.contains(k.as_str()))
        .count();
    matches as f64 / statement_tokens.len().max(1) as f64
}

/// Value with the strictly highest overlap score for `text`, provided the
/// score reaches [`MATCH_THRESHOLD`].
pub fn best_match<'a>(values: &'a [Value], text: &str) -> Option<&'a Value> {
    let query: HashSet<String> = keywords(text).into_iter().collect();
    if query.is_empty() {
        return None;
    }

    let mut best: Option<&Value> = None;
    let mut best_score = 0.0;
    for value in values {
        let Some(statement) = value.active_statement() else {
            continue;
        };
        let score = overlap_score(&query, statement);
        if score > best_score {
            best_score = score;
            best = Some(value);
        }
    }

    if best_score >= MATCH_THRESHOLD {
        best
    } else {
        None
    }
}
