//! Text normalisation shared by the matchers.

use std::sync::LazyLock;

use regex::Regex;

/// Words that carry no information about *which* value the user means.
/// Only ever stripped from the query side.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "the", "an", "and", "or", "to", "of", "with", "that", "this", "it", "value",
    "values", "one", "can", "we", "i", "im", "i'm", "want", "like", "not", "really", "just",
    "maybe", "please",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Lowercase and blank out everything outside `[a-z0-9\s]`.
fn scrub(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Normalise a free-text snippet for substring search: lowercase,
/// punctuation to spaces, whitespace collapsed, trimmed.
pub fn clean_snippet(text: &str) -> String {
    scrub(text.trim()).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All tokens of `text` after scrubbing.
pub fn tokens(text: &str) -> Vec<String> {
    scrub(text).split_whitespace().map(str::to_string).collect()
}

/// Query tokens: like [`tokens`] but without stop words.
pub fn keywords(text: &str) -> Vec<String> {
    tokens(text).into_iter().filter(|t| !is_stop_word(t)).collect()
}

/// Compile a literal phrase into a case-insensitive matcher.
pub(crate) fn phrase_regex(phrase: &str) -> Regex {
    // Escaped literals always compile.
    Regex::new(&format!("(?i){}", regex::escape(phrase))).unwrap()
}

/// Remove every occurrence of each phrase (case-insensitive), leaving a space.
pub fn strip_phrases(text: &str, phrases: &[Regex]) -> String {
    let mut cleaned = text.to_string();
    for re in phrases {
        cleaned = re.replace_all(&cleaned, " ").to_string();
    }
    cleaned
}

static COLLAPSE_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse runs of whitespace into single spaces and trim.
pub fn squash_whitespace(text: &str) -> String {
    COLLAPSE_WS.replace_all(text.trim(), " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_snippet_strips_punctuation_and_collapses() {
        assert_eq!(clean_snippet("  Family, friends &   FUN! "), "family friends fun");
        assert_eq!(clean_snippet("?!"), "");
    }

    #[test]
    fn keywords_drop_stop_words() {
        assert_eq!(
            keywords("I really want the one about my Career!"),
            vec!["my", "career"]
        );
    }

    #[test]
    fn apostrophes_split_tokens() {
        assert_eq!(tokens("don't"), vec!["don", "t"]);
        assert_eq!(keywords("I'm"), vec!["m"]);
    }

    #[test]
    fn tokens_keep_stop_words() {
        assert_eq!(
            tokens("Being present with family"),
            vec!["being", "present", "with", "family"]
        );
    }

    #[test]
    fn strip_phrases_is_case_insensitive() {
        let res = [phrase_regex("get rid of"), phrase_regex("delete")];
        assert_eq!(
            squash_whitespace(&strip_phrases("Get Rid Of the gym one, DELETE it", &res)),
            "the gym one, it"
        );
    }

    #[test]
    fn phrase_regex_escapes_metacharacters() {
        let re = phrase_regex("don't (want)");
        assert!(re.is_match("I DON'T (WANT) that"));
        assert!(!re.is_match("dont want"));
    }
}
