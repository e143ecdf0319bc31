use regex::Regex;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s']+").expect("static regex"));

/// Canonical form of a transcribed utterance: lowercase, no punctuation
/// (apostrophes inside words survive), single spaces, trimmed.
pub fn normalize(input: &str) -> String {
    let lowered = input.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, " ");
    stripped
        .split_whitespace()
        .map(|word| word.trim_matches('\''))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whitespace tokens of an already-normalized string.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}
