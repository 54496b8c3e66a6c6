//! Fuzzy entity-name matching.
//!
//! Token-set similarity: both names are reduced to word sets, so word order,
//! duplicate words, and extra words on either side don't drag the score down.
//! Legal-form suffixes ("Inc.", "LLC", "Corp") are dropped before comparing.

use std::collections::BTreeSet;

use similar::TextDiff;

const LEGAL_SUFFIXES: &[&str] = &[
    "inc",
    "llc",
    "corp",
    "corporation",
    "co",
    "company",
    "ltd",
    "limited",
    "lp",
    "llp",
    "plc",
];

/// Lowercased alphanumeric word set. Suffix words are removed unless the name
/// consists of nothing else.
fn tokens(name: &str) -> BTreeSet<String> {
    let normalized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let words: BTreeSet<String> = normalized.split_whitespace().map(str::to_string).collect();
    let core: BTreeSet<String> = words
        .iter()
        .filter(|w| !LEGAL_SUFFIXES.contains(&w.as_str()))
        .cloned()
        .collect();

    if core.is_empty() {
        words
    } else {
        core
    }
}

/// Sequence similarity in 0.0..=1.0: 2 * matched chars / total chars.
fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

fn join_words<'a>(words: impl IntoIterator<Item = &'a String>) -> String {
    words
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

fn combine(head: &str, tail: &str) -> String {
    format!("{head} {tail}").trim().to_string()
}

/// Similarity score 0..=100 between a candidate name and a target name.
/// Symmetric: `score(a, b) == score(b, a)`. Blank input scores 0.
pub fn score(candidate: &str, target: &str) -> u8 {
    let a = tokens(candidate);
    let b = tokens(target);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let sect = join_words(a.intersection(&b));
    let only_a = join_words(a.difference(&b));
    let only_b = join_words(b.difference(&a));

    let with_a = combine(&sect, &only_a);
    let with_b = combine(&sect, &only_b);

    let best = ratio(&sect, &with_a)
        .max(ratio(&sect, &with_b))
        .max(ratio(&with_a, &with_b));

    (best * 100.0).round().clamp(0.0, 100.0) as u8
}

/// True when the candidate scores at least `threshold` against the target.
/// An absent candidate never matches.
pub fn matches(candidate: Option<&str>, target: &str, threshold: u8) -> bool {
    match candidate {
        Some(name) if !name.trim().is_empty() => score(name, target) >= threshold,
        _ => false,
    }
}
