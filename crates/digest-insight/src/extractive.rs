//! Extractive text helpers backing the offline generator.

use std::collections::{HashMap, HashSet};

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "was", "are", "were", "to", "of", "in", "for", "on", "with", "and",
    "or", "but", "not", "it", "this", "that", "as", "at", "by", "from", "after", "over", "has",
    "have", "will", "its", "new", "says", "said",
];

/// Split on `.` `!` `?` followed by whitespace, and on line breaks.
/// Leading list markers (`-`, `*`, `•`) are stripped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut result = Vec::new();
    for line in text.lines() {
        let line = line
            .trim()
            .trim_start_matches(['-', '*', '•'])
            .trim_start();
        let mut start = 0;
        let mut chars = line.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if matches!(c, '.' | '!' | '?') {
                if let Some(&(_, next)) = chars.peek() {
                    if next.is_whitespace() {
                        push_trimmed(&mut result, &line[start..i + c.len_utf8()]);
                        start = i + c.len_utf8();
                    }
                }
            }
        }
        push_trimmed(&mut result, &line[start..]);
    }
    result
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, s: &'a str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s);
    }
}

/// Score sentences by `unique words * sqrt(total words)` and keep the best
/// `top_k`, best first. Duplicate sentences are kept once; ties keep input
/// order.
pub fn rank_sentences<'a>(sentences: &[&'a str], top_k: usize) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut scored: Vec<(f64, &'a str)> = sentences
        .iter()
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(|sent| {
            let words: Vec<&str> = sent.split_whitespace().collect();
            let unique: HashSet<&str> = words.iter().copied().collect();
            let score = (unique.len() as f64) * (words.len() as f64).sqrt();
            (score, *sent)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(top_k).map(|(_, s)| s).collect()
}

/// Headline-style title from the most frequent meaningful bigram across
/// `lines`. Ties go to the bigram seen first. Returns `None` when no line has
/// two meaningful words in a row.
pub fn frequent_bigram_title(lines: &[&str]) -> Option<String> {
    let mut counts: HashMap<(String, String), (usize, usize)> = HashMap::new();
    let mut order = 0usize;

    for line in lines {
        let words = meaningful_words(line);
        for pair in words.windows(2) {
            let entry = counts
                .entry((pair[0].clone(), pair[1].clone()))
                .or_insert((0, order));
            entry.0 += 1;
            order += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
        .map(|((w1, w2), _)| format!("{} {}", capitalize(&w1), capitalize(&w2)))
}

fn meaningful_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.to_lowercase()
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// First `max_words` words of `text`.
pub fn leading_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}
