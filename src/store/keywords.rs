//! Fallback keyword extraction for ingested memories that arrive without
//! caller-supplied keywords.

use std::collections::HashMap;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "of", "to", "in", "on", "for", "with", "is", "are",
    "was", "were", "be", "been", "being", "it", "this", "that", "as", "at", "by", "from", "i",
    "you", "he", "she", "we", "they", "my", "your", "his", "her", "our", "their", "not", "so",
    "if", "then", "than", "do", "does", "did", "have", "has", "had", "about", "into", "over",
];

const MAX_KEYWORDS: usize = 8;

/// Derives a small, frequency-ranked, stopword-filtered keyword set from
/// free text. Purely a fallback for ingestion when the caller supplies no
/// `keywords[]` — never overrides caller-supplied keywords.
pub fn extract_keywords(content: &str) -> Vec<String> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for raw in content.split(|c: char| !c.is_alphanumeric()) {
        if raw.len() < 3 {
            continue;
        }
        let word = raw.to_lowercase();
        if STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if !counts.contains_key(&word) {
            order.push(word.clone());
        }
        *counts.entry(word).or_insert(0) += 1;
    }

    let mut ranked: Vec<String> = order;
    ranked.sort_by(|a, b| counts[b].cmp(&counts[a]).then_with(|| a.cmp(b)));
    ranked.truncate(MAX_KEYWORDS);
    ranked
}

/// Case-folds and dedups a caller-supplied keyword list, preserving first
/// occurrence order.
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for kw in keywords {
        let folded = kw.trim().to_lowercase();
        if folded.is_empty() {
            continue;
        }
        if seen.insert(folded.clone()) {
            out.push(folded);
        }
    }
    out
}
