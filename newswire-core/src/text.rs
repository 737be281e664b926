//! Tokenisation and set-similarity helpers shared by dedup and clustering.

use std::collections::HashSet;

/// Whether a char belongs to the CJK unified ranges (plus extension A).
/// CJK text carries no word boundaries, so each ideograph is its own token.
const fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

/// Lowercased token set: ASCII/alphabetic runs become word tokens, CJK
/// ideographs become single-char tokens, everything else separates.
#[must_use]
pub fn tokens(s: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    let mut word = String::new();
    for ch in s.chars().flat_map(char::to_lowercase) {
        if is_cjk(ch) {
            if !word.is_empty() {
                out.insert(std::mem::take(&mut word));
            }
            out.insert(ch.to_string());
        } else if ch.is_alphanumeric() {
            word.push(ch);
        } else if !word.is_empty() {
            out.insert(std::mem::take(&mut word));
        }
    }
    if !word.is_empty() {
        out.insert(word);
    }
    out
}

/// Token-set Jaccard similarity. Two empty sets compare equal (1.0); one
/// empty set against a non-empty one is fully dissimilar (0.0).
#[must_use]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    if union == 0 {
        1.0
    } else {
        inter as f64 / union as f64
    }
}

/// First `n` Unicode code points of `s`. Multi-byte safe: never slices
/// inside a character.
#[must_use]
pub fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
