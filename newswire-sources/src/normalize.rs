//! Normalisation helpers shared by every adapter.

use chrono::{DateTime, Utc};

use newswire_types::NewsItem;

/// Clamp a parsed publish time into the valid range. Unparseable or
/// implausibly-future stamps fall back to one minute in the past, which
/// keeps the `published_at <= now + skew` invariant without dropping items.
#[must_use]
pub fn normalize_publish(parsed: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    // 5 minutes of tolerated provider clock skew.
    let skew = chrono::TimeDelta::minutes(5);
    match parsed {
        Some(t) if t <= now + skew => t,
        _ => now - chrono::TimeDelta::minutes(1),
    }
}

/// Whether an item mentions the requested symbol in its title, summary, or
/// the provider's native symbol field. An empty symbol disables filtering.
#[must_use]
pub fn mentions_symbol(item: &NewsItem, symbol: &str, native_symbol: Option<&str>) -> bool {
    if symbol.is_empty() {
        return true;
    }
    if native_symbol.is_some_and(|s| s.contains(symbol)) {
        return true;
    }
    item.title.contains(symbol)
        || item.summary.contains(symbol)
        || item.symbols.contains(symbol)
}

/// Split a provider keyword string ("a,b,c" or "a b c") into tags.
#[must_use]
pub fn split_keywords(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split([',', '，', ' ', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
