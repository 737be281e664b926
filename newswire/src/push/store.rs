//! Subscription store and recipient resolution.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use newswire_types::{NewswireError, Priority, PushMessage, Subscription};

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, Subscription>,
    by_user: HashMap<String, BTreeSet<String>>,
    // (user id, device token) → subscription id; enforces the uniqueness
    // invariant and makes upsert a replace.
    by_token: HashMap<(String, String), String>,
}

/// In-memory store of device subscriptions with a secondary index by user.
///
/// A single reader-writer lock serialises mutations; resolution takes only
/// the read side and never blocks other readers.
#[derive(Default)]
pub struct SubscriptionStore {
    inner: RwLock<Inner>,
}

impl SubscriptionStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a subscription keyed by `(user_id, device_token)`.
    /// A replace keeps the existing subscription id. Returns the id.
    pub fn upsert(&self, mut sub: Subscription) -> String {
        let mut inner = self.inner.write().expect("subscription lock poisoned");
        let key = (sub.user_id.clone(), sub.device_token.clone());
        if let Some(existing) = inner.by_token.get(&key) {
            sub.id = existing.clone();
        } else if sub.id.is_empty() {
            sub.id = uuid::Uuid::new_v4().to_string();
        }
        let id = sub.id.clone();
        inner
            .by_user
            .entry(sub.user_id.clone())
            .or_default()
            .insert(id.clone());
        inner.by_token.insert(key, id.clone());
        inner.by_id.insert(id.clone(), sub);
        id
    }

    /// Mark a subscription inactive without removing it.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    pub fn deactivate(&self, id: &str) -> Result<(), NewswireError> {
        let mut inner = self.inner.write().expect("subscription lock poisoned");
        match inner.by_id.get_mut(id) {
            Some(sub) => {
                sub.active = false;
                Ok(())
            }
            None => Err(NewswireError::not_found(format!("subscription {id}"))),
        }
    }

    /// Remove a subscription entirely.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    pub fn delete(&self, id: &str) -> Result<(), NewswireError> {
        let mut inner = self.inner.write().expect("subscription lock poisoned");
        let Some(sub) = inner.by_id.remove(id) else {
            return Err(NewswireError::not_found(format!("subscription {id}")));
        };
        if let Some(set) = inner.by_user.get_mut(&sub.user_id) {
            set.remove(id);
            if set.is_empty() {
                inner.by_user.remove(&sub.user_id);
            }
        }
        inner.by_token.remove(&(sub.user_id, sub.device_token));
        Ok(())
    }

    /// Look up a subscription by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Subscription> {
        self.inner
            .read()
            .expect("subscription lock poisoned")
            .by_id
            .get(id)
            .cloned()
    }

    /// All subscriptions of a user, id-ordered.
    #[must_use]
    pub fn for_user(&self, user_id: &str) -> Vec<Subscription> {
        let inner = self.inner.read().expect("subscription lock poisoned");
        inner
            .by_user
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.by_id.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of stored subscriptions (active or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("subscription lock poisoned")
            .by_id
            .len()
    }

    /// True when the store holds no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a message to its recipient set. Pure: no side effects, no cap
    /// accounting (the pipeline owns that, feeding counts back through
    /// `sent_today`).
    ///
    /// Matching order: active → target selector → channel → per-channel
    /// preferences → quiet hours → daily cap. Non-empty target selectors are
    /// OR'd; a message with no selector targets everyone.
    #[must_use]
    pub fn resolve(
        &self,
        msg: &PushMessage,
        now: DateTime<Utc>,
        global_urgent_override: bool,
        sent_today: impl Fn(&Subscription) -> u32,
    ) -> Vec<Subscription> {
        let inner = self.inner.read().expect("subscription lock poisoned");
        let mut out: Vec<Subscription> = inner
            .by_id
            .values()
            .filter(|sub| sub.active)
            .filter(|sub| Self::matches_target(sub, msg))
            .filter(|sub| sub.channels.contains(&msg.kind))
            .filter(|sub| {
                let prefs = sub.prefs_for(msg.kind);
                if !prefs.enabled {
                    return false;
                }
                if !prefs.categories.is_empty()
                    && !msg.category.is_empty()
                    && !prefs.categories.contains(&msg.category)
                {
                    return false;
                }
                if prefs.min_priority.is_some_and(|min| msg.priority < min) {
                    return false;
                }
                if let Some(quiet) = &prefs.quiet_hours
                    && quiet.contains(now)
                {
                    let override_ok = global_urgent_override
                        && prefs.urgent_override
                        && msg.priority == Priority::High;
                    if !override_ok {
                        return false;
                    }
                }
                if let Some(cap) = prefs.max_per_day
                    && sent_today(sub) >= cap
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    fn matches_target(sub: &Subscription, msg: &PushMessage) -> bool {
        let target = &msg.target;
        if target.is_broadcast() {
            return true;
        }
        if target.user_ids.contains(&sub.user_id) {
            return true;
        }
        if target.symbols.iter().any(|s| sub.watch_symbols.contains(s)) {
            return true;
        }
        target.sectors.iter().any(|s| sub.watch_sectors.contains(s))
    }
}
