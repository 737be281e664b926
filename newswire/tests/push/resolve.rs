use chrono::{TimeZone, Utc};

use newswire::{
    ChannelPrefs, DeviceKind, MessageKind, Priority, PushMessage, Subscription, SubscriptionStore,
};

fn noon() -> chrono::DateTime<Utc> {
    // 12:00 Shanghai == 04:00 UTC; safely outside any quiet window used here.
    Utc.with_ymd_and_hms(2024, 3, 1, 4, 0, 0).unwrap()
}

fn sub(id: &str, user: &str) -> Subscription {
    Subscription::new(id, user, DeviceKind::Mobile, format!("token-{id}"))
}

#[test]
fn inactive_subscriptions_never_match() {
    let store = SubscriptionStore::new();
    let mut s = sub("s1", "u1");
    s.active = false;
    store.upsert(s);

    let msg = PushMessage::new(MessageKind::News, "标题", "正文");
    assert!(store.resolve(&msg, noon(), true, |_| 0).is_empty());
}

#[test]
fn channel_subscription_gates_the_kind() {
    let store = SubscriptionStore::new();
    let mut s = sub("s1", "u1");
    s.channels = [MessageKind::Alert].into_iter().collect();
    store.upsert(s);

    let news = PushMessage::new(MessageKind::News, "标题", "正文");
    assert!(store.resolve(&news, noon(), true, |_| 0).is_empty());

    let alert = PushMessage::new(MessageKind::Alert, "标题", "正文");
    assert_eq!(store.resolve(&alert, noon(), true, |_| 0).len(), 1);
}

#[test]
fn user_id_selector_intersects() {
    let store = SubscriptionStore::new();
    store.upsert(sub("s1", "u1"));
    store.upsert(sub("s2", "u2"));

    let mut msg = PushMessage::new(MessageKind::News, "标题", "正文");
    msg.target.user_ids = ["u2".to_string()].into_iter().collect();

    let matched = store.resolve(&msg, noon(), true, |_| 0);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].user_id, "u2");
}

#[test]
fn symbol_selector_matches_watchlists() {
    let store = SubscriptionStore::new();
    let mut s1 = sub("s1", "u1");
    s1.watch_symbols = ["300750".to_string()].into_iter().collect();
    store.upsert(s1);
    store.upsert(sub("s2", "u2"));

    let mut msg = PushMessage::new(MessageKind::News, "标题", "正文");
    msg.target.symbols = ["300750".to_string()].into_iter().collect();

    let matched = store.resolve(&msg, noon(), true, |_| 0);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].user_id, "u1");
}

#[test]
fn category_and_min_priority_preferences_filter() {
    let store = SubscriptionStore::new();
    let mut s = sub("s1", "u1");
    s.prefs.insert(
        MessageKind::News,
        ChannelPrefs {
            categories: ["证券".to_string()].into_iter().collect(),
            min_priority: Some(Priority::Medium),
            ..ChannelPrefs::default()
        },
    );
    store.upsert(s);

    let mut wrong_category = PushMessage::new(MessageKind::News, "标题", "正文");
    wrong_category.category = "体育".to_string();
    assert!(store.resolve(&wrong_category, noon(), true, |_| 0).is_empty());

    let mut low_priority = PushMessage::new(MessageKind::News, "标题", "正文");
    low_priority.category = "证券".to_string();
    low_priority.priority = Priority::Low;
    assert!(store.resolve(&low_priority, noon(), true, |_| 0).is_empty());

    let mut ok = PushMessage::new(MessageKind::News, "标题", "正文");
    ok.category = "证券".to_string();
    assert_eq!(store.resolve(&ok, noon(), true, |_| 0).len(), 1);
}

#[test]
fn disabled_channel_preference_drops_everything() {
    let store = SubscriptionStore::new();
    let mut s = sub("s1", "u1");
    s.prefs.insert(
        MessageKind::News,
        ChannelPrefs {
            enabled: false,
            ..ChannelPrefs::default()
        },
    );
    store.upsert(s);

    let msg = PushMessage::new(MessageKind::News, "标题", "正文");
    assert!(store.resolve(&msg, noon(), true, |_| 0).is_empty());
}

#[test]
fn upsert_replaces_by_user_and_token() {
    let store = SubscriptionStore::new();
    let first = store.upsert(Subscription::new("", "u1", DeviceKind::Web, "tok"));
    let second = store.upsert(Subscription::new("", "u1", DeviceKind::Web, "tok"));
    assert_eq!(first, second);
    assert_eq!(store.len(), 1);

    let third = store.upsert(Subscription::new("", "u1", DeviceKind::Web, "other"));
    assert_ne!(first, third);
    assert_eq!(store.for_user("u1").len(), 2);
}

#[test]
fn deactivate_and_delete_report_unknown_ids() {
    let store = SubscriptionStore::new();
    assert!(store.deactivate("nope").is_err());
    assert!(store.delete("nope").is_err());

    let id = store.upsert(sub("s1", "u1"));
    store.deactivate(&id).unwrap();
    assert!(!store.get(&id).unwrap().active);
    store.delete(&id).unwrap();
    assert!(store.get(&id).is_none());
}
