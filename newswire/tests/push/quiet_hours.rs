use chrono::{NaiveTime, TimeZone, Utc};

use newswire::{
    ChannelPrefs, DeviceKind, MessageKind, Priority, PushMessage, QuietHours, Subscription,
    SubscriptionStore,
};

fn quiet_sub(urgent_override: bool) -> Subscription {
    let mut s = Subscription::new("s1", "u1", DeviceKind::Mobile, "token-1");
    let quiet = QuietHours {
        start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        tz: chrono_tz::Asia::Shanghai,
    };
    for kind in [MessageKind::News, MessageKind::Alert] {
        s.prefs.insert(
            kind,
            ChannelPrefs {
                quiet_hours: Some(quiet),
                urgent_override,
                ..ChannelPrefs::default()
            },
        );
    }
    s
}

/// 23:00 Shanghai == 15:00 UTC, inside the 22:00–07:00 window.
fn late_evening() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
}

#[test]
fn medium_priority_news_is_suppressed_during_quiet_hours() {
    let store = SubscriptionStore::new();
    store.upsert(quiet_sub(true));

    let msg = PushMessage::new(MessageKind::News, "晚间资讯", "正文");
    assert!(store.resolve(&msg, late_evening(), true, |_| 0).is_empty());
}

#[test]
fn high_priority_alert_pierces_quiet_hours_when_override_allows() {
    let store = SubscriptionStore::new();
    store.upsert(quiet_sub(true));

    let mut alert = PushMessage::new(MessageKind::Alert, "盘后异动", "正文");
    alert.priority = Priority::High;
    assert_eq!(store.resolve(&alert, late_evening(), true, |_| 0).len(), 1);
}

#[test]
fn global_override_gate_blocks_even_high_priority() {
    let store = SubscriptionStore::new();
    store.upsert(quiet_sub(true));

    let mut alert = PushMessage::new(MessageKind::Alert, "盘后异动", "正文");
    alert.priority = Priority::High;
    // push.quiet_hours.urgent_override = false
    assert!(store.resolve(&alert, late_evening(), false, |_| 0).is_empty());
}

#[test]
fn channel_level_override_gate_blocks_high_priority_too() {
    let store = SubscriptionStore::new();
    store.upsert(quiet_sub(false));

    let mut alert = PushMessage::new(MessageKind::Alert, "盘后异动", "正文");
    alert.priority = Priority::High;
    assert!(store.resolve(&alert, late_evening(), true, |_| 0).is_empty());
}

#[test]
fn outside_the_window_everything_flows() {
    let store = SubscriptionStore::new();
    store.upsert(quiet_sub(true));

    // 12:00 Shanghai == 04:00 UTC.
    let midday = Utc.with_ymd_and_hms(2024, 3, 1, 4, 0, 0).unwrap();
    let msg = PushMessage::new(MessageKind::News, "午间资讯", "正文");
    assert_eq!(store.resolve(&msg, midday, true, |_| 0).len(), 1);
}
