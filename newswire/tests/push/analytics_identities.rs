use std::sync::Arc;
use std::time::Duration;

use crate::helpers::ScriptedTransport;

use newswire::{
    AckEvent, DeliveryStatus, DeviceKind, MessageKind, PushMessage, PushService, Subscription,
    TransportError,
};

async fn wait_settled(service: &PushService, message_id: &str) {
    for _ in 0..200 {
        let deliveries = service.deliveries_for_message(message_id);
        if !deliveries.is_empty()
            && deliveries.iter().all(|d| {
                matches!(
                    d.status,
                    DeliveryStatus::Delivered | DeliveryStatus::Failed | DeliveryStatus::Expired
                )
            })
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("message {message_id} never settled");
}

/// The counting identities hold over a mixed log: some failures, partial
/// read and click acks, several devices.
#[tokio::test(flavor = "multi_thread")]
async fn funnel_identities_hold_across_a_mixed_log() {
    // Recipient 3's sends fail permanently; the rest succeed.
    let transport = Arc::new(ScriptedTransport::new());
    let failing = Arc::new(ScriptedTransport::with_script(vec![Err(
        TransportError::Permanent("dead token".to_string()),
    )]));

    let service = PushService::builder()
        .transport(DeviceKind::Mobile, Arc::clone(&transport))
        .transport(DeviceKind::Web, Arc::clone(&failing))
        .build()
        .unwrap();

    for i in 0..3 {
        service.store().upsert(Subscription::new(
            format!("s{i}"),
            format!("u{i}"),
            DeviceKind::Mobile,
            format!("token-{i}"),
        ));
    }
    service.store().upsert(Subscription::new(
        "s-web",
        "u-web",
        DeviceKind::Web,
        "web-token",
    ));
    service.start();

    let id = service
        .enqueue(PushMessage::new(MessageKind::News, "组合测试", "正文"))
        .unwrap();
    wait_settled(&service, &id).await;

    // Two of the delivered recipients read, one clicks through.
    let deliveries = service.deliveries_for_message(&id);
    let delivered: Vec<_> = deliveries
        .iter()
        .filter(|d| d.status == DeliveryStatus::Delivered)
        .collect();
    assert_eq!(delivered.len(), 3);
    service.ack(&delivered[0].id, AckEvent::Read).unwrap();
    service.ack(&delivered[1].id, AckEvent::Read).unwrap();
    service.ack(&delivered[1].id, AckEvent::Clicked).unwrap();

    let analytics = service.analytics(7);
    assert_eq!(analytics.totals.sent, 3);
    assert_eq!(analytics.totals.delivered, 3);
    assert_eq!(analytics.totals.read, 2);
    assert_eq!(analytics.totals.clicked, 1);
    assert_eq!(analytics.totals.failed, 1);

    assert!(analytics.totals.delivered <= analytics.totals.sent);
    assert!(analytics.totals.read <= analytics.totals.delivered);
    assert!(analytics.totals.clicked <= analytics.totals.read);

    assert!((analytics.read_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!((analytics.click_rate - 0.5).abs() < 1e-9);
    assert!(analytics.avg_delivery_ms >= 0.0);

    // Per-device split: mobile delivered, web failed before a send counted.
    let mobile = analytics
        .by_device
        .get(&DeviceKind::Mobile)
        .cloned()
        .unwrap_or_default();
    assert_eq!(mobile.delivered, 3);
    let web = analytics
        .by_device
        .get(&DeviceKind::Web)
        .cloned()
        .unwrap_or_default();
    assert_eq!(web.sent, 0);

    service.shutdown().await;
}

/// The rollup tolerates in-flight deliveries: identities hold mid-transmission.
#[tokio::test]
async fn in_flight_snapshots_keep_identities() {
    let transport = Arc::new(ScriptedTransport::with_script(vec![Err(
        TransportError::Transient("congestion".to_string()),
    )]));
    let service = PushService::builder()
        .transport(DeviceKind::Mobile, Arc::clone(&transport))
        .build()
        .unwrap();
    service
        .store()
        .upsert(Subscription::new("s1", "u1", DeviceKind::Mobile, "token-1"));
    service.start();

    service
        .enqueue(PushMessage::new(MessageKind::News, "标题", "正文"))
        .unwrap();

    // Snapshot immediately, while the delivery is pending or retrying.
    let analytics = service.analytics(1);
    assert!(analytics.totals.delivered <= analytics.totals.sent);
    assert!(analytics.totals.read <= analytics.totals.delivered);
    assert!(analytics.totals.clicked <= analytics.totals.read);

    service.shutdown().await;
}
