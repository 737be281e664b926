use std::sync::Arc;
use std::time::Duration;

use crate::helpers::ScriptedTransport;

use newswire::{
    BackoffConfig, DeliveryStatus, DeviceKind, MessageKind, PushConfig, PushMessage, PushService,
    Subscription, TransportError,
};

fn retry_config() -> PushConfig {
    PushConfig {
        sender_workers: 2,
        max_attempts: 5,
        retry: BackoffConfig {
            start_ms: 1_000,
            cap_ms: 60_000,
            factor: 2,
            jitter_percent: 0,
        },
        ..PushConfig::default()
    }
}

fn service_with(transport: Arc<ScriptedTransport>, cfg: PushConfig) -> PushService {
    let service = PushService::builder()
        .config(cfg)
        .transport(DeviceKind::Mobile, transport)
        .build()
        .unwrap();
    service
        .store()
        .upsert(Subscription::new("s1", "u1", DeviceKind::Mobile, "token-1"));
    service.start();
    service
}

async fn wait_for<F: Fn(&newswire::Delivery) -> bool>(
    service: &PushService,
    delivery_id: &str,
    pred: F,
) -> newswire::Delivery {
    for _ in 0..10_000 {
        if let Some(d) = service.delivery(delivery_id)
            && pred(&d)
        {
            return d;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("delivery {delivery_id} never satisfied the predicate");
}

/// Four transient failures then success: the delivery lands `delivered`
/// with five attempts after 1+2+4+8 seconds of exponential backoff.
#[tokio::test(start_paused = true)]
async fn transient_failures_back_off_exponentially() {
    let transient = |msg: &str| Err(TransportError::Transient(msg.to_string()));
    let transport = Arc::new(ScriptedTransport::with_script(vec![
        transient("congestion"),
        transient("congestion"),
        transient("congestion"),
        transient("congestion"),
        Ok(()),
    ]));
    let service = service_with(Arc::clone(&transport), retry_config());

    let started = tokio::time::Instant::now();
    let id = service
        .enqueue(PushMessage::new(MessageKind::News, "标题", "正文"))
        .unwrap();
    let delivery = service.deliveries_for_message(&id).remove(0);

    let done = wait_for(&service, &delivery.id, |d| {
        d.status == DeliveryStatus::Delivered
    })
    .await;
    let elapsed = started.elapsed();

    assert_eq!(done.attempts, 5);
    assert_eq!(transport.sent().len(), 5);

    // 1s + 2s + 4s + 8s of backoff, within ±10%.
    let total = Duration::from_secs(15);
    assert!(
        elapsed >= total.mul_f64(0.9) && elapsed <= total.mul_f64(1.1),
        "elapsed {elapsed:?} outside the backoff envelope"
    );

    service.shutdown().await;
}

/// The budget is five attempts; the fifth failure is recorded as `failed`.
#[tokio::test(start_paused = true)]
async fn exhausted_attempts_record_the_failed_transition() {
    let transport = Arc::new(ScriptedTransport::with_script(
        (0..5)
            .map(|_| Err(TransportError::Transient("still down".to_string())))
            .collect(),
    ));
    let service = service_with(Arc::clone(&transport), retry_config());

    let id = service
        .enqueue(PushMessage::new(MessageKind::News, "标题", "正文"))
        .unwrap();
    let delivery = service.deliveries_for_message(&id).remove(0);

    let done = wait_for(&service, &delivery.id, |d| {
        d.status == DeliveryStatus::Failed
    })
    .await;
    assert_eq!(done.attempts, 5);
    assert_eq!(transport.sent().len(), 5);
    assert_eq!(done.last_error.as_deref(), Some("still down"));

    // A transient-exhausted failure must not deactivate the subscription.
    assert!(service.store().get("s1").unwrap().active);

    service.shutdown().await;
}

/// Expiry mid-retry parks the delivery in `expired`, not `failed`.
/// Wall-clock backoff here: expiry is checked against the real clock.
#[tokio::test(flavor = "multi_thread")]
async fn expiry_during_retry_wins_over_further_attempts() {
    let transport = Arc::new(ScriptedTransport::with_script(
        (0..10)
            .map(|_| Err(TransportError::Transient("still down".to_string())))
            .collect(),
    ));
    let cfg = PushConfig {
        max_attempts: 10,
        retry: BackoffConfig {
            start_ms: 50,
            cap_ms: 60_000,
            factor: 2,
            jitter_percent: 0,
        },
        ..PushConfig::default()
    };
    let service = service_with(Arc::clone(&transport), cfg);

    let mut msg = PushMessage::new(MessageKind::News, "标题", "正文");
    msg.expires_at = Some(chrono::Utc::now() + chrono::TimeDelta::milliseconds(120));
    let id = service.enqueue(msg).unwrap();
    let delivery = service.deliveries_for_message(&id).remove(0);

    let done = wait_for(&service, &delivery.id, |d| {
        d.status == DeliveryStatus::Expired
    })
    .await;
    // The expiry check trips between attempts, well before the budget.
    assert!(done.attempts < 10);

    service.shutdown().await;
}

/// An already-expired message is rejected synchronously.
#[tokio::test]
async fn expired_message_is_rejected_at_enqueue() {
    let transport = Arc::new(ScriptedTransport::new());
    let service = service_with(transport, retry_config());

    let mut msg = PushMessage::new(MessageKind::News, "标题", "正文");
    msg.expires_at = Some(chrono::Utc::now() - chrono::TimeDelta::minutes(1));
    assert!(matches!(
        service.enqueue(msg),
        Err(newswire::NewswireError::Expired { .. })
    ));
    service.shutdown().await;
}
