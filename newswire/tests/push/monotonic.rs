use std::sync::Arc;
use std::time::Duration;

use crate::helpers::ScriptedTransport;

use newswire::{
    AckEvent, DeliveryStatus, DeviceKind, MessageKind, PushMessage, PushService, Subscription,
    TransportError,
};

async fn wait_for_status(
    service: &PushService,
    delivery_id: &str,
    status: DeliveryStatus,
) -> newswire::Delivery {
    for _ in 0..200 {
        if let Some(d) = service.delivery(delivery_id)
            && d.status == status
        {
            return d;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("delivery {delivery_id} never reached {status:?}");
}

fn service_with(transport: Arc<ScriptedTransport>) -> PushService {
    let service = PushService::builder()
        .transport(DeviceKind::Mobile, transport)
        .build()
        .unwrap();
    service
        .store()
        .upsert(Subscription::new("s1", "u1", DeviceKind::Mobile, "token-1"));
    service.start();
    service
}

/// A delivery walks forward through its state machine and never back.
#[tokio::test]
async fn acks_only_move_forward() {
    let transport = Arc::new(ScriptedTransport::new());
    let service = service_with(Arc::clone(&transport));

    let id = service
        .enqueue(PushMessage::new(MessageKind::News, "标题", "正文"))
        .unwrap();
    let delivery = service.deliveries_for_message(&id).remove(0);

    let delivered = wait_for_status(&service, &delivery.id, DeliveryStatus::Delivered).await;
    assert!(delivered.delivered_at.is_some());
    assert_eq!(delivered.attempts, 1);

    service.ack(&delivery.id, AckEvent::Read).unwrap();
    // A late transport ack must not regress the record.
    service.ack(&delivery.id, AckEvent::Delivered).unwrap();
    let d = service.delivery(&delivery.id).unwrap();
    assert_eq!(d.status, DeliveryStatus::Read);
    assert!(d.read_at.is_some());

    service.ack(&delivery.id, AckEvent::Clicked).unwrap();
    let d = service.delivery(&delivery.id).unwrap();
    assert_eq!(d.status, DeliveryStatus::Clicked);

    service.shutdown().await;
}

/// Failed is terminal: no ack can resurrect it.
#[tokio::test]
async fn failed_is_a_terminal_sink() {
    let transport = Arc::new(ScriptedTransport::with_script(vec![Err(
        TransportError::Permanent("dead token".to_string()),
    )]));
    let service = service_with(Arc::clone(&transport));

    let id = service
        .enqueue(PushMessage::new(MessageKind::News, "标题", "正文"))
        .unwrap();
    let delivery = service.deliveries_for_message(&id).remove(0);

    let failed = wait_for_status(&service, &delivery.id, DeliveryStatus::Failed).await;
    assert!(failed.last_error.is_some());

    service.ack(&delivery.id, AckEvent::Delivered).unwrap();
    assert_eq!(
        service.delivery(&delivery.id).unwrap().status,
        DeliveryStatus::Failed
    );

    // Permanent failure also deactivates the subscription.
    assert!(!service.store().get("s1").unwrap().active);

    service.shutdown().await;
}

#[tokio::test]
async fn unknown_delivery_acks_are_not_found() {
    let transport = Arc::new(ScriptedTransport::new());
    let service = service_with(transport);
    assert!(service.ack("nope", AckEvent::Read).is_err());
    service.shutdown().await;
}
