use std::sync::Arc;

use newswire::{
    DeviceKind, MessageKind, Priority, PushMessage, PushService, StreamTransport, Subscription,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1. One duplex stream transport; a desktop client connects to it.
    let stream = Arc::new(StreamTransport::new());
    let mut connection = stream.connect("desktop-token-1");

    let service = PushService::builder()
        .transport(DeviceKind::Desktop, stream)
        .build()?;
    service.start();

    // 2. Subscribe the device to alert messages.
    let sub = Subscription::new("", "user-1", DeviceKind::Desktop, "desktop-token-1");
    service.store().upsert(sub);

    // 3. Send a high-priority alert.
    let mut msg = PushMessage::new(MessageKind::Alert, "300750 突破年内新高", "盘中快讯");
    msg.priority = Priority::High;
    let message_id = service.enqueue(msg)?;

    // 4. The connected client receives it.
    let received = connection.recv().await.expect("delivery arrives");
    println!("received: {} ({})", received.title, received.id);

    // 5. Delivery accounting is visible through analytics.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let analytics = service.analytics(1);
    println!(
        "sent={} delivered={} (message {message_id})",
        analytics.totals.sent, analytics.totals.delivered
    );

    service.shutdown().await;
    Ok(())
}
