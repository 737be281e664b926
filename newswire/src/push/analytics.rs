//! Read-only rollups over the delivery log.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use newswire_core::calendar;
use newswire_types::{Delivery, DeliveryStatus, PushAnalytics};

/// Fold a delivery snapshot into per-message, per-day, and per-device
/// rollups for the trailing `window_days`.
///
/// Counters derive from the monotone status ladder, so the identities
/// `delivered <= sent`, `read <= delivered`, and `clicked <= read` hold for
/// any snapshot, including one taken mid-flight.
#[must_use]
pub fn compute_analytics(
    deliveries: &[Delivery],
    window_days: u32,
    tz: Tz,
    now: DateTime<Utc>,
) -> PushAnalytics {
    let cutoff = now - chrono::TimeDelta::days(i64::from(window_days.max(1)));
    let mut out = PushAnalytics::default();

    let mut delivery_ms_sum = 0.0f64;
    let mut delivery_ms_count = 0u64;

    for d in deliveries {
        if d.created_at < cutoff {
            continue;
        }

        let (sent, delivered, read, clicked) = match d.status {
            DeliveryStatus::Pending => (false, false, false, false),
            DeliveryStatus::Sent => (true, false, false, false),
            DeliveryStatus::Delivered => (true, true, false, false),
            DeliveryStatus::Read => (true, true, true, false),
            DeliveryStatus::Clicked => (true, true, true, true),
            DeliveryStatus::Failed | DeliveryStatus::Expired => (false, false, false, false),
        };

        let msg = out.by_message.entry(d.message_id.clone()).or_default();
        let day = out
            .by_day
            .entry(calendar::local_day(d.created_at, tz))
            .or_default();
        let device = out.by_device.entry(d.device).or_default();

        if sent {
            out.totals.sent += 1;
            msg.sent += 1;
            day.sent += 1;
            device.sent += 1;
        }
        if delivered {
            out.totals.delivered += 1;
            msg.delivered += 1;
            day.delivered += 1;
            device.delivered += 1;
            if let Some(at) = d.delivered_at {
                delivery_ms_sum += (at - d.created_at).num_milliseconds().max(0) as f64;
                delivery_ms_count += 1;
            }
        }
        if read {
            out.totals.read += 1;
            msg.read += 1;
            day.read += 1;
        }
        if clicked {
            out.totals.clicked += 1;
            msg.clicked += 1;
            day.clicked += 1;
        }
        match d.status {
            DeliveryStatus::Failed => {
                out.totals.failed += 1;
                msg.failed += 1;
            }
            DeliveryStatus::Expired => {
                out.totals.expired += 1;
                msg.expired += 1;
            }
            _ => {}
        }
    }

    out.delivery_rate = rate(out.totals.delivered, out.totals.sent);
    out.read_rate = rate(out.totals.read, out.totals.delivered);
    out.click_rate = rate(out.totals.clicked, out.totals.read);
    out.avg_delivery_ms = if delivery_ms_count == 0 {
        0.0
    } else {
        delivery_ms_sum / delivery_ms_count as f64
    };
    out
}

fn rate(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
