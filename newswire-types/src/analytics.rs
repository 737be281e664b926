//! Push delivery analytics rollups.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::push::DeviceKind;

/// Counters for one message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageStats {
    /// Deliveries handed to a transport.
    pub sent: u64,
    /// Deliveries acked by a transport.
    pub delivered: u64,
    /// Deliveries opened by the user.
    pub read: u64,
    /// Deliveries tapped through.
    pub clicked: u64,
    /// Deliveries that ended failed.
    pub failed: u64,
    /// Deliveries that expired before transmission.
    pub expired: u64,
}

/// Counters for one calendar day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DayStats {
    /// Deliveries handed to a transport.
    pub sent: u64,
    /// Deliveries acked by a transport.
    pub delivered: u64,
    /// Deliveries opened by the user.
    pub read: u64,
    /// Deliveries tapped through.
    pub clicked: u64,
}

/// Per-device-kind counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceStats {
    /// Deliveries handed to a transport.
    pub sent: u64,
    /// Deliveries acked by a transport.
    pub delivered: u64,
}

/// Aggregated view over the delivery log for a trailing window.
///
/// Identities hold by construction: `delivered <= sent`, `read <= delivered`,
/// `clicked <= read` (counters are derived from the monotone status ranks).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PushAnalytics {
    /// Totals across the window.
    pub totals: MessageStats,
    /// Delivered / sent; 0 when nothing was sent.
    pub delivery_rate: f64,
    /// Read / delivered; 0 when nothing was delivered.
    pub read_rate: f64,
    /// Clicked / read; 0 when nothing was read.
    pub click_rate: f64,
    /// Mean milliseconds from delivery creation to transport ack.
    pub avg_delivery_ms: f64,
    /// Per-message breakdown.
    pub by_message: BTreeMap<String, MessageStats>,
    /// Per-day rollup in the analytics zone.
    pub by_day: BTreeMap<NaiveDate, DayStats>,
    /// Per-device-kind breakdown.
    pub by_device: BTreeMap<DeviceKind, DeviceStats>,
}
