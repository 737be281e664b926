//! Push subscription, message, and delivery types.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Kind of end-user device behind a subscription; dictates the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Browser session (server-push transport).
    Web,
    /// Mobile app (notification-gateway transport).
    Mobile,
    /// Desktop client (duplex stream transport).
    Desktop,
}

/// Push channel / message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Aggregated or breaking news.
    News,
    /// Price or event alert.
    Alert,
    /// Analysis report.
    Analysis,
    /// Portfolio change notification.
    PortfolioUpdate,
}

/// Message urgency; ordering is Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Informational.
    Low,
    /// Default.
    Medium,
    /// Urgent; may override quiet hours.
    High,
}

/// Delivery cadence preference for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Deliver as messages arrive.
    #[default]
    Realtime,
    /// Batched hourly.
    Hourly,
    /// Batched daily.
    Daily,
}

/// A local-time window during which non-urgent messages are suppressed.
/// The window may wrap midnight (e.g. 22:00–07:00).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuietHours {
    /// Window start, subscriber-local.
    pub start: NaiveTime,
    /// Window end, subscriber-local.
    pub end: NaiveTime,
    /// Subscriber time zone.
    pub tz: Tz,
}

impl QuietHours {
    /// Whether the instant falls inside the window, evaluated in `self.tz`.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.tz).time();
        if self.start <= self.end {
            local >= self.start && local < self.end
        } else {
            // wraps midnight
            local >= self.start || local < self.end
        }
    }
}

/// Per-channel preference sub-tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPrefs {
    /// Master switch for the channel.
    pub enabled: bool,
    /// Allowed categories; empty means all.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub categories: BTreeSet<String>,
    /// Delivery cadence.
    #[serde(default)]
    pub frequency: Frequency,
    /// Daily cap for this channel; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_day: Option<u32>,
    /// Minimum message priority the channel accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_priority: Option<Priority>,
    /// Quiet-hours window, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,
    /// Whether high-priority messages may pierce quiet hours on this channel.
    pub urgent_override: bool,
}

impl Default for ChannelPrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            categories: BTreeSet::new(),
            frequency: Frequency::Realtime,
            max_per_day: None,
            min_priority: None,
            quiet_hours: None,
            urgent_override: true,
        }
    }
}

/// Device-level subscription record. `(user_id, device_token)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription id.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Device kind; selects the transport.
    pub device: DeviceKind,
    /// Opaque device/connection token handed to the transport.
    pub device_token: String,
    /// Inactive subscriptions never match.
    pub active: bool,
    /// Channels the device subscribed to.
    #[serde(default)]
    pub channels: BTreeSet<MessageKind>,
    /// Per-channel preference tree.
    #[serde(default)]
    pub prefs: BTreeMap<MessageKind, ChannelPrefs>,
    /// Stock symbols the subscriber watches; matched against message targets.
    #[serde(default)]
    pub watch_symbols: BTreeSet<String>,
    /// Sectors the subscriber watches; matched against message targets.
    #[serde(default)]
    pub watch_sectors: BTreeSet<String>,
    /// Last activity stamp.
    pub last_active: DateTime<Utc>,
}

impl Subscription {
    /// A realtime all-channels subscription for tests and examples.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        device: DeviceKind,
        device_token: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            device,
            device_token: device_token.into(),
            active: true,
            channels: [
                MessageKind::News,
                MessageKind::Alert,
                MessageKind::Analysis,
                MessageKind::PortfolioUpdate,
            ]
            .into_iter()
            .collect(),
            prefs: BTreeMap::new(),
            watch_symbols: BTreeSet::new(),
            watch_sectors: BTreeSet::new(),
            last_active: Utc::now(),
        }
    }

    /// The preference sub-tree for a channel, or the permissive default.
    #[must_use]
    pub fn prefs_for(&self, kind: MessageKind) -> ChannelPrefs {
        self.prefs.get(&kind).cloned().unwrap_or_default()
    }
}

/// The recipient selector attached to a message. Non-empty selectors are
/// OR'd; a message with every selector empty targets all active
/// subscriptions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PushTarget {
    /// Explicit user ids.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub user_ids: BTreeSet<String>,
    /// Stock symbols; matches subscriber watchlists.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub symbols: BTreeSet<String>,
    /// Sector tags; matches subscriber sector watchlists.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sectors: BTreeSet<String>,
}

impl PushTarget {
    /// True when no selector is present (broadcast).
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.user_ids.is_empty() && self.symbols.is_empty() && self.sectors.is_empty()
    }
}

/// A message handed to the push pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Message id; assigned by the pipeline when empty.
    #[serde(default)]
    pub id: String,
    /// Channel this message belongs to.
    pub kind: MessageKind,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Short summary used by constrained transports.
    #[serde(default)]
    pub summary: String,
    /// Optional click-through URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Category, matched against channel preference categories.
    #[serde(default)]
    pub category: String,
    /// Urgency.
    pub priority: Priority,
    /// Free-form tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Recipient selector.
    #[serde(default)]
    pub target: PushTarget,
    /// Optional structured payload forwarded to the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Earliest transmit time; `None` means immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_at: Option<DateTime<Utc>>,
    /// Drop without delivery once past this stamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation stamp; assigned by the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PushMessage {
    /// A medium-priority broadcast message of the given kind.
    #[must_use]
    pub fn new(kind: MessageKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind,
            title: title.into(),
            body: body.into(),
            summary: String::new(),
            url: None,
            category: String::new(),
            priority: Priority::Medium,
            tags: BTreeSet::new(),
            target: PushTarget::default(),
            payload: None,
            schedule_at: None,
            expires_at: None,
            created_at: None,
        }
    }

    /// True when the message is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now > e)
    }
}

/// Per-recipient delivery state.
///
/// Transitions are monotone along pending → sent → delivered → read →
/// clicked; failed and expired are terminal sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Created, not yet handed to a transport.
    Pending,
    /// Handed to the transport.
    Sent,
    /// Acked by the transport.
    Delivered,
    /// Opened by the user.
    Read,
    /// Tapped through by the user.
    Clicked,
    /// Gave up after retries or a permanent transport error.
    Failed,
    /// Message expired before transmission completed.
    Expired,
}

impl DeliveryStatus {
    /// Position along the forward path; terminal sinks rank highest so no
    /// CAS can resurrect them.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Read => 3,
            Self::Clicked => 4,
            Self::Failed | Self::Expired => 5,
        }
    }

    /// True for the failed/expired sinks.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Expired)
    }
}

/// User-side acknowledgement events accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckEvent {
    /// Transport-level receipt confirmation.
    Delivered,
    /// User opened the notification.
    Read,
    /// User tapped through.
    Clicked,
}

/// One recipient's delivery record for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Delivery id.
    pub id: String,
    /// Message being delivered.
    pub message_id: String,
    /// Recipient user.
    pub user_id: String,
    /// Recipient subscription.
    pub subscription_id: String,
    /// Device kind at resolve time.
    pub device: DeviceKind,
    /// Channel of the message (denormalised for cap accounting and rollups).
    pub kind: MessageKind,
    /// Current state.
    pub status: DeliveryStatus,
    /// Transport attempts so far.
    pub attempts: u32,
    /// Creation stamp (message-creation order drives per-recipient FIFO).
    pub created_at: DateTime<Utc>,
    /// Stamp of the most recent transport attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
    /// Transport ack stamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// User open stamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    /// User tap stamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clicked_at: Option<DateTime<Utc>>,
    /// Last transport error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
