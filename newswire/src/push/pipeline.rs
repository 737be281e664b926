//! The push delivery pipeline: enqueue, sender workers, retry, acks.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use newswire_core::{PersistenceHooks, calendar, persist};
use newswire_types::{
    AckEvent, BackoffConfig, Delivery, DeliveryStatus, DeviceKind, MessageKind, NewswireError,
    PushAnalytics, PushConfig, PushMessage, Subscription,
};

use super::analytics;
use super::store::SubscriptionStore;
use super::transport::{PushTransport, RenderedMessage, TransportError};

/// Append-only delivery log with an id index. Status changes go through
/// [`DeliveryLog::advance`], a compare-and-swap on the status rank.
#[derive(Default)]
struct DeliveryLog {
    entries: Vec<Delivery>,
    index: HashMap<String, usize>,
}

impl DeliveryLog {
    fn push(&mut self, delivery: Delivery) {
        self.index.insert(delivery.id.clone(), self.entries.len());
        self.entries.push(delivery);
    }

    fn get(&self, id: &str) -> Option<&Delivery> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Delivery> {
        self.index.get(id).map(|&i| &mut self.entries[i])
    }

    /// Monotone transition: applies `status` only when it moves forward and
    /// the current state is not a terminal sink. Returns the updated record.
    fn advance(
        &mut self,
        id: &str,
        status: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Option<Delivery> {
        let d = self.get_mut(id)?;
        if d.status.is_terminal() || status.rank() <= d.status.rank() {
            return None;
        }
        d.status = status;
        match status {
            DeliveryStatus::Delivered => d.delivered_at = Some(now),
            DeliveryStatus::Read => d.read_at = Some(now),
            DeliveryStatus::Clicked => d.clicked_at = Some(now),
            _ => {}
        }
        Some(d.clone())
    }
}

/// Per-subscription dispatch bookkeeping. A subscription is handed to at
/// most one worker at a time, which is what gives a single recipient
/// in-order transmission.
#[derive(Default)]
struct DispatchState {
    queues: HashMap<String, VecDeque<String>>,
    busy: HashSet<String>,
}

struct Inner {
    cfg: PushConfig,
    store: Arc<SubscriptionStore>,
    transports: HashMap<DeviceKind, Arc<dyn PushTransport>>,
    hooks: Option<Arc<dyn PersistenceHooks>>,
    messages: Mutex<HashMap<String, PushMessage>>,
    log: Mutex<DeliveryLog>,
    dispatch: Mutex<DispatchState>,
    caps: Mutex<HashMap<(String, MessageKind, NaiveDate), u32>>,
    ready_tx: mpsc::UnboundedSender<String>,
    ready_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    shutdown: CancellationToken,
}

/// Builder for [`PushService`].
pub struct PushServiceBuilder {
    cfg: PushConfig,
    store: Option<Arc<SubscriptionStore>>,
    transports: HashMap<DeviceKind, Arc<dyn PushTransport>>,
    hooks: Option<Arc<dyn PersistenceHooks>>,
}

impl Default for PushServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PushServiceBuilder {
    /// Fresh builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cfg: PushConfig::default(),
            store: None,
            transports: HashMap::new(),
            hooks: None,
        }
    }

    /// Override the pipeline configuration.
    #[must_use]
    pub fn config(mut self, cfg: PushConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Share an existing subscription store; a fresh one is created
    /// otherwise.
    #[must_use]
    pub fn store(mut self, store: Arc<SubscriptionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Route a device kind through the given transport.
    #[must_use]
    pub fn transport(mut self, device: DeviceKind, transport: Arc<dyn PushTransport>) -> Self {
        self.transports.insert(device, transport);
        self
    }

    /// Wire optional persistence hooks; failures are logged, never surfaced.
    #[must_use]
    pub fn persistence(mut self, hooks: Arc<dyn PersistenceHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Build the service (workers start on [`PushService::start`]).
    ///
    /// # Errors
    /// `InvalidArg` when no transport was registered.
    pub fn build(self) -> Result<PushService, NewswireError> {
        if self.transports.is_empty() {
            return Err(NewswireError::InvalidArg(
                "no transports registered; add at least one via transport(...)".to_string(),
            ));
        }
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        Ok(PushService {
            inner: Arc::new(Inner {
                cfg: self.cfg,
                store: self.store.unwrap_or_default(),
                transports: self.transports,
                hooks: self.hooks,
                messages: Mutex::new(HashMap::new()),
                log: Mutex::new(DeliveryLog::default()),
                dispatch: Mutex::new(DispatchState::default()),
                caps: Mutex::new(HashMap::new()),
                ready_tx,
                ready_rx: tokio::sync::Mutex::new(ready_rx),
                shutdown: CancellationToken::new(),
            }),
            started: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        })
    }
}

/// Accepts messages, resolves recipients, and drives deliveries through the
/// transports with retry and expiry handling.
pub struct PushService {
    inner: Arc<Inner>,
    started: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PushService {
    /// Start building a push service.
    #[must_use]
    pub fn builder() -> PushServiceBuilder {
        PushServiceBuilder::new()
    }

    /// The subscription store backing recipient resolution.
    #[must_use]
    pub fn store(&self) -> &Arc<SubscriptionStore> {
        &self.inner.store
    }

    /// Spawn the sender worker pool. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let workers = self.inner.cfg.sender_workers.max(1);
        let mut handles = self.workers.lock().expect("worker list lock poisoned");
        for worker_id in 0..workers {
            let inner = Arc::clone(&self.inner);
            handles.push(tokio::spawn(worker_loop(inner, worker_id)));
        }
        tracing::info!(workers, "push sender pool started");
    }

    /// Stop the workers, leaving queued deliveries pending. The day's
    /// analytics rollup is flushed through the persistence hook on the way
    /// out.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let handles: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.workers.lock().expect("worker list lock poisoned"));
        for handle in handles {
            let _ = handle.await;
        }
        if let Some(hooks) = &self.inner.hooks {
            let rollup = self.analytics(1);
            persist::best_effort("save_analytics_daily", hooks.save_analytics_daily(&rollup))
                .await;
        }
        self.started.store(false, Ordering::SeqCst);
    }

    /// Accept a message: validate, resolve recipients, and enqueue one
    /// pending delivery per recipient. Returns the message id.
    ///
    /// Per-delivery transport outcomes are observable only through
    /// [`Self::analytics`]; this call never reports them.
    ///
    /// # Errors
    /// `InvalidArg` for an empty title; `Expired` when the message is
    /// already past its expiry.
    pub fn enqueue(&self, mut msg: PushMessage) -> Result<String, NewswireError> {
        if msg.title.trim().is_empty() {
            return Err(NewswireError::InvalidArg(
                "push message title must not be empty".to_string(),
            ));
        }
        let now = Utc::now();
        if msg.is_expired(now) {
            return Err(NewswireError::Expired {
                message_id: msg.id.clone(),
            });
        }
        if msg.id.is_empty() {
            msg.id = uuid::Uuid::new_v4().to_string();
        }
        msg.created_at = Some(now);

        let recipients = {
            let caps = self.inner.caps.lock().expect("cap ledger lock poisoned");
            self.inner.store.resolve(
                &msg,
                now,
                self.inner.cfg.quiet_hours_urgent_override,
                |sub| {
                    let day = cap_day(sub, msg.kind, now, &self.inner.cfg);
                    caps.get(&(sub.id.clone(), msg.kind, day))
                        .copied()
                        .unwrap_or(0)
                },
            )
        };

        let message_id = msg.id.clone();
        self.inner
            .messages
            .lock()
            .expect("message lock poisoned")
            .insert(message_id.clone(), msg.clone());

        for sub in &recipients {
            let delivery = Delivery {
                id: uuid::Uuid::new_v4().to_string(),
                message_id: message_id.clone(),
                user_id: sub.user_id.clone(),
                subscription_id: sub.id.clone(),
                device: sub.device,
                kind: msg.kind,
                status: DeliveryStatus::Pending,
                attempts: 0,
                created_at: now,
                last_attempt: None,
                delivered_at: None,
                read_at: None,
                clicked_at: None,
                last_error: None,
            };
            let delivery_id = delivery.id.clone();
            self.inner
                .log
                .lock()
                .expect("delivery log lock poisoned")
                .push(delivery);

            let mut dispatch = self.inner.dispatch.lock().expect("dispatch lock poisoned");
            dispatch
                .queues
                .entry(sub.id.clone())
                .or_default()
                .push_back(delivery_id);
            if !dispatch.busy.contains(&sub.id) {
                dispatch.busy.insert(sub.id.clone());
                // Receiver lives as long as Inner, so this cannot fail.
                let _ = self.inner.ready_tx.send(sub.id.clone());
            }
        }

        tracing::debug!(
            message = %message_id,
            recipients = recipients.len(),
            "message enqueued"
        );
        Ok(message_id)
    }

    /// Record a transport or user acknowledgement. Transitions are monotone;
    /// stale or duplicate acks are ignored.
    ///
    /// # Errors
    /// `NotFound` for an unknown delivery id.
    pub fn ack(&self, delivery_id: &str, event: AckEvent) -> Result<(), NewswireError> {
        let status = match event {
            AckEvent::Delivered => DeliveryStatus::Delivered,
            AckEvent::Read => DeliveryStatus::Read,
            AckEvent::Clicked => DeliveryStatus::Clicked,
        };
        let mut log = self.inner.log.lock().expect("delivery log lock poisoned");
        if log.get(delivery_id).is_none() {
            return Err(NewswireError::not_found(format!("delivery {delivery_id}")));
        }
        log.advance(delivery_id, status, Utc::now());
        Ok(())
    }

    /// Snapshot one delivery.
    #[must_use]
    pub fn delivery(&self, id: &str) -> Option<Delivery> {
        self.inner
            .log
            .lock()
            .expect("delivery log lock poisoned")
            .get(id)
            .cloned()
    }

    /// Snapshot every delivery created for a message, creation-ordered.
    #[must_use]
    pub fn deliveries_for_message(&self, message_id: &str) -> Vec<Delivery> {
        self.inner
            .log
            .lock()
            .expect("delivery log lock poisoned")
            .entries
            .iter()
            .filter(|d| d.message_id == message_id)
            .cloned()
            .collect()
    }

    /// Aggregate delivery analytics over a trailing day window. Read-only
    /// and tolerant of in-flight deliveries.
    #[must_use]
    pub fn analytics(&self, window_days: u32) -> PushAnalytics {
        let snapshot: Vec<Delivery> = self
            .inner
            .log
            .lock()
            .expect("delivery log lock poisoned")
            .entries
            .clone();
        analytics::compute_analytics(&snapshot, window_days, self.inner.cfg.tz, Utc::now())
    }

    /// Live connections across all registered transports.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.inner
            .transports
            .values()
            .map(|t| t.active_connections())
            .sum()
    }
}

/// The local day used for cap accounting: the subscriber's quiet-hours zone
/// for the channel when configured, the pipeline zone otherwise.
fn cap_day(sub: &Subscription, kind: MessageKind, now: DateTime<Utc>, cfg: &PushConfig) -> NaiveDate {
    let tz = sub
        .prefs_for(kind)
        .quiet_hours
        .map_or(cfg.tz, |quiet| quiet.tz);
    calendar::local_day(now, tz)
}

/// Delay before retry `attempt` (1-based counting of the failed attempt).
fn backoff_delay(cfg: &BackoffConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(20);
    let base = cfg
        .start_ms
        .saturating_mul(u64::from(cfg.factor).saturating_pow(exp))
        .min(cfg.cap_ms);
    let ms = if cfg.jitter_percent == 0 {
        base
    } else {
        let jitter_range = std::cmp::max(
            1,
            base.saturating_mul(u64::from(cfg.jitter_percent)) / 100,
        );
        base + rand::rng().random_range(0..jitter_range)
    };
    Duration::from_millis(ms)
}

async fn worker_loop(inner: Arc<Inner>, worker_id: usize) {
    loop {
        let sub_id = {
            let mut rx = inner.ready_rx.lock().await;
            tokio::select! {
                biased;
                () = inner.shutdown.cancelled() => return,
                next = rx.recv() => match next {
                    Some(id) => id,
                    None => return,
                },
            }
        };
        tracing::trace!(worker = worker_id, subscription = %sub_id, "draining");
        drain_subscription(&inner, &sub_id).await;
    }
}

/// Transmit every queued delivery for one subscription, in queue order.
async fn drain_subscription(inner: &Arc<Inner>, sub_id: &str) {
    loop {
        let next = {
            let mut dispatch = inner.dispatch.lock().expect("dispatch lock poisoned");
            match dispatch.queues.get_mut(sub_id).and_then(VecDeque::pop_front) {
                Some(id) => id,
                None => {
                    dispatch.busy.remove(sub_id);
                    return;
                }
            }
        };
        run_delivery(inner, &next).await;
        if inner.shutdown.is_cancelled() {
            let mut dispatch = inner.dispatch.lock().expect("dispatch lock poisoned");
            dispatch.busy.remove(sub_id);
            return;
        }
    }
}

/// Drive one delivery through the transport with retry, expiry, and
/// permanent-failure handling.
async fn run_delivery(inner: &Arc<Inner>, delivery_id: &str) {
    let Some(delivery) = inner
        .log
        .lock()
        .expect("delivery log lock poisoned")
        .get(delivery_id)
        .cloned()
    else {
        return;
    };
    let message = inner
        .messages
        .lock()
        .expect("message lock poisoned")
        .get(&delivery.message_id)
        .cloned();
    let Some(message) = message else {
        finish_failed(inner, delivery_id, "message vanished before send").await;
        return;
    };
    let Some(sub) = inner.store.get(&delivery.subscription_id) else {
        finish_failed(inner, delivery_id, "subscription vanished before send").await;
        return;
    };
    let Some(transport) = inner.transports.get(&delivery.device).cloned() else {
        finish_failed(
            inner,
            delivery_id,
            &format!("no transport for {:?}", delivery.device),
        )
        .await;
        return;
    };

    if let Some(at) = message.schedule_at {
        let now = Utc::now();
        if at > now {
            let wait = (at - now).to_std().unwrap_or_default();
            tokio::select! {
                biased;
                () = inner.shutdown.cancelled() => return,
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    let rendered = RenderedMessage::from_message(&message);
    let max_attempts = inner.cfg.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let now = Utc::now();
        if message.is_expired(now) {
            let updated = inner
                .log
                .lock()
                .expect("delivery log lock poisoned")
                .advance(delivery_id, DeliveryStatus::Expired, now);
            persist_delivery(inner, updated).await;
            return;
        }

        {
            let mut log = inner.log.lock().expect("delivery log lock poisoned");
            if let Some(d) = log.get_mut(delivery_id) {
                d.attempts = attempt;
                d.last_attempt = Some(now);
            }
        }

        let outcome = tokio::time::timeout(
            inner.cfg.transport_timeout,
            transport.send(&sub.device_token, &rendered),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {
                let now = Utc::now();
                let updated = {
                    let mut log = inner.log.lock().expect("delivery log lock poisoned");
                    log.advance(delivery_id, DeliveryStatus::Sent, now);
                    // A transport-level success is the transport ack.
                    log.advance(delivery_id, DeliveryStatus::Delivered, now)
                };
                {
                    let day = cap_day(&sub, message.kind, now, &inner.cfg);
                    let mut caps = inner.caps.lock().expect("cap ledger lock poisoned");
                    *caps.entry((sub.id.clone(), message.kind, day)).or_insert(0) += 1;
                }
                persist_delivery(inner, updated).await;
                tracing::debug!(delivery = delivery_id, attempt, "delivered");
                return;
            }
            Ok(Err(TransportError::Permanent(reason))) => {
                tracing::warn!(
                    delivery = delivery_id,
                    subscription = %sub.id,
                    %reason,
                    "permanent transport failure; deactivating subscription"
                );
                set_last_error(inner, delivery_id, &reason);
                finish_failed(inner, delivery_id, &reason).await;
                let _ = inner.store.deactivate(&sub.id);
                return;
            }
            Ok(Err(TransportError::Transient(reason))) => {
                set_last_error(inner, delivery_id, &reason);
                if attempt == max_attempts {
                    // The final attempt's failure is recorded, not dropped.
                    finish_failed(inner, delivery_id, &reason).await;
                    return;
                }
                let delay = backoff_delay(&inner.cfg.retry, attempt);
                tracing::debug!(delivery = delivery_id, attempt, ?delay, "retrying");
                tokio::select! {
                    biased;
                    () = inner.shutdown.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            Err(_elapsed) => {
                set_last_error(inner, delivery_id, "transport send timed out");
                if attempt == max_attempts {
                    finish_failed(inner, delivery_id, "transport send timed out").await;
                    return;
                }
                let delay = backoff_delay(&inner.cfg.retry, attempt);
                tokio::select! {
                    biased;
                    () = inner.shutdown.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

fn set_last_error(inner: &Arc<Inner>, delivery_id: &str, reason: &str) {
    let mut log = inner.log.lock().expect("delivery log lock poisoned");
    if let Some(d) = log.get_mut(delivery_id) {
        d.last_error = Some(reason.to_string());
    }
}

async fn finish_failed(inner: &Arc<Inner>, delivery_id: &str, reason: &str) {
    let updated = {
        let mut log = inner.log.lock().expect("delivery log lock poisoned");
        if let Some(d) = log.get_mut(delivery_id) {
            d.last_error = Some(reason.to_string());
        }
        log.advance(delivery_id, DeliveryStatus::Failed, Utc::now())
    };
    persist_delivery(inner, updated).await;
}

async fn persist_delivery(inner: &Arc<Inner>, delivery: Option<Delivery>) {
    if let (Some(hooks), Some(delivery)) = (&inner.hooks, delivery) {
        persist::best_effort("save_delivery", hooks.save_delivery(&delivery)).await;
    }
}
