//! Reconnecting session driver: dials through a [`Connector`], relays
//! frames out and raw bytes in, and backs off on repeated failure.
//!
//! Grounded on the teacher's `connection.rs` reconnect loop — the attempt
//! counter, the `reconnect_delay` formula, and the connect/run/disconnect
//! cycle are carried over almost verbatim. What changes is the dial target:
//! the teacher calls `tokio_tungstenite::connect_async` directly, this
//! crate dials through an injected [`Connector`] so the state machine can
//! be exercised in tests without a socket. The outbound side also carries
//! [`crate::wire::Frame`] values rather than opaque bytes, so the send-side
//! backpressure policy in [`OutboundQueue`] can tell a keyframe apart from
//! everything else.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mirror_platform::{Connector, Transport, TransportError};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use crate::wire::Frame;

/// Exponential backoff shape, with jitter, for reconnect attempts.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

/// `attempt == 0` means "dial immediately, no backoff yet". Each
/// subsequent attempt doubles the delay (capped at `max`) and applies
/// ±25% jitter, floored at `base` so a jitter draw never produces a
/// near-zero retry storm.
pub fn reconnect_delay(cfg: &BackoffConfig, attempt: u32) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let base = cfg.base.as_secs_f64();
    let max = cfg.max.as_secs_f64();
    let delay = (base * 2.0f64.powi(attempt as i32 - 1)).min(max);
    let jitter = delay * 0.25 * (2.0 * rand_simple() - 1.0);
    Duration::from_secs_f64((delay + jitter).max(base))
}

fn rand_simple() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Observable lifecycle events for whatever owns this connection (a demo UI,
/// a test harness).
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected,
    Disconnected { attempt: u32 },
    Reconnecting { attempt: u32, delay: Duration },
}

/// Default cap on queued outbound frames before the backpressure policy in
/// [`OutboundQueue::push`] starts evicting.
pub const DEFAULT_OUTBOUND_HIGH_WATER: usize = 8;

/// Default ceiling on one dial attempt. A `Connector::connect` call that
/// hangs past this counts as a failure for backoff purposes, same as a
/// connect error.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The outbound send queue, shared between [`ConnectionHandle`] (producer)
/// and the session loop (consumer). Plain `mpsc` can't express this
/// queue's eviction policy — once full, it drops the *oldest* queued
/// non-keyframe rather than the newest — so frames live in a `Mutex<VecDeque>`
/// instead, woken with a `Notify`.
struct OutboundQueue {
    frames: Mutex<VecDeque<Frame>>,
    notify: Notify,
    high_water: usize,
    closed: AtomicBool,
}

impl OutboundQueue {
    fn new(high_water: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            high_water,
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue one frame under the send-semantics backpressure policy: once
    /// the queue is at `high_water`, evict the oldest queued frame that
    /// isn't a keyframe to make room. If every queued frame is a keyframe,
    /// the new frame is dropped instead — unless it is itself a keyframe, in
    /// which case it is queued anyway (keyframes are never dropped).
    /// Returns `false` when the new frame itself was the one dropped.
    fn push(&self, frame: Frame) -> bool {
        let mut q = self.frames.lock().unwrap();
        if q.len() >= self.high_water {
            if let Some(pos) = q.iter().position(|f| !f.is_keyframe()) {
                q.remove(pos);
            } else if !frame.is_keyframe() {
                return false;
            }
        }
        q.push_back(frame);
        drop(q);
        self.notify.notify_one();
        true
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait for the next queued frame, or `None` once [`OutboundQueue::close`]
    /// has been called and the queue has drained.
    async fn pop(&self) -> Option<Frame> {
        loop {
            {
                let mut q = self.frames.lock().unwrap();
                if let Some(f) = q.pop_front() {
                    return Some(f);
                }
            }
            if self.is_closed() {
                return None;
            }
            self.notify.notified().await;
        }
    }
}

/// Handle to push outbound frames into an active (or reconnecting) session.
/// `send_frame` never blocks: once the queue in `OutboundQueue` saturates,
/// it silently evicts per the backpressure policy rather than exerting
/// producer-side pressure. Callers that care about delivery should watch
/// the `ConnectionEvent` stream instead of the send outcome.
#[derive(Clone)]
pub struct ConnectionHandle {
    queue: Arc<OutboundQueue>,
}

impl ConnectionHandle {
    /// Queue one frame for transmission. Returns `false` if the frame was
    /// dropped outright by the backpressure policy instead of being queued.
    pub fn send_frame(&self, frame: Frame) -> bool {
        self.queue.push(frame)
    }

    /// Idempotent: stop the reconnect loop (if any reconnect is pending) and
    /// close the active session. Safe to call more than once.
    pub fn stop(&self) {
        self.queue.close();
    }
}

/// Spawn the reconnecting session loop. Returns a handle for outbound
/// traffic; inbound frame bytes arrive on `inbound_tx`, and lifecycle
/// transitions on `event_tx`.
pub fn spawn_connection(
    connector: Arc<dyn Connector>,
    backoff: BackoffConfig,
    connect_timeout: Duration,
    outbound_high_water: usize,
    inbound_tx: mpsc::Sender<Vec<u8>>,
    event_tx: mpsc::Sender<ConnectionEvent>,
) -> ConnectionHandle {
    let queue = Arc::new(OutboundQueue::new(outbound_high_water));
    let handle = ConnectionHandle { queue: queue.clone() };

    tokio::spawn(connection_loop(connector, backoff, connect_timeout, queue, inbound_tx, event_tx));

    handle
}

async fn connection_loop(
    connector: Arc<dyn Connector>,
    backoff: BackoffConfig,
    connect_timeout: Duration,
    queue: Arc<OutboundQueue>,
    inbound_tx: mpsc::Sender<Vec<u8>>,
    event_tx: mpsc::Sender<ConnectionEvent>,
) {
    let mut attempt = 0u32;

    loop {
        if queue.is_closed() {
            return;
        }

        let delay = reconnect_delay(&backoff, attempt);
        if attempt > 0 {
            info!("reconnecting in {:.1}s (attempt {})", delay.as_secs_f64(), attempt);
            if event_tx
                .send(ConnectionEvent::Reconnecting { attempt, delay })
                .await
                .is_err()
            {
                return;
            }
            tokio::time::sleep(delay).await;
        }

        let dial = match tokio::time::timeout(connect_timeout, connector.connect()).await {
            Ok(r) => r,
            Err(_) => Err(TransportError::ConnectTimeout),
        };

        match dial {
            Ok(transport) => {
                attempt = 0;
                if event_tx.send(ConnectionEvent::Connected).await.is_err() {
                    return;
                }
                run_session(transport, &queue, &inbound_tx).await;
            }
            Err(e) => {
                warn!("connect failed: {}", e);
                attempt = attempt.saturating_add(1);
            }
        }

        if queue.is_closed() {
            return;
        }

        if event_tx
            .send(ConnectionEvent::Disconnected { attempt })
            .await
            .is_err()
        {
            return;
        }
    }
}

async fn run_session(
    mut transport: Box<dyn Transport>,
    queue: &OutboundQueue,
    inbound_tx: &mpsc::Sender<Vec<u8>>,
) {
    loop {
        tokio::select! {
            incoming = transport.recv() => {
                match incoming {
                    Ok(Some(data)) => {
                        if inbound_tx.send(data).await.is_err() {
                            debug!("inbound consumer gone, closing session");
                            transport.close().await;
                            return;
                        }
                    }
                    Ok(None) => {
                        info!("peer closed cleanly");
                        transport.close().await;
                        return;
                    }
                    Err(e) => {
                        warn!("transport recv error: {}", e);
                        transport.close().await;
                        return;
                    }
                }
            }
            outgoing = queue.pop() => {
                match outgoing {
                    Some(frame) => {
                        if let Err(e) = transport.send(frame.encode()).await {
                            warn!("transport send error: {}", e);
                            transport.close().await;
                            return;
                        }
                    }
                    None => {
                        info!("connection stopped, ending session");
                        transport.close().await;
                        return;
                    }
                }
            }
        }
    }
}
