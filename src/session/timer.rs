//! Auto-disable timer.
//!
//! # States
//! - Disarmed: no pending action
//! - Armed(deadline): a disable event fires once `now >= deadline`
//!
//! # State Transitions
//! ```text
//! Disarmed → Armed:    arm() / rearm_at(); re-arming replaces the
//!                      previous deadline, it does not stack
//! Armed → Disarmed:    disarm(), or the deadline firing
//! ```
//!
//! # Design Decisions
//! - Deadlines are absolute unix-millisecond timestamps; callers persist
//!   them so a restart can re-arm from stored state
//! - Each arm bumps a generation counter; the sleeping task re-checks
//!   generation and stored deadline at fire time, so a disarm that races
//!   the deadline wins and the disable never fires late

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::info;

/// Fired-deadline notification; the receiver runs the disable pass.
pub type FireReceiver = mpsc::UnboundedReceiver<u64>;

#[derive(Debug)]
struct TimerShared {
    /// Armed deadline in unix milliseconds; 0 means disarmed.
    deadline_ms: AtomicU64,
    /// Bumped on every arm/disarm to invalidate superseded sleeps.
    generation: AtomicU64,
}

/// Auto-disable timer with last-write-wins cancellation.
#[derive(Debug, Clone)]
pub struct AutoDisableTimer {
    shared: Arc<TimerShared>,
    fire_tx: mpsc::UnboundedSender<u64>,
}

impl AutoDisableTimer {
    pub fn new() -> (Self, FireReceiver) {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        (
            Self {
                shared: Arc::new(TimerShared {
                    deadline_ms: AtomicU64::new(0),
                    generation: AtomicU64::new(0),
                }),
                fire_tx,
            },
            fire_rx,
        )
    }

    /// Arm the timer `minutes` from now, replacing any existing deadline.
    /// Returns the absolute deadline for the caller to persist.
    pub fn arm(&self, minutes: u64) -> u64 {
        // Saturate: an absurd minutes value becomes a far-future
        // deadline rather than a wrapped one.
        let deadline = now_ms().saturating_add(minutes.saturating_mul(60_000));
        self.arm_at(deadline);
        deadline
    }

    /// Arm at an absolute deadline. A deadline already in the past fires
    /// immediately; a persisted deadline found expired at startup still
    /// runs its disable pass.
    pub fn arm_at(&self, deadline_ms: u64) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.deadline_ms.store(deadline_ms, Ordering::SeqCst);
        info!(deadline_ms, "auto-disable timer armed");

        let shared = Arc::clone(&self.shared);
        let fire_tx = self.fire_tx.clone();
        tokio::spawn(async move {
            let now = now_ms();
            if deadline_ms > now {
                tokio::time::sleep(Duration::from_millis(deadline_ms - now)).await;
            }

            // Fire only if nothing re-armed or disarmed us in the
            // meantime: generation and the stored deadline must both
            // still be ours.
            if shared.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if shared
                .deadline_ms
                .compare_exchange(deadline_ms, 0, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }

            info!(deadline_ms, "auto-disable timer fired");
            let _ = fire_tx.send(deadline_ms);
        });
    }

    /// Cancel any pending deadline.
    pub fn disarm(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let previous = self.shared.deadline_ms.swap(0, Ordering::SeqCst);
        if previous != 0 {
            info!("auto-disable timer disarmed");
        }
    }

    /// The armed deadline, if any. Persisted alongside the profile store.
    pub fn deadline(&self) -> Option<u64> {
        match self.shared.deadline_ms.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(ms),
        }
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fires_at_deadline() {
        let (timer, mut rx) = AutoDisableTimer::new();
        timer.arm_at(now_ms() + 20);

        let fired = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timer did not fire");
        assert!(fired.is_some());
        assert_eq!(timer.deadline(), None);
    }

    #[tokio::test]
    async fn test_disarm_beats_deadline() {
        let (timer, mut rx) = AutoDisableTimer::new();
        timer.arm_at(now_ms() + 30);
        timer.disarm();

        let raced = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(raced.is_err(), "disarmed timer must not fire");
        assert_eq!(timer.deadline(), None);
    }

    #[tokio::test]
    async fn test_rearm_replaces_previous_deadline() {
        let (timer, mut rx) = AutoDisableTimer::new();
        timer.arm_at(now_ms() + 25);
        let second = now_ms() + 60;
        timer.arm_at(second);

        let fired = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timer did not fire")
            .unwrap();
        assert_eq!(fired, second);

        // The superseded deadline must not fire afterwards.
        let extra = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(extra.is_err());
    }

    #[tokio::test]
    async fn test_huge_minutes_saturate_to_far_future() {
        let (timer, mut rx) = AutoDisableTimer::new();
        let deadline = timer.arm(u64::MAX);
        assert_eq!(deadline, u64::MAX);
        assert_eq!(timer.deadline(), Some(u64::MAX));

        // Saturated deadline must behave as far-future, not as wrapped.
        let raced = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(raced.is_err(), "far-future deadline must not fire");
    }

    #[tokio::test]
    async fn test_expired_deadline_fires_immediately() {
        let (timer, mut rx) = AutoDisableTimer::new();
        timer.arm_at(now_ms().saturating_sub(1_000));

        let fired = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("expired deadline should fire on arm");
        assert!(fired.is_some());
    }
}
