use alloy_primitives::U256;
use cd_api_types::{PresalePhase, PresaleStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock source, in unix seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

/// Settable clock for driving the presale deadline by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Presale is over once its end timestamp is at or before `now`.
pub fn presale_has_ended(end_timestamp: U256, now: u64) -> bool {
    end_timestamp <= U256::from(now)
}

pub fn derive_phase(status: PresaleStatus) -> PresalePhase {
    match (status.started, status.ended) {
        (false, _) => PresalePhase::NotStarted,
        (true, false) => PresalePhase::Started,
        (true, true) => PresalePhase::Ended,
    }
}
