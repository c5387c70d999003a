use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// In-flight flag for one action trigger.
///
/// Only the trigger's own action checks it; there is no lock shared between
/// actions.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    busy: Arc<AtomicBool>,
}

impl Trigger {
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the trigger. `None` while a previous call is still in flight.
    pub fn try_acquire(&self) -> Option<TriggerGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TriggerGuard {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Re-enables its trigger when dropped, whichever way the call ended.
#[derive(Debug)]
pub struct TriggerGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
