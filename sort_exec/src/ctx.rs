//! Process context
//!
//! The state shared between the control loop thread and the operator
//! console. It is created once and handed to the loop when it starts, the loop
//! reads nothing from globals.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::motion::{channel::SharedChannel, clock::Clock};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cooperative stop request, settable from any thread.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

/// Set while the control loop thread is alive.
#[derive(Debug, Clone, Default)]
pub struct ActiveFlag(Arc<AtomicBool>);

/// Holds an [`ActiveFlag`] set until dropped.
#[derive(Debug)]
pub struct ActiveGuard(ActiveFlag);

/// Handles owned by the control loop.
#[derive(Clone)]
pub struct ProcessContext {
    pub stop: StopFlag,
    pub loop_active: ActiveFlag,
    pub channel: SharedChannel,
    pub clock: Arc<dyn Clock>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ActiveFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag until the returned guard is dropped, including by a
    /// panic unwinding through its owner.
    pub fn hold(&self) -> ActiveGuard {
        self.0.store(true, Ordering::SeqCst);
        ActiveGuard(self.clone())
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        (self.0).0.store(false, Ordering::SeqCst);
    }
}

impl ProcessContext {
    pub fn new(channel: SharedChannel, clock: Arc<dyn Clock>) -> Self {
        Self {
            stop: StopFlag::new(),
            loop_active: ActiveFlag::new(),
            channel,
            clock,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stop_flag_shared() {
        let a = StopFlag::new();
        let b = a.clone();

        assert!(!b.is_requested());

        let h = std::thread::spawn(move || b.request());
        h.join().unwrap();

        assert!(a.is_requested());
        a.clear();
        assert!(!a.is_requested());
    }

    #[test]
    fn test_active_flag_cleared_on_panic() {
        let flag = ActiveFlag::new();
        assert!(!flag.is_set());

        let guard = flag.hold();
        assert!(flag.is_set());
        drop(guard);
        assert!(!flag.is_set());

        let shared = flag.clone();
        let h = std::thread::spawn(move || {
            let _guard = shared.hold();
            panic!("loop died");
        });

        assert!(h.join().is_err());
        assert!(!flag.is_set());
    }
}
