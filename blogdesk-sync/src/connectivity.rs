//! Network reachability as seen by the save workflow.

use std::sync::atomic::{AtomicBool, Ordering};

/// Answers whether the device can currently reach the network.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// A connectivity flag flipped by whoever observes the network.
#[derive(Debug)]
pub struct NetworkStatus {
    online: AtomicBool,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for NetworkStatus {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
