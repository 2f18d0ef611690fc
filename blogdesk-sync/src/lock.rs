//! Per-entry operation locks.
//!
//! An edit session blocks its entry so the background synchronizer (or a
//! second session) leaves it alone. Locks are keyed by component and entry
//! key; unrelated entries never contend.

use crate::error::{SyncError, SyncResult};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type LockKey = (String, String);

/// Registry of blocked operations, shared by sessions and the synchronizer.
#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    blocked: Arc<Mutex<HashSet<LockKey>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks `key` within `component`. Fails if it is already blocked.
    pub fn block(&self, component: &str, key: impl fmt::Display) -> SyncResult<OperationGuard> {
        let lock_key = (component.to_string(), key.to_string());
        if !self.entries().insert(lock_key.clone()) {
            return Err(SyncError::Locked(format!("{}:{}", lock_key.0, lock_key.1)));
        }
        debug!("Blocked operation {}:{}", lock_key.0, lock_key.1);
        Ok(OperationGuard {
            registry: self.clone(),
            key: Some(lock_key),
        })
    }

    pub fn is_blocked(&self, component: &str, key: impl fmt::Display) -> bool {
        self.entries()
            .contains(&(component.to_string(), key.to_string()))
    }

    fn unblock(&self, key: &LockKey) {
        self.entries().remove(key);
        debug!("Unblocked operation {}:{}", key.0, key.1);
    }

    // A panic while holding the set cannot leave it inconsistent.
    fn entries(&self) -> MutexGuard<'_, HashSet<LockKey>> {
        self.blocked.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds a blocked operation; unblocks it when released or dropped.
#[derive(Debug)]
pub struct OperationGuard {
    registry: LockRegistry,
    key: Option<LockKey>,
}

impl OperationGuard {
    pub fn release(mut self) {
        self.unblock();
    }

    fn unblock(&mut self) {
        if let Some(key) = self.key.take() {
            self.registry.unblock(&key);
        }
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.unblock();
    }
}
