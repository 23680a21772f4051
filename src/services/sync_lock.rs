// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-account sync exclusivity.
//!
//! A sync pass holds a [`SyncLockGuard`] for its whole duration. The guard
//! releases the lock when dropped, which covers success, error returns and a
//! cancelled (dropped) future alike.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// An acquirable, releasable lock keyed by account ID.
///
/// The in-process implementation is [`InMemorySyncLock`]; a multi-instance
/// deployment would back this with a database advisory lock instead.
pub trait SyncLock: Send + Sync {
    /// Take the lock for `account_id`, or `None` if a pass already holds it.
    fn try_acquire(&self, account_id: i64) -> Option<SyncLockGuard>;
}

/// Held for the duration of a sync pass. Dropping it releases the lock.
pub struct SyncLockGuard {
    _held: Box<dyn Send + Sync>,
}

impl SyncLockGuard {
    /// Wrap any value whose `Drop` releases the underlying lock.
    pub fn new<T: Send + Sync + 'static>(held: T) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

/// Sync locks shared by every handler in this process.
#[derive(Default)]
pub struct InMemorySyncLock {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl InMemorySyncLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncLock for InMemorySyncLock {
    fn try_acquire(&self, account_id: i64) -> Option<SyncLockGuard> {
        let lock = self
            .locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        lock.try_lock_owned().ok().map(SyncLockGuard::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_for_same_account_fails() {
        let locks = InMemorySyncLock::new();

        let guard = locks.try_acquire(1).expect("first acquire succeeds");
        assert!(locks.try_acquire(1).is_none());

        drop(guard);
        assert!(locks.try_acquire(1).is_some());
    }

    #[test]
    fn test_accounts_do_not_interfere() {
        let locks = InMemorySyncLock::new();

        let _a = locks.try_acquire(1).unwrap();
        let _b = locks.try_acquire(2).unwrap();
        assert!(locks.try_acquire(1).is_none());
        assert!(locks.try_acquire(2).is_none());
    }
}
