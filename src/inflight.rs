//! At most one live network operation per fingerprint.
//!
//! Concurrent callers with the same fingerprint share one [`Shared`] future:
//! the first caller registers it, later callers join it, and every waiter
//! settles with the same value or error. The operation removes its own
//! registry entry as its final step — before it yields its output — so
//! settlement and eviction are never separated by a suspension point and a
//! fresh call afterwards always starts a new sequence.

use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::{BoxFuture, Shared};

use crate::{HttpResponse, Result};

pub(crate) type OperationFuture = Shared<BoxFuture<'static, Result<HttpResponse>>>;

#[derive(Default)]
pub(crate) struct InFlightRegistry {
    operations: Mutex<HashMap<String, OperationFuture>>,
}

impl InFlightRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Joins an existing operation or registers a new one, atomically.
    ///
    /// The check and the insert happen under a single lock acquisition with
    /// no await in between, which is what upholds the coalescing guarantee
    /// under both cooperative interleaving and true parallelism. Returns the
    /// operation handle and whether an existing one was joined.
    pub(crate) fn join_or_register<F>(&self, fingerprint: &str, make: F) -> (OperationFuture, bool)
    where
        F: FnOnce() -> OperationFuture,
    {
        let mut operations = self.lock();
        if let Some(existing) = operations.get(fingerprint) {
            return (existing.clone(), true);
        }
        let operation = make();
        operations.insert(fingerprint.to_owned(), operation.clone());
        (operation, false)
    }

    /// Evicts a settled operation. Called by the operation itself.
    pub(crate) fn remove(&self, fingerprint: &str) {
        self.lock().remove(fingerprint);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, OperationFuture>> {
        self.operations.lock().unwrap_or_else(|err| err.into_inner())
    }
}
