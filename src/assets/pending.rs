use std::sync::{Arc, Condvar, Mutex};

use crate::foundation::error::{BrandframeError, BrandframeResult};

/// Observable state of a [`Pending`] resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    Loading,
    Ready,
    Failed(String),
}

enum Slot<T> {
    Loading,
    Ready(Arc<T>),
    Failed(String),
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    settled: Condvar,
}

/// A resource that is loaded off the caller's thread.
///
/// Frames that need the resource check [`Pending::poll`] and defer until it is `Ready`. Cloning
/// the handle shares the same underlying load.
pub struct Pending<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Pending<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("readiness", &self.poll())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Pending<T> {
    /// Run `load` on a worker thread and return a handle to its eventual result.
    ///
    /// A panic inside `load` settles the handle as failed instead of leaving it loading forever.
    pub fn spawn<F>(name: &str, load: F) -> Self
    where
        F: FnOnce() -> BrandframeResult<T> + Send + 'static,
    {
        let pending = Self::loading();
        let completer = pending.clone();
        let thread_name = format!("brandframe-load-{name}");
        let spawned = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(load))
                    .unwrap_or_else(|panic| {
                        let msg = panic
                            .downcast_ref::<&str>()
                            .map(|s| (*s).to_owned())
                            .or_else(|| panic.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".to_owned());
                        Err(BrandframeError::evaluation(format!("loader panicked: {msg}")))
                    });
                completer.complete(result)
            });
        if let Err(e) = spawned {
            pending.complete(Err(BrandframeError::evaluation(format!(
                "failed to spawn loader thread: {e}"
            ))));
        }
        pending
    }
}

impl<T> Pending<T> {
    /// A handle that is already settled with `value`.
    pub fn ready(value: T) -> Self {
        Self::with_slot(Slot::Ready(Arc::new(value)))
    }

    /// A handle that already failed with `msg`.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::with_slot(Slot::Failed(msg.into()))
    }

    /// An unsettled handle; settle it with [`Pending::complete`].
    pub fn loading() -> Self {
        Self::with_slot(Slot::Loading)
    }

    fn with_slot(slot: Slot<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(slot),
                settled: Condvar::new(),
            }),
        }
    }

    /// Settle the handle. Later calls are ignored once settled.
    pub fn complete(&self, result: BrandframeResult<T>) {
        let mut slot = lock(&self.shared.slot);
        if !matches!(*slot, Slot::Loading) {
            return;
        }
        *slot = match result {
            Ok(v) => Slot::Ready(Arc::new(v)),
            Err(e) => {
                tracing::warn!(error = %e, "resource load failed");
                Slot::Failed(e.to_string())
            }
        };
        self.shared.settled.notify_all();
    }

    pub fn poll(&self) -> Readiness {
        match &*lock(&self.shared.slot) {
            Slot::Loading => Readiness::Loading,
            Slot::Ready(_) => Readiness::Ready,
            Slot::Failed(msg) => Readiness::Failed(msg.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.poll(), Readiness::Ready)
    }

    /// The value, if loaded.
    pub fn get(&self) -> Option<Arc<T>> {
        match &*lock(&self.shared.slot) {
            Slot::Ready(v) => Some(Arc::clone(v)),
            _ => None,
        }
    }

    /// Block until settled.
    pub fn wait(&self) -> BrandframeResult<Arc<T>> {
        let mut slot = lock(&self.shared.slot);
        loop {
            match &*slot {
                Slot::Ready(v) => return Ok(Arc::clone(v)),
                Slot::Failed(msg) => return Err(BrandframeError::resource_load(msg.clone())),
                Slot::Loading => {
                    slot = self
                        .shared
                        .settled
                        .wait(slot)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/pending.rs"]
mod tests;
