// src/engine/teardown.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::exec::Teardown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TeardownKey(u64);

#[derive(Debug, Default)]
struct Registry {
    next: u64,
    hooks: BTreeMap<TeardownKey, (String, Teardown)>,
}

/// Cancellation hooks of in-flight leaves, shared by every run that should
/// be interrupted together.
#[derive(Debug, Clone, Default)]
pub struct Teardowns {
    inner: Arc<Mutex<Registry>>,
}

impl Teardowns {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn register(&self, label: impl Into<String>, teardown: Teardown) -> TeardownKey {
        let mut reg = self.lock();
        let key = TeardownKey(reg.next);
        reg.next += 1;
        reg.hooks.insert(key, (label.into(), teardown));
        key
    }

    /// Forget a hook without running it.
    pub fn release(&self, key: TeardownKey) {
        self.lock().hooks.remove(&key);
    }

    pub fn len(&self) -> usize {
        self.lock().hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run and drop every registered hook. Errors are logged, not returned.
    pub fn run_all(&self) -> usize {
        let hooks = std::mem::take(&mut self.lock().hooks);
        let count = hooks.len();
        for (_, (label, teardown)) in hooks {
            debug!(task = %label, "running teardown");
            if let Err(err) = teardown.run() {
                warn!(task = %label, error = %err, "teardown failed");
            }
        }
        count
    }
}
