use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes turns that target the same session.
///
/// Entries are created on demand and dropped once no turn holds or awaits them.
#[derive(Default)]
pub struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

pub struct SessionGuard<'a> {
    locks: &'a SessionLocks,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, session_id: &str) -> SessionGuard<'_> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(session_id.to_string()).or_default().clone()
        };
        let guard = mutex.lock_owned().await;

        SessionGuard {
            locks: self,
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut map = self.locks.inner.lock().unwrap_or_else(|e| e.into_inner());
        let idle = map
            .get(&self.session_id)
            .map(|mutex| Arc::strong_count(mutex) == 1)
            .unwrap_or(false);
        if idle {
            map.remove(&self.session_id);
        }
    }
}
