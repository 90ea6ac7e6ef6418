//! Region download progress fan-out.
//!
//! Listeners receive `(region_id, percent)` after every settled tile. A
//! listener that panics is logged and the remaining listeners still run;
//! the download worker itself is never torn down by a listener.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Handle returned by listener registration; used to detach again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&str, u8) + Send + Sync>;

/// Registry of progress listeners.
#[derive(Default)]
pub struct ProgressBus {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
}

impl ProgressBus {
    pub fn add(&self, listener: impl Fn(&str, u8) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push((id, Box::new(listener)));
        }
        id
    }

    /// Detach a listener. Unknown ids are a no-op.
    pub fn remove(&self, id: ListenerId) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.retain(|(existing, _)| *existing != id);
        }
    }

    pub fn emit(&self, region_id: &str, percent: u8) {
        let listeners = match self.listeners.read() {
            Ok(listeners) => listeners,
            Err(_) => return,
        };
        for (id, listener) in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(region_id, percent))).is_err() {
                tracing::warn!(
                    listener = id.0,
                    region = region_id,
                    "progress listener panicked"
                );
            }
        }
    }
}
