// User-interaction signals that keep a session alive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};

/// Kind of input the host observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    Pointer,
    Key,
    Scroll,
    Touch,
}

pub type ActivityListener = Arc<dyn Fn(ActivityKind) + Send + Sync>;

/// A host-provided stream of best-effort activity notifications.
pub trait ActivitySource: Send + Sync {
    /// Register a listener. It stays registered until the returned
    /// subscription is dropped or unsubscribed.
    fn subscribe(&self, listener: ActivityListener) -> Subscription;
}

/// Unsubscribe handle. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[derive(Default)]
struct HubListeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, ActivityListener)>>,
}

/// Fan-out activity source. Hosts call [`ActivityHub::emit`] from their
/// input handlers; every live subscriber is notified.
#[derive(Clone, Default)]
pub struct ActivityHub {
    listeners: Arc<HubListeners>,
}

impl ActivityHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify all listeners. Returns how many were notified.
    pub fn emit(&self, kind: ActivityKind) -> usize {
        // Snapshot first so listeners may subscribe or unsubscribe freely
        let snapshot: Vec<ActivityListener> = self
            .listeners
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &snapshot {
            listener(kind);
        }
        snapshot.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ActivitySource for ActivityHub {
    fn subscribe(&self, listener: ActivityListener) -> Subscription {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));

        let weak: Weak<HubListeners> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners
                    .entries
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }
}

impl std::fmt::Debug for ActivityHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_listener(counter: &Arc<AtomicUsize>) -> ActivityListener {
        let counter = Arc::clone(counter);
        Arc::new(move |_: ActivityKind| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_reaches_every_listener() {
        let hub = ActivityHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let _a = hub.subscribe(counting_listener(&count));
        let _b = hub.subscribe(counting_listener(&count));

        assert_eq!(hub.emit(ActivityKind::Pointer), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = ActivityHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let subscription = hub.subscribe(counting_listener(&count));
        assert_eq!(hub.listener_count(), 1);

        drop(subscription);
        assert_eq!(hub.listener_count(), 0);
        assert_eq!(hub.emit(ActivityKind::Key), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_only_removes_its_own_listener() {
        let hub = ActivityHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        let first = hub.subscribe(counting_listener(&count));
        let _second = hub.subscribe(counting_listener(&count));

        first.unsubscribe();
        assert_eq!(hub.listener_count(), 1);
        hub.emit(ActivityKind::Scroll);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outliving_hub() {
        let hub = ActivityHub::new();
        let subscription = hub.subscribe(Arc::new(|_: ActivityKind| {}));
        drop(hub);
        // Releasing after the hub is gone must not panic
        drop(subscription);
    }

    #[test]
    fn test_listener_receives_kind() {
        let hub = ActivityHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = hub.subscribe(Arc::new(move |kind: ActivityKind| {
            sink.lock().unwrap().push(kind);
        }));

        hub.emit(ActivityKind::Touch);
        hub.emit(ActivityKind::Key);
        assert_eq!(*seen.lock().unwrap(), vec![ActivityKind::Touch, ActivityKind::Key]);
    }
}
