//! Online/offline signal shared by the sync engine and its callers

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Listeners {
    online: Vec<Listener>,
    offline: Vec<Listener>,
}

struct Inner {
    state: watch::Sender<bool>,
    listeners: Mutex<Listeners>,
}

/// Tracks network reachability.
///
/// Starts from the platform's current signal; `set_online` feeds later
/// transitions. Listeners run synchronously on the caller of `set_online`,
/// only when the state actually flips.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self {
            inner: Arc::new(Inner {
                state,
                listeners: Mutex::new(Listeners::default()),
            }),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.inner.state.borrow()
    }

    /// Apply a platform reachability signal. Returns whether the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.inner.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            tracing::info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
            // Clone out so listeners may register further listeners
            let listeners = {
                let guard = self
                    .inner
                    .listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if online {
                    guard.online.clone()
                } else {
                    guard.offline.clone()
                }
            };
            for listener in listeners {
                listener();
            }
        }

        changed
    }

    /// Register a callback for `Offline -> Online` transitions
    pub fn on_online(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners().online.push(Arc::new(listener));
    }

    /// Register a callback for `Online -> Offline` transitions
    pub fn on_offline(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners().offline.push(Arc::new(listener));
    }

    /// Async view of the state
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.state.subscribe()
    }

    fn listeners(&self) -> std::sync::MutexGuard<'_, Listeners> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ConnectivityMonitor")
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_starts_from_initial_signal() {
        assert!(ConnectivityMonitor::new(true).is_online());
        assert!(!ConnectivityMonitor::new(false).is_online());
    }

    #[test]
    fn test_transitions_notify_matching_listeners_synchronously() {
        let monitor = ConnectivityMonitor::new(true);
        let (online_calls, on_online) = counter();
        let (offline_calls, on_offline) = counter();
        monitor.on_online(on_online);
        monitor.on_offline(on_offline);

        assert!(monitor.set_online(false));
        assert_eq!(offline_calls.load(Ordering::SeqCst), 1);
        assert_eq!(online_calls.load(Ordering::SeqCst), 0);

        assert!(monitor.set_online(true));
        assert_eq!(online_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_signal_is_ignored() {
        let monitor = ConnectivityMonitor::new(false);
        let (offline_calls, on_offline) = counter();
        monitor.on_offline(on_offline);

        assert!(!monitor.set_online(false));
        assert_eq!(offline_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscribers_observe_changes() {
        let monitor = ConnectivityMonitor::new(false);
        let mut receiver = monitor.subscribe();

        monitor.set_online(true);
        receiver.changed().await.unwrap();
        assert!(*receiver.borrow());
    }

    #[test]
    fn test_clones_share_state() {
        let monitor = ConnectivityMonitor::new(true);
        let clone = monitor.clone();
        clone.set_online(false);
        assert!(!monitor.is_online());
    }
}
