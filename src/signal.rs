//! Process exit signal
//!
//! Callbacks subscribed here run once when the signal fires. The runtime
//! subscribes its shutdown (see
//! [`ApplicationContext::register_exit_hook`](crate::ApplicationContext::register_exit_hook)),
//! tests create their own [`ExitSignal`] and fire it by hand.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[cfg(feature = "logging")]
use tracing::debug;

/// Callback run when the signal fires
pub type ExitCallback = Box<dyn FnOnce() + Send + 'static>;

static GLOBAL: Lazy<Arc<ExitSignal>> = Lazy::new(ExitSignal::new);

/// A one-shot exit notification with any number of subscribers
pub struct ExitSignal {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, ExitCallback)>>,
}

impl ExitSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(Vec::new()),
        })
    }

    /// The process-wide signal
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    fn callbacks(&self) -> MutexGuard<'_, Vec<(u64, ExitCallback)>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `callback` when the signal fires
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks().push((id, Box::new(callback)));
        Subscription {
            id,
            signal: Arc::downgrade(self),
        }
    }

    /// Drop the callback registered under `id`. Returns `false` if it already ran or was removed.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut callbacks = self.callbacks();
        match callbacks.iter().position(|(i, _)| *i == id) {
            Some(position) => {
                callbacks.remove(position);
                true
            }
            None => false,
        }
    }

    /// Number of pending callbacks
    pub fn subscribers(&self) -> usize {
        self.callbacks().len()
    }

    /// Run and drop every pending callback, in subscription order.
    ///
    /// Callbacks run outside the internal lock, so they may subscribe or
    /// unsubscribe. Returns the number of callbacks run.
    pub fn fire(&self) -> usize {
        let pending = std::mem::take(&mut *self.callbacks());

        #[cfg(feature = "logging")]
        debug!(target: "ioc_runtime", callbacks = pending.len(), "Exit signal fired");

        let count = pending.len();
        for (_, callback) in pending {
            callback();
        }
        count
    }

    /// Fire this signal when the process receives Ctrl-C.
    ///
    /// Must be called from within a tokio runtime.
    #[cfg(feature = "signal")]
    pub fn listen_for_ctrl_c(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let signal = Arc::clone(self);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal.fire();
            }
        })
    }
}

impl fmt::Debug for ExitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitSignal")
            .field("subscribers", &self.subscribers())
            .finish()
    }
}

/// Handle returned by [`ExitSignal::subscribe`]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    signal: Weak<ExitSignal>,
}

impl Subscription {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the callback. Returns `false` if it already ran or the signal is gone.
    pub fn unsubscribe(self) -> bool {
        self.signal
            .upgrade()
            .is_some_and(|signal| signal.unsubscribe(self.id))
    }
}
