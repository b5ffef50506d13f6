//! Keyed publish/subscribe for live UI state.
//!
//! A [`SignalHub`] holds the latest value per key and a list of callbacks per
//! key. [`SignalHub::subscribe`] hands the current value to the new callback
//! immediately, then every later change. Callbacks receive `None` when the
//! key is cleared.
//!
//! Callbacks run on the publishing task, outside the hub's lock, so they may
//! call back into the hub.

pub mod progress;
pub mod toast;

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

pub use progress::{GenerationSignal, ProgressBannerTemplate, ProgressReporter};
pub use toast::{Toast, ToastId, ToastQueue};

type Callback<V> = Arc<dyn Fn(Option<&V>) + Send + Sync>;

struct HubState<K, V> {
    values: HashMap<K, V>,
    subscribers: HashMap<K, Vec<(u64, Callback<V>)>>,
    next_id: u64,
}

impl<K, V> Default for HubState<K, V> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            subscribers: HashMap::new(),
            next_id: 0,
        }
    }
}

/// Latest-value publisher keyed by `K`.
///
/// Cheap to clone; clones share state.
pub struct SignalHub<K, V> {
    state: Arc<Mutex<HubState<K, V>>>,
}

impl<K, V> Clone for SignalHub<K, V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<K, V> Default for SignalHub<K, V> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
        }
    }
}

impl<K, V> std::fmt::Debug for SignalHub<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalHub").finish_non_exhaustive()
    }
}

impl<K, V> SignalHub<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `callback` for `key`.
    ///
    /// The callback is invoked right away with the current value, if any.
    /// It stays registered until the returned [`Subscription`] is dropped or
    /// [unsubscribed](Subscription::unsubscribe).
    #[must_use = "dropping the subscription detaches the callback"]
    pub fn subscribe<F>(&self, key: K, callback: F) -> Subscription
    where
        F: Fn(Option<&V>) + Send + Sync + 'static,
    {
        let callback: Callback<V> = Arc::new(callback);
        let (id, current) = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            state
                .subscribers
                .entry(key.clone())
                .or_default()
                .push((id, Arc::clone(&callback)));
            (id, state.values.get(&key).cloned())
        };

        if let Some(value) = current.as_ref() {
            callback(Some(value));
        }

        let weak: Weak<Mutex<HubState<K, V>>> = Arc::downgrade(&self.state);
        Subscription {
            detach: Some(Box::new(move || {
                let Some(state) = weak.upgrade() else {
                    return;
                };
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(list) = state.subscribers.get_mut(&key) {
                    list.retain(|(sub_id, _)| *sub_id != id);
                    if list.is_empty() {
                        state.subscribers.remove(&key);
                    }
                }
            })),
        }
    }

    /// Store `value` for `key` and notify its subscribers.
    pub fn publish(&self, key: &K, value: V) {
        let callbacks = {
            let mut state = self.lock();
            state.values.insert(key.clone(), value.clone());
            Self::callbacks_for(&state, key)
        };
        for callback in callbacks {
            callback(Some(&value));
        }
    }

    /// Replace the value for `key` with `f(previous)` under the hub lock,
    /// then notify subscribers.
    ///
    /// `f` must not call back into the hub.
    pub fn update<F>(&self, key: &K, f: F) -> V
    where
        F: FnOnce(Option<V>) -> V,
    {
        let (value, callbacks) = {
            let mut state = self.lock();
            let value = f(state.values.remove(key));
            state.values.insert(key.clone(), value.clone());
            (value, Self::callbacks_for(&state, key))
        };
        for callback in &callbacks {
            callback(Some(&value));
        }
        value
    }

    /// Remove the value for `key` and notify subscribers with `None`.
    ///
    /// Clearing an absent key notifies nobody.
    pub fn clear(&self, key: &K) {
        let callbacks = {
            let mut state = self.lock();
            if state.values.remove(key).is_none() {
                return;
            }
            Self::callbacks_for(&state, key)
        };
        for callback in callbacks {
            callback(None);
        }
    }

    /// Latest value for `key`.
    #[must_use]
    pub fn current(&self, key: &K) -> Option<V> {
        self.lock().values.get(key).cloned()
    }

    /// Number of live subscriptions for `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &K) -> usize {
        self.lock().subscribers.get(key).map_or(0, Vec::len)
    }

    fn callbacks_for(state: &HubState<K, V>, key: &K) -> Vec<Callback<V>> {
        state
            .subscribers
            .get(key)
            .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }
}

/// Handle to a registered callback.
///
/// Dropping it detaches the callback.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Detach the callback now.
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
