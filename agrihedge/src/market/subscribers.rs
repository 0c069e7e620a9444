use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use super::lock;

type Callback = Arc<dyn Fn(i64) + Send + Sync>;

/// Outcome of one notification round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyReport {
    pub price: i64,
    pub delivered: usize,
    /// Panic messages of the callbacks that failed, in notification order
    pub failures: Vec<String>,
}

#[derive(Default)]
struct Entries {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

/// Price listeners, notified in registration order
#[derive(Default)]
pub struct SubscriberRegistry {
    entries: Mutex<Entries>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        let mut entries = lock(&self.entries);
        let id = entries.next_id;
        entries.next_id += 1;
        entries.callbacks.push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = lock(&self.entries);
        let before = entries.callbacks.len();
        entries.callbacks.retain(|(entry_id, _)| *entry_id != id);
        entries.callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every subscriber with `price`
    ///
    /// The round works on a snapshot taken up front, so callbacks may
    /// subscribe or unsubscribe without affecting the round in progress. A
    /// panicking callback is caught and recorded; the rest still run.
    pub fn notify(&self, price: i64) -> NotifyReport {
        let snapshot: Vec<Callback> = lock(&self.entries)
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        let mut report = NotifyReport {
            price,
            delivered: 0,
            failures: Vec::new(),
        };
        for callback in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(price))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    let message = if let Some(s) = payload.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = payload.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "unknown panic".to_string()
                    };
                    report.failures.push(message);
                }
            }
        }
        report
    }
}

/// Handle returned by `subscribe`
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to remove the callback.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    /// Remove this callback. Returns whether it was still registered, so
    /// repeated calls are harmless and return false.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Arc<Mutex<Vec<(&'static str, i64)>>>;

    fn recorder() -> (Log, impl Fn(&'static str) -> Box<dyn Fn(i64) + Send + Sync>) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let log_for_make = Arc::clone(&log);
        let make = move |name: &'static str| -> Box<dyn Fn(i64) + Send + Sync> {
            let log = Arc::clone(&log_for_make);
            Box::new(move |price: i64| log.lock().unwrap().push((name, price)))
        };
        (log, make)
    }

    #[test]
    fn notifies_in_registration_order() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (log, make) = recorder();
        let _a = registry.subscribe(make("a"));
        let _b = registry.subscribe(make("b"));
        let _c = registry.subscribe(make("c"));

        let report = registry.notify(4510);

        assert_eq!(report.delivered, 3);
        assert!(report.failures.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![("a", 4510), ("b", 4510), ("c", 4510)]);
    }

    #[test]
    fn unsubscribe_removes_only_that_callback() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (log, make) = recorder();
        let a = registry.subscribe(make("a"));
        let _b = registry.subscribe(make("b"));

        assert!(a.unsubscribe());
        assert!(!a.unsubscribe());
        assert_eq!(registry.len(), 1);

        registry.notify(4499);
        assert_eq!(*log.lock().unwrap(), vec![("b", 4499)]);
    }

    #[test]
    fn same_closure_twice_is_two_subscriptions() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (log, make) = recorder();
        let first = registry.subscribe(make("x"));
        let _second = registry.subscribe(make("x"));

        first.unsubscribe();
        registry.notify(1);
        assert_eq!(*log.lock().unwrap(), vec![("x", 1)]);
    }

    #[test]
    fn panicking_callback_does_not_stop_the_round() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (log, make) = recorder();
        let _a = registry.subscribe(make("a"));
        let _boom = registry.subscribe(|_| panic!("listener exploded"));
        let _c = registry.subscribe(make("c"));

        let report = registry.notify(4520);

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures, vec!["listener exploded".to_string()]);
        assert_eq!(*log.lock().unwrap(), vec![("a", 4520), ("c", 4520)]);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let registry = Arc::new(SubscriberRegistry::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_in_callback = Arc::clone(&slot);
        let subscription = registry.subscribe(move |_| {
            if let Some(sub) = slot_in_callback.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(subscription);

        assert_eq!(registry.notify(1).delivered, 1);
        assert!(registry.is_empty());
        assert_eq!(registry.notify(2).delivered, 0);
    }

    #[test]
    fn handle_outliving_registry_is_inert() {
        let registry = Arc::new(SubscriberRegistry::new());
        let subscription = registry.subscribe(|_| {});
        drop(registry);
        assert!(!subscription.unsubscribe());
    }
}
