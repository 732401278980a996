use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use crate::modules::aggregator::AggregatedResult;

pub type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// Dispatch order of an aggregation cycle. Later cycles get larger values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

struct Slot {
    generation: Generation,
    value: Option<Arc<AggregatedResult>>,
}

/// Holds the current aggregated result and fans every replacement out to subscribers.
///
/// Subscribers are plain callbacks. They are called synchronously, in registration
/// order, after the new value is in place, and are expected to pull it with
/// [`UpdatePublisher::current`]. Subscribing does not replay the current value.
///
/// Neither lock is held while callbacks run, so a callback may read the value,
/// subscribe or unsubscribe. Changes to the subscriber list made during a fan-out only
/// take effect from the next one.
pub struct UpdatePublisher {
    slot: Mutex<Slot>,
    subscribers: Mutex<Vec<(SubscriptionHandle, Callback)>>,
    dispatched: AtomicU64,
    next_subscription: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for UpdatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdatePublisher {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                generation: Generation(0),
                value: None,
            }),
            subscribers: Mutex::new(Vec::new()),
            dispatched: AtomicU64::new(0),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Tags a new cycle. Must be called when the cycle is dispatched, not when it ends.
    pub fn begin_cycle(&self) -> Generation {
        Generation(self.dispatched.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Replaces the current value unconditionally and notifies every subscriber.
    #[allow(dead_code)]
    pub fn set_current(&self, result: AggregatedResult) {
        let generation = self.begin_cycle();
        {
            let mut slot = lock(&self.slot);
            slot.generation = slot.generation.max(generation);
            slot.value = Some(Arc::new(result));
        }
        self.notify();
    }

    /// Stores `result` unless a newer generation is already stored.
    ///
    /// Returns whether the value was applied. A rejected result notifies nobody.
    pub fn publish(&self, generation: Generation, result: AggregatedResult) -> bool {
        {
            let mut slot = lock(&self.slot);
            if generation < slot.generation {
                log::warn!(
                    "Discarding stale result of cycle {:?}, cycle {:?} already published",
                    generation,
                    slot.generation
                );
                return false;
            }
            slot.generation = generation;
            slot.value = Some(Arc::new(result));
        }
        self.notify();
        true
    }

    /// Latest published result, `None` until the first successful cycle.
    pub fn current(&self) -> Option<Arc<AggregatedResult>> {
        lock(&self.slot).value.clone()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = SubscriptionHandle(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        lock(&self.subscribers).push((handle, Arc::new(callback)));
        log::debug!("Subscriber {:?} registered", handle);
        handle
    }

    /// Returns `false` if the handle was not registered.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(h, _)| *h != handle);
        let removed = subscribers.len() != before;
        if removed {
            log::debug!("Subscriber {:?} removed", handle);
        }
        removed
    }

    #[allow(dead_code)]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    fn notify(&self) {
        let snapshot: Vec<Callback> = lock(&self.subscribers)
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        log::debug!("Notifying {} subscribers", snapshot.len());
        for callback in snapshot {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::aggregator::Series;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;

    fn result_with(device: &str) -> AggregatedResult {
        let mut aspects = BTreeMap::new();
        aspects.insert(
            String::from("temperature"),
            vec![Series {
                name: device.to_string(),
                points: Vec::new(),
            }],
        );
        AggregatedResult { aspects }
    }

    fn device_of(publisher: &UpdatePublisher) -> Option<String> {
        publisher
            .current()
            .map(|r| r.aspect("temperature").unwrap()[0].name.clone())
    }

    fn counter(publisher: &UpdatePublisher) -> (Arc<AtomicUsize>, SubscriptionHandle) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let handle = publisher.subscribe(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, handle)
    }

    #[test]
    fn no_data_before_first_publish() {
        let publisher = UpdatePublisher::new();
        assert!(publisher.current().is_none());
    }

    #[test]
    fn early_subscriber_gets_one_notification_per_publish() {
        let publisher = UpdatePublisher::new();
        let (count, _) = counter(&publisher);

        publisher.set_current(result_with("a"));
        publisher.set_current(result_with("b"));
        publisher.set_current(result_with("c"));

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(device_of(&publisher).as_deref(), Some("c"));
    }

    #[test]
    fn late_subscriber_gets_no_replay() {
        let publisher = UpdatePublisher::new();
        publisher.set_current(result_with("a"));

        let (count, _) = counter(&publisher);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(device_of(&publisher).as_deref(), Some("a"));

        publisher.set_current(result_with("b"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribers_run_in_registration_order_and_see_new_value() {
        let publisher = Arc::new(UpdatePublisher::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let seen = seen.clone();
            let weak = Arc::downgrade(&publisher);
            publisher.subscribe(move || {
                let device = weak.upgrade().and_then(|p| device_of(&p));
                seen.lock().unwrap().push((id, device));
            });
        }

        publisher.set_current(result_with("fresh"));

        let fresh = Some(String::from("fresh"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(0, fresh.clone()), (1, fresh.clone()), (2, fresh)]
        );
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let publisher = UpdatePublisher::new();
        let (count, handle) = counter(&publisher);

        publisher.set_current(result_with("a"));
        assert!(publisher.unsubscribe(handle));
        assert!(!publisher.unsubscribe(handle));
        publisher.set_current(result_with("b"));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_during_fan_out_keeps_current_pass() {
        let publisher = Arc::new(UpdatePublisher::new());
        let victim: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&publisher);
        let victim_clone = victim.clone();
        publisher.subscribe(move || {
            if let (Some(p), Some(h)) = (weak.upgrade(), victim_clone.lock().unwrap().take()) {
                p.unsubscribe(h);
            }
        });
        let (count, handle) = counter(&publisher);
        *victim.lock().unwrap() = Some(handle);

        publisher.set_current(result_with("a"));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        publisher.set_current(result_with("b"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.subscriber_count(), 1);
    }

    #[test]
    fn stale_generation_is_discarded() {
        let publisher = UpdatePublisher::new();
        let (count, _) = counter(&publisher);

        let older = publisher.begin_cycle();
        let newer = publisher.begin_cycle();
        assert!(older < newer);

        assert!(publisher.publish(newer, result_with("newer")));
        assert!(!publisher.publish(older, result_with("older")));

        assert_eq!(device_of(&publisher).as_deref(), Some("newer"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn older_generation_applies_if_it_finishes_first() {
        let publisher = UpdatePublisher::new();

        let older = publisher.begin_cycle();
        let newer = publisher.begin_cycle();

        assert!(publisher.publish(older, result_with("older")));
        assert!(publisher.publish(newer, result_with("newer")));
        assert_eq!(device_of(&publisher).as_deref(), Some("newer"));
    }

    #[test]
    fn set_current_supersedes_cycles_in_flight() {
        let publisher = UpdatePublisher::new();
        let in_flight = publisher.begin_cycle();

        publisher.set_current(result_with("manual"));

        assert!(!publisher.publish(in_flight, result_with("late")));
        assert_eq!(device_of(&publisher).as_deref(), Some("manual"));
    }
}
