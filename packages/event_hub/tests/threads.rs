//! Multithreaded tests for `EventHub`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use event_hub::EventHub;
use testing::{run_on_threads, with_watchdog};

const THREAD_COUNT: usize = 4;
const ROUNDS: usize = 500;

#[cfg_attr(miri, ignore)]
#[test]
fn concurrent_broadcasts_reach_every_handler() {
    with_watchdog(|| {
        let hub = EventHub::<u8, usize>::new();
        let total = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let sink = Arc::clone(&total);
            hub.register(0, move |amount| {
                sink.fetch_add(*amount, Ordering::Relaxed);
            });
        }

        {
            let hub = hub.clone();

            run_on_threads(THREAD_COUNT, move |_| {
                for _ in 0..ROUNDS {
                    assert_eq!(hub.broadcast(&0, &1), 3);
                }
            });
        }

        assert_eq!(total.load(Ordering::Relaxed), THREAD_COUNT * ROUNDS * 3);
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn registration_races_with_broadcast() {
    with_watchdog(|| {
        let hub = EventHub::<u8, ()>::new();

        {
            let hub = hub.clone();

            run_on_threads(THREAD_COUNT, move |index| {
                for _ in 0..ROUNDS {
                    if index % 2 == 0 {
                        let id = hub.register(0, |()| {});
                        assert!(hub.unregister(&0, id));
                    } else {
                        hub.broadcast(&0, &());
                    }
                }
            });
        }

        // Every registration was undone, whether directly or after a broadcast completed.
        assert_eq!(hub.handler_count(&0), 0);
        assert!(hub.is_empty());
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn handlers_may_broadcast_from_many_threads() {
    with_watchdog(|| {
        let hub = EventHub::<&'static str, usize>::new();
        let leaf_calls = Arc::new(AtomicUsize::new(0));

        let relay = hub.clone();
        hub.register("root", move |value| {
            relay.broadcast(&"leaf", value);
        });

        let sink = Arc::clone(&leaf_calls);
        hub.register("leaf", move |_| {
            sink.fetch_add(1, Ordering::Relaxed);
        });

        {
            let hub = hub.clone();

            run_on_threads(THREAD_COUNT, move |index| {
                for _ in 0..ROUNDS {
                    hub.broadcast(&"root", &index);
                }
            });
        }

        assert_eq!(leaf_calls.load(Ordering::Relaxed), THREAD_COUNT * ROUNDS);
    });
}
