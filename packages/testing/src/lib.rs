#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests and benchmarks in the slot pool workspace.

mod tracked;

pub use tracked::*;

use std::sync::{Arc, Barrier, mpsc};
use std::time::Duration;
use std::{env, panic, thread};

/// How long a test body may run before [`with_watchdog`] declares it hung.
const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs a test body on a separate thread and panics if it does not finish in time.
///
/// Multithreaded pool tests can deadlock if the locking is wrong. Without a watchdog such a
/// test hangs the whole test run instead of failing.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the body runs directly on
/// the calling thread so that mutation testing can detect hanging mutants by its own timeout.
///
/// # Panics
///
/// Panics if the body panics or exceeds the timeout.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 6 * 7);
/// assert_eq!(answer, 42);
/// ```
pub fn with_watchdog<F, R>(body: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return body();
    }

    let (tx, rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        // If the receiver has already timed out, nobody cares about the result.
        drop(tx.send(body()));
    });

    match rx.recv_timeout(WATCHDOG_TIMEOUT) {
        Ok(result) => {
            worker.join().expect("test thread already delivered its result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded the {WATCHDOG_TIMEOUT:?} watchdog timeout");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match worker.join() {
            Ok(()) => panic!("test thread exited without delivering a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Runs `body` on `thread_count` threads that all start at the same moment and collects the
/// results in thread index order.
///
/// # Panics
///
/// Panics if any of the threads panics.
///
/// # Example
///
/// ```rust
/// use testing::run_on_threads;
///
/// let doubled = run_on_threads(4, |index| index * 2);
/// assert_eq!(doubled, vec![0, 2, 4, 6]);
/// ```
pub fn run_on_threads<F, R>(thread_count: usize, body: F) -> Vec<R>
where
    F: Fn(usize) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    let body = Arc::new(body);
    let start = Arc::new(Barrier::new(thread_count));

    let workers: Vec<_> = (0..thread_count)
        .map(|index| {
            let body = Arc::clone(&body);
            let start = Arc::clone(&start);

            thread::spawn(move || {
                start.wait();
                body(index)
            })
        })
        .collect();

    workers
        .into_iter()
        .map(|worker| match worker.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        })
        .collect()
}
