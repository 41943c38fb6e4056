use std::cell::Cell;

thread_local! {
    static CONSTRUCTED: Cell<usize> = const { Cell::new(0) };
    static DROPPED: Cell<usize> = const { Cell::new(0) };
}

/// A pool payload that counts how often it is constructed and dropped on the current thread.
///
/// Counting per thread keeps tests that run in parallel from observing each other's payloads.
/// Take a [`Tracked::counters()`] snapshot before exercising a pool and compare with
/// [`TrackedCounters::since()`] afterwards.
///
/// Each instance also remembers a serial number (its construction order on its thread), which
/// makes it easy to tell whether a payload was reused or constructed anew.
#[derive(Debug)]
pub struct Tracked {
    serial: usize,
}

impl Tracked {
    /// Position of this instance in the construction order of the current thread.
    #[must_use]
    pub fn serial(&self) -> usize {
        self.serial
    }

    /// Snapshot of the construction and drop counts of the current thread.
    #[must_use]
    pub fn counters() -> TrackedCounters {
        TrackedCounters {
            constructed: CONSTRUCTED.with(Cell::get),
            dropped: DROPPED.with(Cell::get),
        }
    }
}

impl Default for Tracked {
    fn default() -> Self {
        let serial = CONSTRUCTED.with(|count| {
            let serial = count.get();
            count.set(serial.wrapping_add(1));
            serial
        });

        Self { serial }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        DROPPED.with(|count| count.set(count.get().wrapping_add(1)));
    }
}

/// Construction and drop counts of [`Tracked`] instances.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TrackedCounters {
    constructed: usize,
    dropped: usize,
}

impl TrackedCounters {
    /// How many instances were constructed.
    #[must_use]
    pub fn constructed(&self) -> usize {
        self.constructed
    }

    /// How many instances were dropped.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// The counts accumulated between `earlier` and this snapshot.
    #[must_use]
    pub fn since(self, earlier: Self) -> Self {
        Self {
            constructed: self.constructed.wrapping_sub(earlier.constructed),
            dropped: self.dropped.wrapping_sub(earlier.dropped),
        }
    }
}
