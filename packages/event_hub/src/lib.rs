#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A thread-safe, keyed event dispatcher.
//!
//! [`EventHub<K, A>`] maps event keys to ordered lists of handlers. Broadcasting an event
//! invokes every handler registered for its key with a shared reference to the event arguments.
//!
//! Handlers run without the hub lock held, so they are free to register and unregister
//! handlers or to broadcast further events. Changes to a key that is being broadcast to are
//! deferred until the broadcast completes, so a broadcast always sees a stable handler list.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use event_hub::EventHub;
//!
//! let hub = EventHub::<&str, (String, u32)>::new();
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&log);
//! let id = hub.register("login", move |(user, attempt)| {
//!     sink.lock().unwrap().push(format!("{user} logged in after {attempt} attempts"));
//! });
//!
//! hub.broadcast(&"login", &("ferris".to_string(), 2));
//! assert!(hub.unregister(&"login", id));
//! hub.broadcast(&"login", &("nobody".to_string(), 1));
//!
//! assert_eq!(*log.lock().unwrap(), vec!["ferris logged in after 2 attempts".to_string()]);
//! ```

mod handler_list;
mod hub;

pub use handler_list::HandlerId;
pub(crate) use handler_list::HandlerList;
pub use hub::EventHub;
