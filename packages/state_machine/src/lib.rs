#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A finite state machine with gated transitions.
//!
//! [`StateMachine<E>`] holds up to [`MAX_STATES`] states, each implementing [`State<E>`] and
//! identified by a single-bit [`StateId`]. Ids combine into a [`StateSet`], which lets one
//! transition gate cover several neighbouring states at once.
//!
//! Transitions come in two flavors:
//!
//! * [`StateMachine::goto_state()`] changes state unconditionally.
//! * [`StateMachine::try_transit()`] first asks the leave gates of the current state and then the
//!   enter gates of the target state, and refuses the transition if either says no.
//!
//! Entering a state is denied by default, so every permitted transition has to be declared with
//! an enter gate (or an any-origin enter gate). Leaving a state is allowed by default.
//!
//! The event type `E` travels with every transition: the gates use it to decide and the states
//! receive it in their [`enter()`][State::enter] and [`leave()`][State::leave] hooks.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use state_machine::{State, StateMachine};
//!
//! #[derive(Debug, PartialEq)]
//! enum Input {
//!     Jump,
//!     Land,
//! }
//!
//! struct Grounded;
//! impl State<Input> for Grounded {}
//!
//! #[derive(Default)]
//! struct Airborne {
//!     time_in_air: Duration,
//! }
//!
//! impl State<Input> for Airborne {
//!     fn enter(&mut self, _: &Input) {
//!         self.time_in_air = Duration::ZERO;
//!     }
//!
//!     fn update(&mut self, delta: Duration) {
//!         self.time_in_air += delta;
//!     }
//! }
//!
//! let mut machine = StateMachine::new();
//! let grounded = machine.add_state(Grounded).unwrap();
//! let airborne = machine.add_state(Airborne::default()).unwrap();
//!
//! machine
//!     .add_enter_gate(airborne, grounded, |_, input| *input == Input::Jump)
//!     .unwrap();
//! machine
//!     .add_enter_gate(grounded, airborne, |_, input| *input == Input::Land)
//!     .unwrap();
//!
//! machine.start(grounded, &Input::Land).unwrap();
//!
//! // Landing while already on the ground is not a declared transition.
//! assert!(machine.try_transit(grounded, &Input::Land).is_err());
//!
//! machine.try_transit(airborne, &Input::Jump).unwrap();
//! machine.update(Duration::from_millis(250));
//! machine.try_transit(grounded, &Input::Land).unwrap();
//!
//! assert_eq!(machine.current(), Some(grounded));
//! ```

mod error;
mod gates;
mod machine;
mod state;
mod state_id;

pub use error::*;
pub(crate) use gates::*;
pub use machine::StateMachine;
pub use state::State;
pub use state_id::*;
