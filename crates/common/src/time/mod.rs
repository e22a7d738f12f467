//! Time abstractions.
//!
//! Services that reason about wall-clock phases (key rotation, session
//! expiry, audit timestamps) take a [`Clock`] so tests can drive time
//! deterministically with [`MockClock`].

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
