//! Reservation storage and the PIN-gated reservation lifecycle

#[macro_use]
extern crate tracing;

mod config;
mod lifecycle;
#[cfg(any(test, feature = "test-util"))]
mod memory;
mod store;
mod verify;

pub use config::*;
pub use lifecycle::*;
#[cfg(any(test, feature = "test-util"))]
pub use memory::*;
pub use store::*;
pub use verify::*;
