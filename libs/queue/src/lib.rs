//! Single-server FIFO queue simulation and the PIN validity window built on
//! top of it
//!
//! Everything in here is pure and synchronous.

mod simulator;
mod window;

pub use simulator::*;
pub use window::*;
