//! Event dispatch
//!
//! The polling engine that turns due bookings into started missions, and the
//! adapter that classifies robot control responses for it.

pub mod dispatch_client;
pub mod engine;

pub use dispatch_client::{DispatchClientAdapter, DispatchOutcome};
pub use engine::{EventDispatchEngine, EventOutcome, TickSummary};
