//! # Fleet Testing Utils
//!
//! Shared testing utilities for the robot mission scheduler.
//!
//! - **InMemoryStore**: one in-memory implementation of the event, robot and
//!   report repositories sharing a single lock, so conditional writes are atomic
//! - **MockRobotControlClient**: scriptable robot control service that records calls
//! - **Builders**: robots and events with sensible defaults
//!
//! ```toml
//! [dev-dependencies]
//! fleet-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

// Re-export commonly used items
pub use builders::*;
pub use helpers::*;
pub use mocks::*;
