pub mod database;
pub mod observability;
pub mod robot_control;

pub use database::*;
pub use observability::*;
pub use robot_control::*;
