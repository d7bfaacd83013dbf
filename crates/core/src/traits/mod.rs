pub mod repository;
pub mod robot_control;

pub use repository::*;
pub use robot_control::*;
