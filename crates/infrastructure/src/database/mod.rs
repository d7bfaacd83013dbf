pub mod sqlite;

pub use sqlite::{
    DatabaseManager, SqliteEventRepository, SqliteReportRepository, SqliteRobotRepository,
};
