//! # 数据模型
//!
//! 机器人、事件与报告三类实体，以及它们的状态枚举。
//!
//! - 所有时间字段使用 `DateTime<Utc>`，并截断到毫秒精度，与存储层保持一致
//! - 状态枚举在数据库中以大写字符串保存（如 `PENDING`）

/// 为以字符串保存的状态枚举实现 SQLite 编解码
///
/// 要求类型实现 `as_str()` 和 `FromStr`。
macro_rules! impl_sqlite_text_enum {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Sqlite> for $ty {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <str as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $ty {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                s.parse::<$ty>().map_err(Into::into)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                <&str as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub(crate) use impl_sqlite_text_enum;

pub mod event;
pub mod report;
pub mod robot;

pub use event::{Event, EventStatus, MissionOutcome, NewEvent};
pub use report::{NewReport, Report, ReportStatus};
pub use robot::{Robot, RobotStatus};
