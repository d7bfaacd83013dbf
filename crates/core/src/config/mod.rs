//! 配置管理
//!
//! 配置按以下顺序叠加：内置默认值、TOML 配置文件、`FLEET_` 前缀的环境变量。
//! 每个配置段都提供 `validate()`，加载完成后统一校验。

pub mod models;

pub use models::*;
