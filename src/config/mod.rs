//! 配置管理
//!
//! 配置来源按优先级从低到高：`config.toml`、`config.{APP_ENV}.toml`、
//! `STUDYPLAN_` 前缀环境变量，以及少量常用环境变量的显式覆盖。

mod loader;
mod structs;

pub use structs::*;
