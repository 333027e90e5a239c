//! 学习计划仓储层
//!
//! 基于 SeaORM 与 PostgreSQL 的数据访问层，覆盖学习计划、条目、学生副本、
//! 课程关联、作业与提交。
//!
//! # 架构
//! - `config`: 配置管理
//! - `database`: 参数化语句、批量 upsert、批处理与连接池
//! - `entity`: SeaORM 数据库实体
//! - `errors`: 统一错误处理
//! - `models`: 查询参数与结果行
//! - `repositories`: 各表的仓储

pub mod config;
pub mod database;
pub mod entity;
pub mod errors;
pub mod models;
pub mod repositories;
