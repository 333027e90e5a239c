//! 数据库访问约定
//!
//! 仓储层通过这里构造参数化语句、执行批量 upsert 与批处理，
//! 并负责建立 PostgreSQL 连接池与运行迁移。

mod batch;
mod statement;
mod upsert;

pub use batch::Batch;
pub use statement::{
    QueryBuilder, composite_keys_placeholders, exec, field_names, field_values,
    generate_placeholders, placeholders_from, select_all, select_list, select_one, stmt,
    table_name,
};
pub use upsert::{MAX_BIND_PARAMS, bulk_upsert, bulk_upsert_statements, upsert_statement};

use crate::config::DatabaseConfig;
use crate::errors::{RepositoryError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// 校验连接 URL，仅接受 PostgreSQL
pub fn check_database_url(url: &str) -> Result<()> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(())
    } else {
        Err(RepositoryError::database_config(format!(
            "不支持的数据库 URL: {url}. 仅支持 postgres:// 或 postgresql://"
        )))
    }
}

/// 建立连接池
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    check_database_url(&config.url)?;

    let mut opt = ConnectOptions::new(config.url.as_str());
    opt.max_connections(config.pool_size)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.timeout))
        .acquire_timeout(Duration::from_secs(config.timeout))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(config.sqlx_logging)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    let db = Database::connect(opt)
        .await
        .map_err(|e| RepositoryError::database_connection(format!("无法连接到数据库: {e}")))?;

    info!(
        "数据库连接池已建立 (pool_size = {}, min_connections = {})",
        config.pool_size, config.min_connections
    );
    Ok(db)
}

/// 建立连接并运行全部待执行迁移
pub async fn connect_and_migrate(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let db = connect(config).await?;

    Migrator::up(&db, None)
        .await
        .map_err(|e| RepositoryError::database_operation(format!("数据库迁移失败: {e}")))?;

    info!("数据库迁移完成");
    Ok(db)
}
