use dotenv::dotenv;
use human_panic::setup_panic;
use migration::{Migrator, MigratorTrait};
use tracing::{debug, info, warn};

use study_plan_repository::config::AppConfig;
use study_plan_repository::database;
use study_plan_repository::errors::{RepositoryError, Result};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let start = chrono::Utc::now();

    // 初始化配置
    setup_panic!();
    AppConfig::init()?;
    let config = AppConfig::get();

    // 初始化日志
    let stdout_log = std::io::stdout();
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(stdout_log);
    let filter = tracing_subscriber::EnvFilter::new(&config.app.log_level);
    let tracing_format = tracing_subscriber::fmt::format()
        .with_level(true)
        .with_ansi(true);

    let tracing_builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking_writer)
        .event_format(tracing_format);

    if config.is_development() {
        tracing_builder
            .with_file(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_builder.json().init();
    }

    warn!(
        "Starting {}
        Project: {}
        Version: {}
        Authors: {}",
        config.app.system_name,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_AUTHORS")
    );

    let db = database::connect_and_migrate(&config.database).await?;
    info!(
        "Schema is up to date ({} migrations known)",
        Migrator::migrations().len()
    );

    db.close()
        .await
        .map_err(|e| RepositoryError::database_connection(format!("关闭数据库连接失败: {e}")))?;

    debug!(
        "Finished in {} ms",
        chrono::Utc::now()
            .signed_duration_since(start)
            .num_milliseconds()
    );
    Ok(())
}
