//! 语句批处理
//!
//! 按入队顺序在同一事务内执行，结果按入队顺序返回。任一语句失败即回滚整批。

use sea_orm::{
    ConnectionTrait, DbErr, FromQueryResult, Statement, TransactionSession, TransactionTrait, Value,
};
use tracing::{debug, warn};

use super::statement::stmt;

/// 待执行语句队列
#[derive(Debug, Default)]
pub struct Batch {
    statements: Vec<Statement>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队一条语句
    pub fn queue<S, I>(&mut self, sql: S, values: I)
    where
        S: Into<String>,
        I: IntoIterator<Item = Value>,
    {
        self.statements.push(stmt(sql, values));
    }

    /// 入队已构造好的语句
    pub fn queue_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// 执行全部语句，返回每条语句的受影响行数
    pub async fn exec<C>(self, db: &C) -> Result<Vec<u64>, DbErr>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if self.statements.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Executing batch of {} statements", self.statements.len());

        let txn = db.begin().await?;
        let mut affected = Vec::with_capacity(self.statements.len());

        for (index, statement) in self.statements.into_iter().enumerate() {
            match txn.execute_raw(statement).await {
                Ok(result) => affected.push(result.rows_affected()),
                Err(e) => {
                    warn!("Batch statement #{} failed, rolling back: {}", index, e);
                    txn.rollback().await?;
                    return Err(e);
                }
            }
        }

        txn.commit().await?;
        Ok(affected)
    }

    /// 执行全部查询，返回每条语句的结果集
    pub async fn query<M, C>(self, db: &C) -> Result<Vec<Vec<M>>, DbErr>
    where
        M: FromQueryResult,
        C: ConnectionTrait + TransactionTrait,
    {
        if self.statements.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Querying batch of {} statements", self.statements.len());

        let txn = db.begin().await?;
        let mut results = Vec::with_capacity(self.statements.len());

        for (index, statement) in self.statements.into_iter().enumerate() {
            match M::find_by_statement(statement).all(&txn).await {
                Ok(rows) => results.push(rows),
                Err(e) => {
                    warn!("Batch query #{} failed, rolling back: {}", index, e);
                    txn.rollback().await?;
                    return Err(e);
                }
            }
        }

        txn.commit().await?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;

    #[derive(Debug, FromQueryResult)]
    struct IdRow {
        id: String,
    }

    fn id_row(id: &str) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("id", Value::from(id.to_string()))])
    }

    #[tokio::test]
    async fn test_empty_batch_skips_transaction() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let affected = Batch::new().exec(&db).await.unwrap();
        assert!(affected.is_empty());
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_exec_returns_rows_affected_in_queue_order() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        let mut batch = Batch::new();
        batch.queue("UPDATE a SET x = $1", [Value::from("first")]);
        batch.queue("UPDATE b SET y = $1", [Value::from("second")]);
        assert_eq!(batch.len(), 2);

        let affected = batch.exec(&db).await.unwrap();
        assert_eq!(affected, vec![2, 0]);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("BEGIN"));
        assert!(log.contains("COMMIT"));
        let first = log.find("UPDATE a SET x").unwrap();
        let second = log.find("UPDATE b SET y").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_query_collects_result_sets() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row("a"), id_row("b")], vec![]])
            .into_connection();

        let mut batch = Batch::new();
        batch.queue("SELECT id FROM t WHERE k = $1", [Value::from("x")]);
        batch.queue("SELECT id FROM t WHERE k = $1", [Value::from("y")]);

        let results: Vec<Vec<IdRow>> = batch.query(&db).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].len(), 2);
        assert_eq!(results[0][1].id, "b");
        assert!(results[1].is_empty());
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back_batch() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_exec_errors([DbErr::Custom("constraint violated".into())])
            .into_connection();

        let mut batch = Batch::new();
        batch.queue("INSERT INTO t VALUES ($1)", [Value::from("x")]);
        batch.queue("INSERT INTO t VALUES ($1)", [Value::from("y")]);
        batch.queue("INSERT INTO t VALUES ($1)", [Value::from("z")]);

        let err = batch.exec(&db).await.unwrap_err();
        assert!(err.to_string().contains("constraint violated"));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("BEGIN"));
        assert!(log.contains("ROLLBACK"));
        assert!(!log.contains("COMMIT"));
        assert!(!log.contains("\"z\""));
        assert!(log.find("\"y\"").unwrap() < log.find("ROLLBACK").unwrap());
    }

    #[tokio::test]
    async fn test_failed_query_rolls_back_batch() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("relation missing".into())])
            .into_connection();

        let mut batch = Batch::new();
        batch.queue("SELECT id FROM t WHERE k = $1", [Value::from("x")]);

        let err = batch.query::<IdRow, _>(&db).await.unwrap_err();
        assert!(err.to_string().contains("relation missing"));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("ROLLBACK"));
        assert!(!log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_exec_inside_transaction_uses_savepoint() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let txn = db.begin().await.unwrap();
        let mut batch = Batch::new();
        batch.queue("UPDATE a SET x = $1", [Value::from("inner")]);
        assert_eq!(batch.exec(&txn).await.unwrap(), vec![1]);
        txn.commit().await.unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert_eq!(log.matches("BEGIN").count(), 1);
        assert_eq!(log.matches("COMMIT").count(), 1);
        let savepoint = log.find("SAVEPOINT savepoint_1").unwrap();
        let release = log.find("RELEASE SAVEPOINT savepoint_1").unwrap();
        let commit = log.find("COMMIT").unwrap();
        assert!(savepoint < log.find("UPDATE a SET x").unwrap());
        assert!(release < commit);
    }

    #[tokio::test]
    async fn test_failure_inside_transaction_rolls_back_to_savepoint() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_errors([DbErr::Custom("constraint violated".into())])
            .into_connection();

        let txn = db.begin().await.unwrap();
        let mut batch = Batch::new();
        batch.queue("UPDATE a SET x = $1", [Value::from("inner")]);
        assert!(batch.exec(&txn).await.is_err());
        txn.rollback().await.unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("ROLLBACK TO SAVEPOINT savepoint_1"));
        assert!(!log.contains("COMMIT"));
    }
}
