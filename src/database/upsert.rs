//! 单行与多行 upsert

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, ModelTrait, Statement, TransactionTrait};
use tracing::debug;

use super::batch::Batch;
use super::statement::{
    field_names, field_values, generate_placeholders, placeholders_from, stmt, table_name,
};

/// PostgreSQL 单条语句可绑定的参数上限
pub const MAX_BIND_PARAMS: usize = 65535;

/// `INSERT INTO t (a, b, c)`
fn insert_head<E: EntityTrait>() -> String {
    format!(
        "INSERT INTO {} ({})",
        table_name::<E>(),
        field_names::<E>().join(", ")
    )
}

/// 单行 upsert：`INSERT INTO t (fields) VALUES (placeholders) <conflict>`
pub fn upsert_statement<M: ModelTrait>(model: &M, conflict: &str) -> Statement {
    let values = field_values(model);
    let sql = format!(
        "{} VALUES ({}) {}",
        insert_head::<M::Entity>(),
        generate_placeholders(values.len()),
        conflict
    );
    stmt(sql.trim_end().to_string(), values)
}

/// 多行 upsert 语句，按参数上限切分
pub fn bulk_upsert_statements<M: ModelTrait>(items: &[M], conflict: &str) -> Vec<Statement> {
    let width = field_names::<M::Entity>().len().max(1);
    let rows_per_chunk = (MAX_BIND_PARAMS / width).max(1);

    items
        .chunks(rows_per_chunk)
        .map(|chunk| {
            let mut values = Vec::with_capacity(chunk.len() * width);
            let mut rows = Vec::with_capacity(chunk.len());
            for item in chunk {
                rows.push(format!("({})", placeholders_from(values.len() + 1, width)));
                values.extend(field_values(item));
            }
            let sql = format!(
                "{} VALUES {} {}",
                insert_head::<M::Entity>(),
                rows.join(", "),
                conflict
            );
            stmt(sql.trim_end().to_string(), values)
        })
        .collect()
}

/// 批量 upsert，返回受影响的总行数。空输入不访问数据库
///
/// 拆分为多条语句时在同一事务内执行。
pub async fn bulk_upsert<M, C>(db: &C, conflict: &str, items: &[M]) -> Result<u64, DbErr>
where
    M: ModelTrait,
    C: ConnectionTrait + TransactionTrait,
{
    if items.is_empty() {
        return Ok(0);
    }

    let mut statements = bulk_upsert_statements(items, conflict);
    debug!(
        "Bulk upsert of {} rows into {} ({} statements)",
        items.len(),
        table_name::<M::Entity>(),
        statements.len()
    );

    if statements.len() == 1 {
        let statement = statements.remove(0);
        return Ok(db.execute_raw(statement).await?.rows_affected());
    }

    let mut batch = Batch::new();
    for statement in statements {
        batch.queue_statement(statement);
    }
    Ok(batch.exec(db).await?.into_iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{course_study_plans, student_study_plans};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn link(course_id: &str, study_plan_id: &str) -> course_study_plans::Model {
        let now = Utc::now().fixed_offset();
        course_study_plans::Model {
            course_id: course_id.into(),
            study_plan_id: study_plan_id.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_upsert_statement_lists_every_field() {
        let statement = upsert_statement(
            &link("course-1", "sp-1"),
            "ON CONFLICT ON CONSTRAINT course_study_plans_pk DO UPDATE SET updated_at = EXCLUDED.updated_at",
        );

        assert!(statement.sql.starts_with(
            "INSERT INTO course_study_plans (course_id, study_plan_id, created_at, updated_at, deleted_at) VALUES ($1, $2, $3, $4, $5) ON CONFLICT"
        ));
        assert_eq!(statement.values.map(|v| v.0.len()), Some(5));
    }

    #[test]
    fn test_bulk_statements_number_rows_continuously() {
        let items = vec![link("c1", "sp-1"), link("c2", "sp-2")];
        let statements = bulk_upsert_statements(&items, "");

        assert_eq!(statements.len(), 1);
        assert!(
            statements[0]
                .sql
                .ends_with("VALUES ($1, $2, $3, $4, $5), ($6, $7, $8, $9, $10)")
        );
    }

    #[test]
    fn test_bulk_statements_split_under_param_limit() {
        let width = field_names::<student_study_plans::Entity>().len();
        let per_chunk = MAX_BIND_PARAMS / width;
        let now = Utc::now().fixed_offset();
        let items: Vec<_> = (0..per_chunk + 1)
            .map(|i| student_study_plans::Model {
                student_id: format!("student-{i}"),
                study_plan_id: "sp-1".into(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
                master_study_plan_id: None,
            })
            .collect();

        let statements = bulk_upsert_statements(&items, "");
        assert_eq!(statements.len(), 2);
        assert!(statements[1].sql.ends_with(&format!("VALUES ({})", generate_placeholders(width))));
    }

    #[tokio::test]
    async fn test_bulk_upsert_empty_input_is_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let affected = bulk_upsert::<course_study_plans::Model, _>(&db, "", &[])
            .await
            .unwrap();
        assert_eq!(affected, 0);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_upsert_single_chunk() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            }])
            .into_connection();

        let affected = bulk_upsert(
            &db,
            "ON CONFLICT ON CONSTRAINT course_study_plans_pk DO NOTHING",
            &[link("c1", "sp-1"), link("c1", "sp-2")],
        )
        .await
        .unwrap();

        assert_eq!(affected, 2);
        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("ON CONFLICT ON CONSTRAINT course_study_plans_pk DO NOTHING"));
        assert!(!log.contains("BEGIN"));
        assert!(!log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_bulk_upsert_multiple_chunks_share_transaction() {
        let width = field_names::<student_study_plans::Entity>().len();
        let per_chunk = MAX_BIND_PARAMS / width;
        let now = Utc::now().fixed_offset();
        let items: Vec<_> = (0..per_chunk + 1)
            .map(|i| student_study_plans::Model {
                student_id: format!("student-{i}"),
                study_plan_id: "sp-1".into(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
                master_study_plan_id: None,
            })
            .collect();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: per_chunk as u64,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        let affected = bulk_upsert(&db, "ON CONFLICT DO NOTHING", &items).await.unwrap();
        assert_eq!(affected, per_chunk as u64 + 1);

        let transactions = db.into_transaction_log();
        assert_eq!(transactions.len(), 1);
        let log = format!("{:?}", transactions);
        assert_eq!(log.matches("INSERT INTO student_study_plans").count(), 2);
        let begin = log.find("BEGIN").unwrap();
        let commit = log.find("COMMIT").unwrap();
        assert!(begin < log.find("INSERT INTO student_study_plans").unwrap());
        assert!(log.rfind("INSERT INTO student_study_plans").unwrap() < commit);
    }
}
