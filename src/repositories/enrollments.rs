//! 课程、班级与学生的关联仓储

use sea_orm::{ConnectionTrait, FromQueryResult, TransactionTrait, Value};

use crate::database::{bulk_upsert, exec, select_all};
use crate::entity::prelude::*;
use crate::errors::{RepositoryError, Result};

const COURSE_STUDENT_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT course_students_pk DO UPDATE SET \
    start_at = EXCLUDED.start_at, \
    end_at = EXCLUDED.end_at, \
    updated_at = EXCLUDED.updated_at, \
    deleted_at = NULL";

const ACCESS_PATH_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT course_students_access_paths_pk \
    DO UPDATE SET course_id = EXCLUDED.course_id, student_id = EXCLUDED.student_id, \
    updated_at = EXCLUDED.updated_at, deleted_at = NULL";

const COURSE_CLASS_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT course_classes_pk \
    DO UPDATE SET updated_at = EXCLUDED.updated_at, deleted_at = NULL";

const CLASS_STUDENT_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT class_students_pk \
    DO UPDATE SET updated_at = EXCLUDED.updated_at, deleted_at = NULL";

#[derive(Debug, FromQueryResult)]
struct IdRow {
    id: String,
}

async fn select_ids<C: ConnectionTrait>(
    db: &C,
    sql: &str,
    values: Vec<Value>,
    context: &str,
) -> Result<Vec<String>> {
    let rows: Vec<IdRow> = select_all(db, sql, values)
        .await
        .map_err(|e| RepositoryError::database_operation(format!("{context}: {e}")))?;
    Ok(rows.into_iter().map(|row| row.id).collect())
}

/// 课程学生仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct CourseStudentRepo;

impl CourseStudentRepo {
    /// 批量 upsert，冲突时更新在读区间并恢复软删除
    pub async fn bulk_upsert<C>(&self, db: &C, items: &[CourseStudentModel]) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, COURSE_STUDENT_CONFLICT, items)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("批量写入课程学生失败: {e}")))
    }

    pub async fn soft_delete_by_student_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        student_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE course_students SET deleted_at = NOW() \
             WHERE student_id = ANY($1) AND deleted_at IS NULL",
            [Value::from(student_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除课程学生失败: {e}")))
    }

    /// 学生当前所在的课程
    pub async fn find_course_ids_by_student<C: ConnectionTrait>(
        &self,
        db: &C,
        student_id: &str,
    ) -> Result<Vec<String>> {
        select_ids(
            db,
            "SELECT DISTINCT course_id AS id FROM course_students \
             WHERE student_id = $1 AND deleted_at IS NULL",
            vec![Value::from(student_id)],
            "查询学生课程失败",
        )
        .await
    }
}

/// 课程学生访问路径仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct CourseStudentAccessPathRepo;

impl CourseStudentAccessPathRepo {
    pub async fn bulk_upsert<C>(
        &self,
        db: &C,
        items: &[CourseStudentAccessPathModel],
    ) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, ACCESS_PATH_CONFLICT, items)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("批量写入访问路径失败: {e}")))
    }

    pub async fn soft_delete_by_course_student_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        course_student_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE course_students_access_paths SET deleted_at = NOW() \
             WHERE course_student_id = ANY($1) AND deleted_at IS NULL",
            [Value::from(course_student_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除访问路径失败: {e}")))
    }

    /// 学生在课程下可访问的校区
    pub async fn find_location_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        course_id: &str,
        student_id: &str,
    ) -> Result<Vec<String>> {
        select_ids(
            db,
            "SELECT location_id AS id FROM course_students_access_paths \
             WHERE course_id = $1 AND student_id = $2 AND deleted_at IS NULL",
            vec![Value::from(course_id), Value::from(student_id)],
            "查询访问路径失败",
        )
        .await
    }
}

/// 课程班级仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct CourseClassRepo;

impl CourseClassRepo {
    pub async fn bulk_upsert<C>(&self, db: &C, items: &[CourseClassModel]) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, COURSE_CLASS_CONFLICT, items)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("批量写入课程班级失败: {e}")))
    }

    /// 软删除课程下给定班级的关联
    pub async fn soft_delete<C: ConnectionTrait>(
        &self,
        db: &C,
        course_id: &str,
        class_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE course_classes SET deleted_at = NOW() \
             WHERE course_id = $1 AND class_id = ANY($2) AND deleted_at IS NULL",
            [Value::from(course_id), Value::from(class_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除课程班级失败: {e}")))
    }

    pub async fn find_class_ids_by_course_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        course_ids: &[String],
    ) -> Result<Vec<String>> {
        select_ids(
            db,
            "SELECT DISTINCT class_id AS id FROM course_classes \
             WHERE course_id = ANY($1) AND deleted_at IS NULL",
            vec![Value::from(course_ids.to_vec())],
            "查询课程班级失败",
        )
        .await
    }
}

/// 班级学生仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassStudentRepo;

impl ClassStudentRepo {
    pub async fn bulk_upsert<C>(&self, db: &C, items: &[ClassStudentModel]) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, CLASS_STUDENT_CONFLICT, items)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("批量写入班级学生失败: {e}")))
    }

    pub async fn soft_delete_by_class_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        class_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE class_students SET deleted_at = NOW() \
             WHERE class_id = ANY($1) AND deleted_at IS NULL",
            [Value::from(class_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除班级学生失败: {e}")))
    }

    pub async fn find_student_ids_by_class_id<C: ConnectionTrait>(
        &self,
        db: &C,
        class_id: &str,
    ) -> Result<Vec<String>> {
        select_ids(
            db,
            "SELECT student_id AS id FROM class_students \
             WHERE class_id = $1 AND deleted_at IS NULL",
            vec![Value::from(class_id)],
            "查询班级学生失败",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::fixtures::exec_ok;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn id_row(id: &str) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("id", Value::from(id.to_string()))])
    }

    #[tokio::test]
    async fn test_course_student_upsert_keeps_enrollment_window() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(1)])
            .into_connection();
        let now = Utc::now().fixed_offset();

        CourseStudentRepo
            .bulk_upsert(
                &db,
                &[CourseStudentModel {
                    course_student_id: "cs-1".into(),
                    course_id: "course-1".into(),
                    student_id: "student-1".into(),
                    start_at: Some(now),
                    end_at: None,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                }],
            )
            .await
            .unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("course_students_pk DO UPDATE SET start_at = EXCLUDED.start_at"));
    }

    #[tokio::test]
    async fn test_access_path_upsert_on_composite_key() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(1)])
            .into_connection();
        let now = Utc::now().fixed_offset();

        CourseStudentAccessPathRepo
            .bulk_upsert(
                &db,
                &[CourseStudentAccessPathModel {
                    course_student_id: "cs-1".into(),
                    location_id: "loc-1".into(),
                    course_id: "course-1".into(),
                    student_id: "student-1".into(),
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                }],
            )
            .await
            .unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("ON CONFLICT ON CONSTRAINT course_students_access_paths_pk"));
    }

    #[tokio::test]
    async fn test_find_student_ids_by_class_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![id_row("student-1"), id_row("student-2")]])
            .into_connection();

        let ids = ClassStudentRepo
            .find_student_ids_by_class_id(&db, "class-1")
            .await
            .unwrap();
        assert_eq!(ids, vec!["student-1".to_string(), "student-2".to_string()]);
    }

    #[tokio::test]
    async fn test_course_class_soft_delete_binds_course_and_classes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(2)])
            .into_connection();

        let affected = CourseClassRepo
            .soft_delete(&db, "course-1", &["class-1".to_string(), "class-2".to_string()])
            .await
            .unwrap();
        assert_eq!(affected, 2);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("WHERE course_id = $1 AND class_id = ANY($2)"));
    }
}
