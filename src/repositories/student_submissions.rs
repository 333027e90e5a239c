//! 学生提交仓储
//!
//! 列表与按条目查询读取 `student_latest_submissions` 视图，
//! 即每个学生在每个条目上的最新一次提交。

use chrono::Utc;
use sea_orm::{ConnectionTrait, TransactionTrait, Value};
use tracing::debug;

use crate::database::{
    Batch, QueryBuilder, exec, select_all, select_list, select_one, table_name, upsert_statement,
};
use crate::entity::student_submissions::{self, Entity as StudentSubmissions};
use crate::entity::users::Entity as Users;
use crate::errors::{RepositoryError, Result};
use crate::models::AssignmentType;
use crate::models::study_plan_items::requests::StudyPlanItemIdentity;
use crate::models::submissions::requests::{StudentSubmissionFilter, SubmissionGrade};
use crate::models::submissions::responses::StudentSubmissionInfo;

const UPDATE_GRADE_STATUS_SQL: &str = "UPDATE student_submissions \
    SET updated_at = NOW(), student_submission_grade_id = $1, status = $2, editor_id = $3 \
    WHERE student_submission_id = $4 AND deleted_at IS NULL";

const BY_IDENTITIES_SQL: &str = r#"FROM UNNEST($1::TEXT[], $2::TEXT[], $3::TEXT[]) AS ident(student_id, study_plan_id, learning_material_id)
JOIN student_submissions ss
    ON ss.student_id = ident.student_id
    AND ss.study_plan_id = ident.study_plan_id
    AND ss.learning_material_id = ident.learning_material_id
JOIN study_plan_items msp
    ON msp.study_plan_id = ident.study_plan_id
    AND COALESCE(NULLIF(msp.content_structure ->> 'lo_id', ''), msp.content_structure ->> 'assignment_id') = ident.learning_material_id
    AND msp.deleted_at IS NULL
LEFT JOIN student_study_plans ssp
    ON ssp.student_id = ident.student_id
    AND ssp.master_study_plan_id = ident.study_plan_id
    AND ssp.deleted_at IS NULL
LEFT JOIN study_plan_items isp
    ON isp.study_plan_id = ssp.study_plan_id
    AND isp.copy_study_plan_item_id = msp.study_plan_item_id
    AND isp.deleted_at IS NULL
JOIN study_plans sp ON sp.study_plan_id = ident.study_plan_id"#;

/// 学生提交仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct StudentSubmissionRepo;

impl StudentSubmissionRepo {
    /// 以新生成的 id 与当前时间写入提交，返回写入后的模型
    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        mut submission: student_submissions::Model,
    ) -> Result<student_submissions::Model> {
        let now = Utc::now().fixed_offset();
        submission.student_submission_id = uuid::Uuid::now_v7().to_string();
        submission.created_at = now;
        submission.updated_at = now;

        db.execute_raw(upsert_statement(&submission, ""))
            .await
            .map_err(|e| RepositoryError::database_operation(format!("写入学生提交失败: {e}")))?;

        debug!("Created student submission {}", submission.student_submission_id);
        Ok(submission)
    }

    pub async fn get<C: ConnectionTrait>(
        &self,
        db: &C,
        id: &str,
    ) -> Result<student_submissions::Model> {
        select_one(
            db,
            format!(
                "SELECT {} FROM student_submissions \
                 WHERE student_submission_id = $1 AND deleted_at IS NULL",
                select_list::<StudentSubmissions>(None)
            ),
            [Value::from(id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学生提交失败: {e}")))?
        .ok_or_else(|| RepositoryError::not_found(format!("学生提交不存在: {id}")))
    }

    /// 按筛选条件列出最新提交
    pub async fn list<C: ConnectionTrait>(
        &self,
        db: &C,
        filter: &StudentSubmissionFilter,
    ) -> Result<Vec<student_submissions::Model>> {
        let (sql, values) = list_query(filter).into_parts();
        debug!("Listing student submissions with {} params", values.len());
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询学生提交列表失败: {e}")))
    }

    /// 每个条目最新的一次提交
    pub async fn retrieve_by_study_plan_item_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_item_ids: &[String],
    ) -> Result<Vec<student_submissions::Model>> {
        select_all(
            db,
            format!(
                "SELECT DISTINCT ON (ss.study_plan_item_id) {} \
                 FROM student_submissions ss \
                 JOIN study_plan_items spi ON ss.study_plan_item_id = spi.study_plan_item_id \
                 WHERE spi.study_plan_item_id = ANY($1) AND ss.deleted_at IS NULL \
                 ORDER BY ss.study_plan_item_id DESC, ss.created_at DESC, ss.student_submission_id DESC",
                select_list::<StudentSubmissions>(Some("ss"))
            ),
            [Value::from(study_plan_item_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("按条目查询学生提交失败: {e}")))
    }

    /// 记录批改结果与状态
    pub async fn update_grade_status<C: ConnectionTrait>(
        &self,
        db: &C,
        id: &str,
        grade_id: &str,
        editor_id: &str,
        status: &str,
    ) -> Result<u64> {
        exec(
            db,
            UPDATE_GRADE_STATUS_SQL,
            [
                Value::from(grade_id),
                Value::from(status),
                Value::from(editor_id),
                Value::from(id),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("更新批改状态失败: {e}")))
    }

    /// 批量更新批改结果，同一批次内使用相同的状态与批改人
    pub async fn bulk_update_status<C>(
        &self,
        db: &C,
        editor_id: &str,
        status: &str,
        grades: &[SubmissionGrade],
    ) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut batch = Batch::new();
        for grade in grades {
            batch.queue(
                "UPDATE student_submissions \
                 SET updated_at = NOW(), student_submission_grade_id = $1, status = $2, editor_id = $3 \
                 WHERE student_submission_id = $4",
                [
                    Value::from(grade.student_submission_grade_id.clone()),
                    Value::from(status),
                    Value::from(editor_id),
                    Value::from(grade.student_submission_id.clone()),
                ],
            );
        }
        batch
            .exec(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("批量更新批改状态失败: {e}")))?;
        Ok(())
    }

    /// 软删除条目下的全部提交，没有行受影响时报错
    pub async fn delete_by_study_plan_item_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_item_ids: &[String],
        deleted_by: &str,
    ) -> Result<u64> {
        let affected = exec(
            db,
            "UPDATE student_submissions SET deleted_at = NOW(), deleted_by = $1 \
             WHERE study_plan_item_id = ANY($2)",
            [Value::from(deleted_by), Value::from(study_plan_item_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除学生提交失败: {e}")))?;

        if affected == 0 {
            return Err(RepositoryError::database_operation(
                "no row affected, failed to delete study plan item submissions",
            ));
        }
        Ok(affected)
    }

    /// 按（学生、主计划、学习资料）查询提交，附带课程与条目起止时间
    ///
    /// 每个身份都必须带学生 id。
    pub async fn retrieve_by_study_plan_identities<C: ConnectionTrait>(
        &self,
        db: &C,
        identities: &[StudyPlanItemIdentity],
    ) -> Result<Vec<StudentSubmissionInfo>> {
        if identities.is_empty() {
            return Ok(Vec::new());
        }

        let mut student_ids = Vec::with_capacity(identities.len());
        let mut study_plan_ids = Vec::with_capacity(identities.len());
        let mut learning_material_ids = Vec::with_capacity(identities.len());
        for identity in identities {
            let student_id = identity.student_id.clone().ok_or_else(|| {
                RepositoryError::validation(format!(
                    "student id is required for study plan {} / {}",
                    identity.study_plan_id, identity.learning_material_id
                ))
            })?;
            student_ids.push(student_id);
            study_plan_ids.push(identity.study_plan_id.clone());
            learning_material_ids.push(identity.learning_material_id.clone());
        }

        let sql = format!(
            "SELECT {}, sp.course_id, \
             CASE WHEN isp.updated_at > msp.updated_at THEN isp.start_date ELSE msp.start_date END AS start_date, \
             CASE WHEN isp.updated_at > msp.updated_at THEN isp.end_date ELSE msp.end_date END AS end_date \
             {BY_IDENTITIES_SQL}",
            select_list::<StudentSubmissions>(Some("ss"))
        );
        select_all(
            db,
            sql,
            [
                Value::from(student_ids),
                Value::from(study_plan_ids),
                Value::from(learning_material_ids),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("按身份查询学生提交失败: {e}")))
    }

    pub async fn find_by_submission_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        submission_ids: &[String],
    ) -> Result<Vec<student_submissions::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM student_submissions WHERE student_submission_id = ANY($1)",
                select_list::<StudentSubmissions>(None)
            ),
            [Value::from(submission_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("按 id 查询学生提交失败: {e}")))
    }
}

/// 提交列表语句，可选条件按出现顺序连续编号
///
/// 给出课程时，有校区则经访问路径限定课程与校区，否则直接按课程过滤；
/// 班级条件只在给出课程时生效。未给课程但有校区时，按校区覆盖的全部课程过滤。
fn list_query(filter: &StudentSubmissionFilter) -> QueryBuilder {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM student_latest_submissions sls \
         JOIN assignments a ON a.assignment_id = sls.assignment_id \
         JOIN study_plans sp ON sp.study_plan_id = sls.study_plan_id \
         JOIN course_students cs ON cs.course_id = sp.course_id AND cs.student_id = sls.student_id \
         WHERE sls.deleted_at IS NULL AND a.deleted_at IS NULL \
         AND sp.deleted_at IS NULL AND cs.deleted_at IS NULL",
        select_list::<StudentSubmissions>(Some("sls"))
    ));

    let task = builder.bind(AssignmentType::Task);
    builder.push(&format!(" AND a.type <> {task}"));

    if let Some(offset_id) = &filter.offset_id {
        let p = builder.bind(offset_id.clone());
        builder.push(&format!(" AND sls.student_submission_id < {p}"));
    }
    if let Some(student_ids) = &filter.student_ids {
        let p = builder.bind(student_ids.clone());
        builder.push(&format!(" AND sls.student_id = ANY({p})"));
    }
    if let Some(statuses) = &filter.statuses {
        let p = builder.bind(statuses.clone());
        builder.push(&format!(" AND sls.status = ANY({p})"));
    }
    if let Some(created_at) = filter.created_at {
        let p = builder.bind(created_at);
        builder.push(&format!(" AND sls.created_at < {p}"));
    }
    if let Some(name) = &filter.assignment_name {
        let p = builder.bind(name.clone());
        builder.push(&format!(" AND a.name ILIKE '%' || {p} || '%'"));
    }

    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        let start = builder.bind(start);
        let end = builder.bind(end);
        builder.push(&format!(
            " AND EXISTS (SELECT 1 FROM study_plan_items spi \
             WHERE spi.deleted_at IS NULL AND spi.study_plan_item_id = sls.study_plan_item_id \
             AND spi.start_date BETWEEN {start} AND {end})"
        ));
    }

    match &filter.course_id {
        Some(course_id) => {
            let course = builder.bind(course_id.clone());
            if filter.location_ids.is_empty() {
                builder.push(&format!(" AND cs.course_id = {course}"));
            } else {
                let locations = builder.bind(filter.location_ids.clone());
                builder.push(&format!(
                    " AND EXISTS (SELECT 1 FROM course_students_access_paths csap \
                     WHERE csap.deleted_at IS NULL AND csap.course_student_id = cs.course_student_id \
                     AND csap.course_id = {course} AND csap.location_id = ANY({locations}))"
                ));
            }

            if !filter.class_ids.is_empty() {
                let classes = builder.bind(filter.class_ids.clone());
                builder.push(&format!(
                    " AND EXISTS (SELECT 1 FROM class_students cls \
                     WHERE cls.deleted_at IS NULL AND cls.student_id = sls.student_id \
                     AND cls.class_id = ANY({classes}))"
                ));
            }
        }
        None if !filter.location_ids.is_empty() => {
            let locations = builder.bind(filter.location_ids.clone());
            builder.push(&format!(
                " AND EXISTS (SELECT 1 FROM course_students_access_paths csap \
                 WHERE csap.deleted_at IS NULL AND csap.course_student_id = cs.course_student_id \
                 AND csap.location_id = ANY({locations}))"
            ));
        }
        None => {}
    }

    if let Some(student_name) = &filter.student_name {
        let p = builder.bind(student_name.clone());
        builder.push(&format!(
            " AND EXISTS (SELECT 1 FROM {} u \
             WHERE u.deleted_at IS NULL AND u.user_id = sls.student_id \
             AND u.name ILIKE '%' || {p} || '%')",
            table_name::<Users>()
        ));
    }

    let limit = builder.bind(i64::from(filter.limit));
    builder.push(&format!(
        " ORDER BY sls.student_submission_id DESC LIMIT {limit}"
    ));
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::fixtures::{exec_ok, student_submission, submission_row};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_assigns_time_ordered_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(1)])
            .into_connection();

        let created = StudentSubmissionRepo
            .create(&db, student_submission("", "item-1"))
            .await
            .unwrap();

        assert!(!created.student_submission_id.is_empty());
        assert!(uuid::Uuid::parse_str(&created.student_submission_id).is_ok());
        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("INSERT INTO student_submissions (student_submission_id, study_plan_item_id"));
    }

    #[tokio::test]
    async fn test_get_missing_submission_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<student_submissions::Model>::new()])
            .into_connection();

        let err = StudentSubmissionRepo.get(&db, "sub-1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_retrieve_by_study_plan_item_ids_keeps_latest() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![student_submission("sub-2", "item-1")]])
            .into_connection();

        let submissions = StudentSubmissionRepo
            .retrieve_by_study_plan_item_ids(&db, &["item-1".to_string()])
            .await
            .unwrap();
        assert_eq!(submissions[0].student_submission_id, "sub-2");

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("SELECT DISTINCT ON (ss.study_plan_item_id)"));
    }

    #[tokio::test]
    async fn test_bulk_update_status_queues_each_grade() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();

        let grades = vec![
            SubmissionGrade {
                student_submission_grade_id: "grade-1".into(),
                student_submission_id: "sub-1".into(),
            },
            SubmissionGrade {
                student_submission_grade_id: "grade-2".into(),
                student_submission_id: "sub-2".into(),
            },
        ];
        StudentSubmissionRepo
            .bulk_update_status(&db, "editor-1", "SUBMISSION_STATUS_MARKED", &grades)
            .await
            .unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert_eq!(log.matches("UPDATE student_submissions").count(), 2);
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_delete_without_affected_rows_fails() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(0)])
            .into_connection();

        let err = StudentSubmissionRepo
            .delete_by_study_plan_item_ids(&db, &["item-1".to_string()], "editor-1")
            .await
            .unwrap_err();
        assert!(err.message().contains("no row affected"));
    }

    #[test]
    fn test_list_query_numbers_optional_conditions() {
        let builder = list_query(&StudentSubmissionFilter {
            limit: 20,
            statuses: Some(vec!["SUBMISSION_STATUS_MARKED".into()]),
            course_id: Some("course-1".into()),
            location_ids: vec!["loc-1".into()],
            class_ids: vec!["class-1".into()],
            student_name: Some("ann".into()),
            ..Default::default()
        });
        let sql = builder.sql();

        assert!(sql.contains("AND a.type <> $1"));
        assert!(sql.contains("AND sls.status = ANY($2)"));
        assert!(sql.contains("AND csap.course_id = $3 AND csap.location_id = ANY($4)"));
        assert!(sql.contains("AND cls.class_id = ANY($5)"));
        assert!(sql.contains("AND u.name ILIKE '%' || $6 || '%'"));
        assert!(sql.ends_with("LIMIT $7"));
        assert_eq!(builder.values().len(), 7);
    }

    #[test]
    fn test_list_query_date_window_needs_both_ends() {
        let only_start = list_query(&StudentSubmissionFilter {
            limit: 10,
            start_date: Some(chrono::Utc::now().fixed_offset()),
            ..Default::default()
        });
        assert!(!only_start.sql().contains("spi.start_date BETWEEN"));

        let builder = list_query(&StudentSubmissionFilter {
            limit: 10,
            location_ids: vec!["loc-1".into()],
            ..Default::default()
        });
        assert!(builder.sql().contains("AND csap.location_id = ANY($2))"));
        assert!(!builder.sql().contains("csap.course_id ="));
    }

    #[test]
    fn test_list_query_course_without_locations_filters_enrollment() {
        let builder = list_query(&StudentSubmissionFilter {
            limit: 10,
            course_id: Some("course-1".into()),
            ..Default::default()
        });
        let sql = builder.sql();

        assert!(sql.contains("AND cs.course_id = $2"));
        assert!(!sql.contains("course_students_access_paths"));
        assert!(!sql.contains("class_students"));
        assert!(sql.ends_with("LIMIT $3"));
        assert_eq!(builder.values()[1], Value::from("course-1"));
    }

    #[test]
    fn test_list_query_ignores_classes_without_course() {
        let builder = list_query(&StudentSubmissionFilter {
            limit: 10,
            class_ids: vec!["class-1".into(), "class-2".into()],
            ..Default::default()
        });
        let sql = builder.sql();

        assert!(!sql.contains("class_students"));
        assert!(!sql.contains("cs.course_id ="));
        assert!(sql.ends_with("LIMIT $2"));
        assert_eq!(builder.values().len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_by_study_plan_identities() {
        let submission = student_submission("sub-1", "item-1");
        let mut row = submission_row(&submission);
        row.insert("course_id", Value::from(Some("course-1".to_string())));
        row.insert("start_date", Value::from(None::<sea_orm::prelude::DateTimeWithTimeZone>));
        row.insert("end_date", Value::from(None::<sea_orm::prelude::DateTimeWithTimeZone>));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row]])
            .into_connection();

        let identities = vec![StudyPlanItemIdentity {
            study_plan_id: "sp-1".into(),
            learning_material_id: "as-1".into(),
            student_id: Some("student-1".into()),
        }];
        let found = StudentSubmissionRepo
            .retrieve_by_study_plan_identities(&db, &identities)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].submission, submission);
        assert_eq!(found[0].course_id.as_deref(), Some("course-1"));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("UNNEST($1::TEXT[], $2::TEXT[], $3::TEXT[])"));
        assert!(log.contains("CASE WHEN isp.updated_at > msp.updated_at THEN isp.start_date"));
    }

    #[tokio::test]
    async fn test_retrieve_by_study_plan_identities_requires_student() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let identities = vec![StudyPlanItemIdentity {
            study_plan_id: "sp-1".into(),
            learning_material_id: "as-1".into(),
            student_id: None,
        }];

        let err = StudentSubmissionRepo
            .retrieve_by_study_plan_identities(&db, &identities)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E004");
        assert!(db.into_transaction_log().is_empty());
    }
}
