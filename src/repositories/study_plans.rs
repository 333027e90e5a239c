//! 学习计划仓储

use chrono::Utc;
use sea_orm::{ConnectionTrait, FromQueryResult, ModelTrait, TransactionTrait, Value};
use tracing::debug;

use crate::database::{Batch, QueryBuilder, select_all, select_list, select_one, upsert_statement};
use crate::entity::study_plans::{self, Column, Entity as StudyPlans};
use crate::errors::{RepositoryError, Result};
use crate::models::StudyPlanStatus;
use crate::models::study_plans::{
    requests::{
        ListStudentStudyPlansArgs, RetrieveStudyPlanByCourseArgs, StudyPlanBook,
        StudyPlanItemInfoArgs,
    },
    responses::{
        CopiedStudyPlan, StudentStudyPlan, StudyPlanCombineStudentId, StudyPlanIdentity,
        StudyPlanItemInfo,
    },
};

const UPSERT_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT study_plans_pk DO UPDATE SET \
    name = EXCLUDED.name, \
    study_plan_type = EXCLUDED.study_plan_type, \
    updated_at = EXCLUDED.updated_at, \
    school_id = EXCLUDED.school_id, \
    deleted_at = NULL";

const BULK_COPY_SQL: &str = r#"INSERT INTO study_plans (
    study_plan_id, master_study_plan_id, name, study_plan_type, school_id, course_id, book_id,
    created_at, updated_at, deleted_at, track_school_progress, grades, status
)
SELECT
    gen_random_uuid()::TEXT AS study_plan_id, $1::TEXT AS master_study_plan_id, name,
    study_plan_type, school_id, course_id, book_id, created_at, updated_at, deleted_at,
    track_school_progress, grades, status
FROM study_plans sp
WHERE sp.study_plan_id = $1
RETURNING study_plan_id, master_study_plan_id"#;

const RECURSIVE_SOFT_DELETE_SQL: &str = r#"WITH RECURSIVE study_plan_recurs (study_plan_id, master_study_plan_id) AS (
    SELECT sp1.study_plan_id, sp1.master_study_plan_id
    FROM study_plans sp1
    WHERE sp1.study_plan_id = $1 AND sp1.master_study_plan_id IS NULL
    UNION ALL
    SELECT sp2.study_plan_id, sp2.master_study_plan_id
    FROM study_plans sp2
    JOIN study_plan_recurs spr ON spr.study_plan_id = sp2.master_study_plan_id
)
UPDATE study_plans SET deleted_at = NOW()
WHERE study_plan_id IN (SELECT spr.study_plan_id FROM study_plan_recurs AS spr)
RETURNING study_plan_id"#;

const RETRIEVE_IDENTITY_SQL: &str = r#"SELECT
    COALESCE(ssp.master_study_plan_id, ssp.study_plan_id) AS study_plan_id,
    ssp.student_id,
    COALESCE(NULLIF(spi.content_structure ->> 'lo_id', ''), spi.content_structure ->> 'assignment_id') AS learning_material_id,
    spi.study_plan_item_id
FROM study_plan_items spi
JOIN student_study_plans ssp ON ssp.study_plan_id = spi.study_plan_id AND ssp.deleted_at IS NULL
WHERE spi.study_plan_item_id = ANY($1) AND spi.deleted_at IS NULL"#;

#[derive(Debug, FromQueryResult)]
struct StudyPlanIdRow {
    study_plan_id: String,
}

/// 学习计划仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct StudyPlanRepo;

impl StudyPlanRepo {
    /// 插入学习计划，返回其 id
    ///
    /// 写入前刷新 `created_at`/`updated_at`，未指定 id 时生成时间有序的 UUID。
    pub async fn insert<C: ConnectionTrait>(
        &self,
        db: &C,
        mut plan: study_plans::Model,
    ) -> Result<String> {
        let now = Utc::now().fixed_offset();
        plan.created_at = now;
        plan.updated_at = now;
        if plan.study_plan_id.is_empty() {
            plan.study_plan_id = uuid::Uuid::now_v7().to_string();
        }

        let statement = upsert_statement(&plan, "RETURNING study_plan_id");
        let row = StudyPlanIdRow::find_by_statement(statement)
            .one(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("插入学习计划失败: {e}")))?
            .ok_or_else(|| RepositoryError::database_operation("插入学习计划未返回 id"))?;

        Ok(row.study_plan_id)
    }

    /// 将单个学习计划的 upsert 加入批处理
    pub fn queue_upsert(&self, batch: &mut Batch, plan: &study_plans::Model) {
        batch.queue_statement(upsert_statement(plan, UPSERT_CONFLICT));
    }

    /// 批量 upsert，冲突时更新名称、类型、学校并恢复软删除
    pub async fn bulk_upsert<C>(&self, db: &C, plans: &[study_plans::Model]) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut batch = Batch::new();
        for plan in plans {
            self.queue_upsert(&mut batch, plan);
        }
        batch
            .exec(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("批量写入学习计划失败: {e}")))?;
        Ok(())
    }

    /// 更新主计划及其全部副本的名称、进度跟踪、年级与状态
    pub async fn bulk_update_by_master<C: ConnectionTrait>(
        &self,
        db: &C,
        plan: &study_plans::Model,
    ) -> Result<u64> {
        crate::database::exec(
            db,
            "UPDATE study_plans \
             SET updated_at = NOW(), name = $2, track_school_progress = $3, grades = $4, status = $5 \
             WHERE (study_plan_id = $1 OR master_study_plan_id = $1) AND deleted_at IS NULL",
            [
                Value::from(plan.study_plan_id.clone()),
                Value::from(plan.name.clone()),
                Value::from(plan.track_school_progress),
                plan.get(Column::Grades),
                Value::from(plan.status.clone()),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("更新学习计划副本失败: {e}")))
    }

    /// 为每个计划复制一份副本，返回 (原计划 id, 新计划 id)
    ///
    /// 两个列表与输入按位置对应，找不到的计划对应位置为空字符串。
    pub async fn bulk_copy<C>(&self, db: &C, ids: &[String]) -> Result<(Vec<String>, Vec<String>)>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut batch = Batch::new();
        for id in ids {
            batch.queue(BULK_COPY_SQL, [Value::from(id.clone())]);
        }

        let results: Vec<Vec<CopiedStudyPlan>> = batch
            .query(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("复制学习计划失败: {e}")))?;

        let mut original_ids = vec![String::new(); ids.len()];
        let mut new_ids = vec![String::new(); ids.len()];
        for (i, rows) in results.into_iter().enumerate() {
            if let Some(row) = rows.into_iter().next() {
                new_ids[i] = row.study_plan_id;
                original_ids[i] = row.master_study_plan_id.unwrap_or_default();
            }
        }

        debug!("Copied {} study plans", new_ids.iter().filter(|id| !id.is_empty()).count());
        Ok((original_ids, new_ids))
    }

    pub async fn find_by_id<C: ConnectionTrait>(&self, db: &C, id: &str) -> Result<study_plans::Model> {
        select_one::<study_plans::Model, _, _, _>(
            db,
            format!(
                "SELECT {} FROM study_plans WHERE study_plan_id = $1",
                select_list::<StudyPlans>(None)
            ),
            [Value::from(id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学习计划失败: {e}")))?
        .ok_or_else(|| RepositoryError::not_found(format!("学习计划不存在: {id}")))
    }

    pub async fn find_by_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
    ) -> Result<Vec<study_plans::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM study_plans WHERE study_plan_id = ANY($1)",
                select_list::<StudyPlans>(None)
            ),
            [Value::from(ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学习计划失败: {e}")))
    }

    /// 主计划下未删除的副本 id
    pub async fn find_depend_study_plan<C: ConnectionTrait>(
        &self,
        db: &C,
        master_ids: &[String],
    ) -> Result<Vec<String>> {
        let rows: Vec<StudyPlanIdRow> = select_all(
            db,
            "SELECT study_plan_id FROM study_plans \
             WHERE master_study_plan_id = ANY($1) AND deleted_at IS NULL",
            [Value::from(master_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学习计划副本失败: {e}")))?;

        Ok(rows.into_iter().map(|row| row.study_plan_id).collect())
    }

    pub async fn soft_delete<C: ConnectionTrait>(&self, db: &C, ids: &[String]) -> Result<u64> {
        crate::database::exec(
            db,
            "UPDATE study_plans SET deleted_at = NOW() WHERE deleted_at IS NULL AND study_plan_id = ANY($1)",
            [Value::from(ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除学习计划失败: {e}")))
    }

    /// 课程下启用中的学习计划，按 (name, study_plan_id) 游标分页
    ///
    /// 游标的名称与 id 必须同时给出，只给其一返回校验错误。
    pub async fn retrieve_by_course_id<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &RetrieveStudyPlanByCourseArgs,
    ) -> Result<Vec<study_plans::Model>> {
        let (sql, values) = retrieve_by_course_id_query(args)?.into_parts();
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询课程学习计划失败: {e}")))
    }

    /// 学生条目副本对应的身份：主计划、学生与学习资料
    pub async fn retrieve_study_plan_identity<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_item_ids: &[String],
    ) -> Result<Vec<StudyPlanIdentity>> {
        select_all(db, RETRIEVE_IDENTITY_SQL, [Value::from(study_plan_item_ids.to_vec())])
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询条目身份失败: {e}")))
    }

    /// 软删除课程主计划及其所有层级的副本，返回被删除的计划 id
    pub async fn recursive_soft_delete_in_course<C: ConnectionTrait>(
        &self,
        db: &C,
        master_id: &str,
    ) -> Result<Vec<String>> {
        let rows: Vec<StudyPlanIdRow> =
            select_all(db, RECURSIVE_SOFT_DELETE_SQL, [Value::from(master_id)])
                .await
                .map_err(|e| {
                    RepositoryError::database_operation(format!("递归删除学习计划失败: {e}"))
                })?;

        Ok(rows.into_iter().map(|row| row.study_plan_id).collect())
    }

    /// 批量更新计划及其副本的教材，任一计划未命中即报错
    pub async fn bulk_update_book<C>(&self, db: &C, books: &[StudyPlanBook]) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut batch = Batch::new();
        for book in books {
            batch.queue(
                "UPDATE study_plans SET book_id = $2, updated_at = NOW() \
                 WHERE study_plan_id = $1 OR master_study_plan_id = $1",
                [
                    Value::from(book.study_plan_id.clone()),
                    Value::from(book.book_id.clone()),
                ],
            );
        }

        let affected = batch
            .exec(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("更新学习计划教材失败: {e}")))?;

        if affected.iter().any(|rows| *rows == 0) {
            return Err(RepositoryError::database_operation("course book not inserted"));
        }
        Ok(())
    }

    /// 教材下未删除的主计划
    pub async fn retrieve_master_by_book_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        book_ids: &[String],
    ) -> Result<Vec<study_plans::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM study_plans \
                 WHERE book_id = ANY($1) AND deleted_at IS NULL AND master_study_plan_id IS NULL",
                select_list::<StudyPlans>(None)
            ),
            [Value::from(book_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询教材主计划失败: {e}")))
    }

    pub async fn retrieve_by_book_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        book_ids: &[String],
    ) -> Result<Vec<study_plans::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM study_plans WHERE book_id = ANY($1) AND deleted_at IS NULL",
                select_list::<StudyPlans>(None)
            ),
            [Value::from(book_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询教材学习计划失败: {e}")))
    }

    /// 课程下指定类型的主计划
    pub async fn retrieve_master_by_course_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_type: &str,
        course_ids: &[String],
    ) -> Result<Vec<study_plans::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM study_plans \
                 WHERE deleted_at IS NULL AND course_id = ANY($1) \
                 AND master_study_plan_id IS NULL AND study_plan_type = $2",
                select_list::<StudyPlans>(None)
            ),
            [Value::from(course_ids.to_vec()), Value::from(study_plan_type)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询课程主计划失败: {e}")))
    }

    /// 教材下的计划及其分配到的学生
    pub async fn retrieve_combine_student<C: ConnectionTrait>(
        &self,
        db: &C,
        book_ids: &[String],
    ) -> Result<Vec<StudyPlanCombineStudentId>> {
        select_all(
            db,
            format!(
                "SELECT {}, ssp.student_id FROM study_plans AS sp \
                 LEFT JOIN student_study_plans ssp USING (study_plan_id) \
                 WHERE sp.book_id = ANY($1) AND ssp.deleted_at IS NULL AND sp.deleted_at IS NULL",
                select_list::<StudyPlans>(Some("sp"))
            ),
            [Value::from(book_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学习计划学生失败: {e}")))
    }

    /// 计划左连接匹配条件的未删除条目，主计划排在副本之后
    pub async fn retrieve_study_plan_item_info<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &StudyPlanItemInfoArgs,
    ) -> Result<Vec<StudyPlanItemInfo>> {
        let (sql, values) = study_plan_item_info_query(args).into_parts();
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询学习计划条目信息失败: {e}")))
    }

    /// 学生被分配的学习计划，按 study_plan_id 倒序游标分页
    pub async fn list_student_study_plans<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListStudentStudyPlansArgs,
    ) -> Result<Vec<StudentStudyPlan>> {
        let (sql, values) = list_student_study_plans_query(args).into_parts();
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询学生学习计划失败: {e}")))
    }
}

/// 名称与 id 组成翻页游标，只给出其中一个视为无效参数
fn retrieve_by_course_id_query(args: &RetrieveStudyPlanByCourseArgs) -> Result<QueryBuilder> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM study_plans AS sp JOIN course_study_plans AS csp USING (study_plan_id)",
        select_list::<StudyPlans>(Some("sp"))
    ));
    let course = builder.bind(args.course_id.clone());
    builder.push(&format!(" WHERE csp.course_id = {course}"));

    match (&args.study_plan_name, &args.study_plan_id) {
        (Some(name), Some(id)) => {
            let name = builder.bind(name.clone());
            let id = builder.bind(id.clone());
            builder.push(&format!(" AND ({name}, {id}) < (sp.name, sp.study_plan_id)"));
        }
        (None, None) => {}
        _ => {
            return Err(RepositoryError::validation(
                "study plan name and study plan id must be set together",
            ));
        }
    }

    let status = builder.bind(StudyPlanStatus::Active);
    builder.push(&format!(
        " AND csp.deleted_at IS NULL AND sp.deleted_at IS NULL AND sp.status = {status}"
    ));
    let limit = builder.bind(i64::from(args.limit));
    builder.push(&format!(
        " ORDER BY sp.name, sp.study_plan_id ASC, sp.created_at DESC LIMIT {limit}"
    ));
    Ok(builder)
}

fn study_plan_item_info_query(args: &StudyPlanItemInfoArgs) -> QueryBuilder {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {}, sp.study_plan_id AS sp_study_plan_id, sp.book_id AS sp_book_id, \
         sp.course_id AS sp_course_id, sp.master_study_plan_id AS sp_master_study_plan_id \
         FROM study_plans AS sp LEFT OUTER JOIN (SELECT * FROM study_plan_items WHERE deleted_at IS NULL",
        select_list::<crate::entity::study_plan_items::Entity>(Some("spi"))
    ));

    if let Some(lo_ids) = &args.lo_ids {
        let p = builder.bind(lo_ids.clone());
        builder.push(&format!(" AND content_structure ->> 'lo_id' = ANY({p})"));
    }
    if let Some(assignment_ids) = &args.assignment_ids {
        let p = builder.bind(assignment_ids.clone());
        builder.push(&format!(" AND content_structure ->> 'assignment_id' = ANY({p})"));
    }
    builder.push(") AS spi ON spi.study_plan_id = sp.study_plan_id WHERE sp.deleted_at IS NULL");

    if let Some(book_ids) = &args.book_ids {
        let p = builder.bind(book_ids.clone());
        builder.push(&format!(" AND sp.book_id = ANY({p})"));
    }
    builder.push(" ORDER BY sp.master_study_plan_id DESC");
    builder
}

fn list_student_study_plans_query(args: &ListStudentStudyPlansArgs) -> QueryBuilder {
    let mut builder = QueryBuilder::new(format!(
        "SELECT DISTINCT {}, ssp.student_id FROM study_plans AS i \
         JOIN student_study_plans AS ssp ON i.study_plan_id = ssp.study_plan_id",
        select_list::<StudyPlans>(Some("i"))
    ));
    let students = builder.bind(args.student_ids.clone());
    builder.push(&format!(
        " WHERE ssp.student_id = ANY({students}) AND ssp.deleted_at IS NULL AND i.deleted_at IS NULL"
    ));

    if let Some(course_id) = &args.course_id {
        let p = builder.bind(course_id.clone());
        builder.push(&format!(" AND i.course_id = {p}"));
    }
    if let Some(offset) = &args.offset {
        let p = builder.bind(offset.clone());
        builder.push(&format!(" AND i.study_plan_id < {p}"));
    }
    if let Some(search) = &args.search {
        let p = builder.bind(search.clone());
        builder.push(&format!(" AND i.name ILIKE ('%' || {p} || '%')"));
    }
    if let Some(status) = &args.status {
        let p = builder.bind(status.clone());
        builder.push(&format!(" AND i.status = {p}"));
    }
    if let Some(book_ids) = &args.book_ids {
        let p = builder.bind(book_ids.clone());
        builder.push(&format!(" AND i.book_id = ANY({p})"));
    }
    if let Some(grades) = &args.grades {
        let p = builder.bind(grades.clone());
        builder.push(&format!(
            " AND EXISTS (SELECT 1 FROM unnest(i.grades) AS g WHERE g = ANY({p}))"
        ));
    }

    let limit = builder.bind(i64::from(args.limit));
    builder.push(&format!(" ORDER BY i.study_plan_id DESC LIMIT {limit}"));
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::fixtures::{exec_ok, study_plan};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn copied(new_id: &str, master_id: &str) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("study_plan_id", Value::from(new_id.to_string())),
            ("master_study_plan_id", Value::from(master_id.to_string())),
        ])
    }

    #[tokio::test]
    async fn test_insert_returns_id_and_refreshes_timestamps() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([(
                "study_plan_id",
                Value::from("sp-1".to_string()),
            )])]])
            .into_connection();

        let id = StudyPlanRepo.insert(&db, study_plan("sp-1", None)).await.unwrap();
        assert_eq!(id, "sp-1");

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("INSERT INTO study_plans (study_plan_id, master_study_plan_id, name"));
        assert!(log.contains("RETURNING study_plan_id"));
    }

    #[tokio::test]
    async fn test_bulk_upsert_queues_one_statement_per_plan() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();

        StudyPlanRepo
            .bulk_upsert(&db, &[study_plan("sp-1", None), study_plan("sp-2", None)])
            .await
            .unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert_eq!(log.matches("ON CONFLICT ON CONSTRAINT study_plans_pk").count(), 2);
        assert!(log.contains("deleted_at = NULL"));
    }

    #[tokio::test]
    async fn test_bulk_copy_keeps_positions_for_missing_plans() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![copied("copy-1", "sp-1")], vec![]])
            .into_connection();

        let (originals, copies) = StudyPlanRepo
            .bulk_copy(&db, &["sp-1".to_string(), "missing".to_string()])
            .await
            .unwrap();

        assert_eq!(originals, vec!["sp-1".to_string(), String::new()]);
        assert_eq!(copies, vec!["copy-1".to_string(), String::new()]);
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<study_plans::Model>::new()])
            .into_connection();

        let err = StudyPlanRepo.find_by_id(&db, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_by_id_returns_plan() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![study_plan("sp-1", None)]])
            .into_connection();

        let plan = StudyPlanRepo.find_by_id(&db, "sp-1").await.unwrap();
        assert_eq!(plan.study_plan_id, "sp-1");
        assert!(plan.is_master());
    }

    #[tokio::test]
    async fn test_bulk_update_book_fails_when_nothing_updated() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(2), exec_ok(0)])
            .into_connection();

        let books = vec![
            StudyPlanBook {
                study_plan_id: "sp-1".into(),
                book_id: "book-1".into(),
            },
            StudyPlanBook {
                study_plan_id: "sp-2".into(),
                book_id: "book-2".into(),
            },
        ];

        let err = StudyPlanRepo.bulk_update_book(&db, &books).await.unwrap_err();
        assert_eq!(err.message(), "course book not inserted");
    }

    #[tokio::test]
    async fn test_recursive_soft_delete_returns_ids() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                BTreeMap::from([("study_plan_id", Value::from("master".to_string()))]),
                BTreeMap::from([("study_plan_id", Value::from("copy".to_string()))]),
            ]])
            .into_connection();

        let ids = StudyPlanRepo
            .recursive_soft_delete_in_course(&db, "master")
            .await
            .unwrap();
        assert_eq!(ids, vec!["master".to_string(), "copy".to_string()]);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("WITH RECURSIVE study_plan_recurs"));
    }

    #[test]
    fn test_retrieve_by_course_id_without_cursor() {
        let args = RetrieveStudyPlanByCourseArgs {
            course_id: "course-1".into(),
            limit: 10,
            study_plan_name: None,
            study_plan_id: None,
        };
        let builder = retrieve_by_course_id_query(&args).unwrap();

        assert!(!builder.sql().contains("< (sp.name, sp.study_plan_id)"));
        assert!(builder.sql().ends_with("LIMIT $3"));
        assert_eq!(builder.values().len(), 3);
    }

    #[test]
    fn test_retrieve_by_course_id_with_cursor() {
        let args = RetrieveStudyPlanByCourseArgs {
            course_id: "course-1".into(),
            limit: 10,
            study_plan_name: Some("Math".into()),
            study_plan_id: Some("sp-9".into()),
        };
        let builder = retrieve_by_course_id_query(&args).unwrap();

        assert!(builder.sql().contains("AND ($2, $3) < (sp.name, sp.study_plan_id)"));
        assert!(builder.sql().contains("sp.status = $4"));
        assert!(builder.sql().ends_with("LIMIT $5"));
    }

    #[test]
    fn test_list_student_study_plans_only_binds_present_filters() {
        let args = ListStudentStudyPlansArgs {
            student_ids: vec!["student-1".into()],
            limit: 5,
            search: Some("alg".into()),
            grades: Some(vec![5, 6]),
            ..Default::default()
        };
        let builder = list_student_study_plans_query(&args);
        let sql = builder.sql();

        assert!(sql.contains("i.name ILIKE ('%' || $2 || '%')"));
        assert!(sql.contains("unnest(i.grades) AS g WHERE g = ANY($3)"));
        assert!(!sql.contains("i.course_id ="));
        assert!(sql.ends_with("ORDER BY i.study_plan_id DESC LIMIT $4"));
        assert_eq!(builder.values().len(), 4);
    }

    #[test]
    fn test_study_plan_item_info_aliases_plan_columns() {
        let args = StudyPlanItemInfoArgs {
            book_ids: Some(vec!["book-1".into()]),
            ..Default::default()
        };
        let builder = study_plan_item_info_query(&args);

        assert!(builder.sql().contains("sp.study_plan_id AS sp_study_plan_id"));
        assert!(builder.sql().contains("AND sp.book_id = ANY($1)"));
        assert!(builder.sql().ends_with("ORDER BY sp.master_study_plan_id DESC"));
    }

    #[test]
    fn test_retrieve_by_course_id_rejects_half_cursor() {
        let args = RetrieveStudyPlanByCourseArgs {
            course_id: "course-1".into(),
            limit: 10,
            study_plan_name: Some("Math".into()),
            study_plan_id: None,
        };
        let err = retrieve_by_course_id_query(&args).unwrap_err();
        assert_eq!(err.code(), "E004");

        let args = RetrieveStudyPlanByCourseArgs {
            study_plan_name: None,
            study_plan_id: Some("sp-9".into()),
            ..args
        };
        assert!(retrieve_by_course_id_query(&args).is_err());
    }

    #[tokio::test]
    async fn test_retrieve_by_course_id_half_cursor_never_queries() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let args = RetrieveStudyPlanByCourseArgs {
            course_id: "course-1".into(),
            limit: 10,
            study_plan_name: None,
            study_plan_id: Some("sp-9".into()),
        };

        let err = StudyPlanRepo.retrieve_by_course_id(&db, &args).await.unwrap_err();
        assert_eq!(err.code(), "E004");
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_study_plan_identity_resolves_master() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([
                ("study_plan_id", Value::from("master-1".to_string())),
                ("student_id", Value::from("student-1".to_string())),
                ("learning_material_id", Value::from("lo-1".to_string())),
                ("study_plan_item_id", Value::from("item-1".to_string())),
            ])]])
            .into_connection();

        let identities = StudyPlanRepo
            .retrieve_study_plan_identity(&db, &["item-1".to_string()])
            .await
            .unwrap();
        assert_eq!(
            identities,
            vec![StudyPlanIdentity {
                study_plan_id: "master-1".into(),
                student_id: "student-1".into(),
                learning_material_id: "lo-1".into(),
                study_plan_item_id: "item-1".into(),
            }]
        );

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("COALESCE(ssp.master_study_plan_id, ssp.study_plan_id) AS study_plan_id"));
        assert!(log.contains("WHERE spi.study_plan_item_id = ANY($1) AND spi.deleted_at IS NULL"));
    }
}
