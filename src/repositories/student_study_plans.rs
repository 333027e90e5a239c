//! 学生学习计划仓储
//!
//! 学生名下的条目列表都从 `student_study_plans` 出发，
//! 经学生自己的计划副本连接到条目，并按调用方提供的 `now` 判断开放时间窗。

use sea_orm::{ConnectionTrait, FromQueryResult, TransactionTrait, Value};
use tracing::debug;

use crate::database::{
    Batch, QueryBuilder, bulk_upsert, composite_keys_placeholders, exec, select_all, select_list,
    select_one, upsert_statement,
};
use crate::entity::student_study_plans::{self, Entity as StudentStudyPlans};
use crate::entity::study_plan_items::{self, Entity as StudyPlanItems};
use crate::entity::study_plans::{self, Entity as StudyPlans};
use crate::errors::{RepositoryError, Result};
use crate::models::student_study_plans::requests::{
    ListStudentAvailableContentsArgs, ListStudyPlanItemsArgs, ListStudyPlansArgs,
};
use crate::models::{StudyPlanItemStatus, StudyPlanStatus};

const UPSERT_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT student_study_plans_pk DO UPDATE SET \
    updated_at = EXCLUDED.updated_at, \
    deleted_at = NULL";

const BY_STUDY_PLAN_STUDENT_AND_LO_SQL: &str = "AND EXISTS (SELECT 1 FROM study_plan_items i \
    WHERE i.study_plan_id = ssp.study_plan_id AND i.deleted_at IS NULL \
    AND i.available_from IS NOT NULL AND i.available_to IS NOT NULL \
    AND COALESCE(NULLIF(i.content_structure ->> 'lo_id', ''), i.content_structure ->> 'assignment_id') = ANY($1))";

#[derive(Debug, FromQueryResult)]
struct StudyPlanIdRow {
    study_plan_id: String,
}

#[derive(Debug, FromQueryResult)]
struct BookIdRow {
    book_id: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

/// 学生学习计划仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct StudentStudyPlanRepo;

impl StudentStudyPlanRepo {
    /// 批量 upsert，冲突时刷新 `updated_at` 并恢复软删除
    pub async fn bulk_upsert<C>(
        &self,
        db: &C,
        items: &[student_study_plans::Model],
    ) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, UPSERT_CONFLICT, items).await.map_err(|e| {
            RepositoryError::database_operation(format!("批量写入学生学习计划失败: {e}"))
        })
    }

    /// 将单个学生学习计划的 upsert 加入批处理
    pub fn queue_upsert(&self, batch: &mut Batch, item: &student_study_plans::Model) {
        batch.queue_statement(upsert_statement(item, UPSERT_CONFLICT));
    }

    /// 学生在主计划下、含有给定学习资料且已设定开放时间的计划副本
    pub async fn get_by_study_plan_student_and_lo<C: ConnectionTrait>(
        &self,
        db: &C,
        master_study_plan_ids: &[String],
        student_ids: &[String],
        lo_ids: &[String],
    ) -> Result<Vec<student_study_plans::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM student_study_plans ssp \
                 WHERE ssp.master_study_plan_id = ANY($2) AND ssp.student_id = ANY($3) \
                 AND ssp.deleted_at IS NULL {BY_STUDY_PLAN_STUDENT_AND_LO_SQL}",
                select_list::<StudentStudyPlans>(Some("ssp"))
            ),
            [
                Value::from(lo_ids.to_vec()),
                Value::from(master_study_plan_ids.to_vec()),
                Value::from(student_ids.to_vec()),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("按学习资料查询学生学习计划失败: {e}")))
    }

    /// 学生可学习的条目，按教材排序
    pub async fn list_student_available_contents<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListStudentAvailableContentsArgs,
    ) -> Result<Vec<study_plan_items::Model>> {
        let (sql, values) = available_contents_query(args).into_parts();
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询学生可学习内容失败: {e}")))
    }

    /// 学生计划条目涉及的教材 id，可限定在给定教材内
    pub async fn get_book_ids_belongs_to_student_study_plan<C: ConnectionTrait>(
        &self,
        db: &C,
        student_id: &str,
        book_ids: Option<&[String]>,
    ) -> Result<Vec<String>> {
        let mut builder = QueryBuilder::new(
            "SELECT DISTINCT i.content_structure ->> 'book_id' AS book_id \
             FROM study_plan_items AS i \
             JOIN student_study_plans AS s ON i.study_plan_id = s.study_plan_id \
             JOIN study_plans AS sp ON sp.study_plan_id = s.study_plan_id",
        );
        let student = builder.bind(student_id);
        builder.push(&format!(
            " WHERE s.student_id = {student} \
             AND s.deleted_at IS NULL AND i.deleted_at IS NULL AND sp.deleted_at IS NULL"
        ));
        if let Some(book_ids) = book_ids {
            let p = builder.bind(book_ids.to_vec());
            builder.push(&format!(" AND i.content_structure ->> 'book_id' = ANY({p})"));
        }

        let (sql, values) = builder.into_parts();
        let rows: Vec<BookIdRow> = select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询学生计划教材失败: {e}")))?;

        Ok(rows.into_iter().filter_map(|row| row.book_id).collect())
    }

    /// 学生名下的学习计划，按 id 倒序分页
    pub async fn list_study_plans<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListStudyPlansArgs,
    ) -> Result<Vec<study_plans::Model>> {
        let (sql, values) = list_study_plans_query(args).into_parts();
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询学生学习计划失败: {e}")))
    }

    /// 当前开放的条目，按 `(display_order, study_plan_item_id)` 分页
    pub async fn list_study_plan_items<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListStudyPlanItemsArgs,
    ) -> Result<Vec<study_plan_items::Model>> {
        self.list_items(db, list_study_plan_items_query(args), "查询学生条目失败")
            .await
    }

    /// 已开始且未过期的条目
    pub async fn list_active_study_plan_items<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListStudyPlanItemsArgs,
    ) -> Result<Vec<study_plan_items::Model>> {
        self.list_items(db, active_items_query(args), "查询进行中条目失败")
            .await
    }

    /// 尚未过期的条目，没有开始时间的排在最后
    pub async fn list_upcoming_study_plan_items<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListStudyPlanItemsArgs,
    ) -> Result<Vec<study_plan_items::Model>> {
        self.list_items(db, upcoming_items_query(args), "查询即将开始条目失败")
            .await
    }

    /// 已完成的条目，开始时间倒序
    pub async fn list_completed_study_plan_items<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListStudyPlanItemsArgs,
    ) -> Result<Vec<study_plan_items::Model>> {
        self.list_items(db, completed_items_query(args), "查询已完成条目失败")
            .await
    }

    /// 已过截止时间仍未完成的条目
    pub async fn list_overdue_study_plan_items<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListStudyPlanItemsArgs,
    ) -> Result<Vec<study_plan_items::Model>> {
        self.list_items(db, overdue_items_query(args), "查询逾期条目失败")
            .await
    }

    async fn list_items<C: ConnectionTrait>(
        &self,
        db: &C,
        builder: QueryBuilder,
        context: &str,
    ) -> Result<Vec<study_plan_items::Model>> {
        let (sql, values) = builder.into_parts();
        debug!("Listing student study plan items with {} params", values.len());
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("{context}: {e}")))
    }

    /// 条目是否全部分配给了该学生
    pub async fn is_student_assigned_item<C: ConnectionTrait>(
        &self,
        db: &C,
        student_id: &str,
        item_ids: &[String],
    ) -> Result<bool> {
        let row: Option<CountRow> = select_one(
            db,
            "SELECT COUNT(*) AS count FROM student_study_plans ssp \
             JOIN study_plan_items ssi ON ssp.study_plan_id = ssi.study_plan_id \
             AND ssi.study_plan_item_id = ANY($1) \
             WHERE ssp.student_id = $2",
            [Value::from(item_ids.to_vec()), Value::from(student_id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("检查学生条目分配失败: {e}")))?;

        let count = row.map(|row| row.count).unwrap_or_default();
        Ok(usize::try_from(count).is_ok_and(|count| count == item_ids.len()))
    }

    /// 学生计划中已开始或处于开放时间窗的条目数
    pub async fn count_assigned_study_plan_items<C: ConnectionTrait>(
        &self,
        db: &C,
        student_id: &str,
        study_plan_id: &str,
        now: sea_orm::prelude::DateTimeWithTimeZone,
    ) -> Result<i64> {
        self.count(
            db,
            "SELECT COUNT(*) AS count FROM student_study_plans ssp \
             JOIN study_plan_items spi ON spi.study_plan_id = ssp.study_plan_id \
             WHERE ssp.student_id = $1 AND ssp.study_plan_id = $2 \
             AND ((spi.start_date <= $3) OR ($3 BETWEEN spi.available_from AND spi.available_to)) \
             AND spi.deleted_at IS NULL AND ssp.deleted_at IS NULL",
            vec![
                Value::from(student_id),
                Value::from(study_plan_id),
                Value::from(now),
            ],
        )
        .await
    }

    /// 学生计划中处于开放时间窗的条目数，`only_completed` 时只计已完成的
    pub async fn count_student_study_plan_items<C: ConnectionTrait>(
        &self,
        db: &C,
        student_id: &str,
        study_plan_id: &str,
        now: sea_orm::prelude::DateTimeWithTimeZone,
        only_completed: bool,
    ) -> Result<i64> {
        self.count(
            db,
            "SELECT COUNT(*) AS count FROM student_study_plans ssp \
             JOIN study_plan_items spi ON spi.study_plan_id = ssp.study_plan_id \
             WHERE ssp.student_id = $1 AND ssp.study_plan_id = $2 \
             AND ((spi.available_from <= $3 AND spi.available_to IS NULL) \
             OR ($3 BETWEEN spi.available_from AND spi.available_to)) \
             AND ($4 = FALSE OR spi.completed_at IS NOT NULL) \
             AND spi.deleted_at IS NULL AND ssp.deleted_at IS NULL",
            vec![
                Value::from(student_id),
                Value::from(study_plan_id),
                Value::from(now),
                Value::from(only_completed),
            ],
        )
        .await
    }

    async fn count<C: ConnectionTrait>(&self, db: &C, sql: &str, values: Vec<Value>) -> Result<i64> {
        let row: Option<CountRow> = select_one(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("统计学生条目失败: {e}")))?;
        Ok(row.map(|row| row.count).unwrap_or_default())
    }

    /// 按 `(student_ids[i], course_ids[i])` 查找学生计划 id
    pub async fn find_student_study_plan_with_course_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        student_ids: &[String],
        course_ids: &[String],
    ) -> Result<Vec<String>> {
        if student_ids.len() != course_ids.len() {
            return Err(RepositoryError::validation(
                "student ids and course ids must have the same length",
            ));
        }
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Value> = student_ids
            .iter()
            .zip(course_ids)
            .flat_map(|(student, course)| [Value::from(student.clone()), Value::from(course.clone())])
            .collect();
        let sql = format!(
            "SELECT ssp.study_plan_id FROM student_study_plans ssp \
             JOIN study_plans sp ON ssp.study_plan_id = sp.study_plan_id \
             WHERE (ssp.student_id, sp.course_id) IN ({})",
            composite_keys_placeholders(student_ids.len(), 2)
        );

        let rows: Vec<StudyPlanIdRow> = select_all(db, sql, values).await.map_err(|e| {
            RepositoryError::database_operation(format!("按学生与课程查询学习计划失败: {e}"))
        })?;
        Ok(rows.into_iter().map(|row| row.study_plan_id).collect())
    }

    pub async fn soft_delete_by_student_id<C: ConnectionTrait>(
        &self,
        db: &C,
        student_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE student_study_plans SET deleted_at = NOW() \
             WHERE deleted_at IS NULL AND student_id = ANY($1)",
            [Value::from(student_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除学生学习计划失败: {e}")))
    }

    pub async fn find_by_student_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        student_ids: &[String],
    ) -> Result<Vec<String>> {
        let rows: Vec<StudyPlanIdRow> = select_all(
            db,
            "SELECT study_plan_id FROM student_study_plans WHERE student_id = ANY($1)",
            [Value::from(student_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学生学习计划失败: {e}")))?;
        Ok(rows.into_iter().map(|row| row.study_plan_id).collect())
    }

    /// 软删除给定计划的学生关联（已删除的不重复处理）
    pub async fn soft_delete<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE student_study_plans SET deleted_at = NOW() \
             WHERE deleted_at IS NULL AND study_plan_id = ANY($1)",
            [Value::from(study_plan_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除学生学习计划失败: {e}")))
    }

    /// 学生在给定主计划下的全部副本
    pub async fn find_all_student_study_plan<C: ConnectionTrait>(
        &self,
        db: &C,
        master_study_plan_ids: &[String],
        student_id: &str,
    ) -> Result<Vec<study_plans::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM study_plans sp \
                 JOIN student_study_plans ssp ON sp.study_plan_id = ssp.study_plan_id \
                 WHERE sp.master_study_plan_id = ANY($1) AND ssp.student_id = $2",
                select_list::<StudyPlans>(Some("sp"))
            ),
            [Value::from(master_study_plan_ids.to_vec()), Value::from(student_id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学生计划副本失败: {e}")))
    }

    /// 软删除给定计划的全部学生关联，包括已删除的行
    pub async fn delete_student_study_plans<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE student_study_plans AS ssp SET deleted_at = NOW() \
             WHERE ssp.study_plan_id = ANY($1)",
            [Value::from(study_plan_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除学生学习计划失败: {e}")))
    }

    /// 学生在给定课程下的有效计划关联
    pub async fn retrieve_by_student_course<C: ConnectionTrait>(
        &self,
        db: &C,
        student_ids: &[String],
        course_ids: &[String],
    ) -> Result<Vec<student_study_plans::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM student_study_plans ssp JOIN study_plans sp USING (study_plan_id) \
                 WHERE ssp.deleted_at IS NULL AND sp.deleted_at IS NULL \
                 AND ssp.student_id = ANY($1) AND sp.course_id = ANY($2)",
                select_list::<StudentStudyPlans>(Some("ssp"))
            ),
            [Value::from(student_ids.to_vec()), Value::from(course_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("按学生与课程查询失败: {e}")))
    }
}

fn available_contents_query(args: &ListStudentAvailableContentsArgs) -> QueryBuilder {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM study_plan_items AS i \
         JOIN student_study_plans s ON i.study_plan_id = s.study_plan_id \
         JOIN study_plans sp ON sp.study_plan_id = s.study_plan_id",
        select_list::<StudyPlanItems>(Some("i"))
    ));
    let student = builder.bind(args.student_id.clone());
    builder.push(&format!(" WHERE s.student_id = {student}"));

    if let Some(ids) = &args.study_plan_ids {
        let p = builder.bind(ids.clone());
        builder.push(&format!(" AND s.study_plan_id = ANY({p})"));
    }
    if let Some(offset) = args.offset {
        let p = builder.bind(offset);
        builder.push(&format!(" AND {p} BETWEEN i.available_from AND i.available_to"));
    }
    for (key, value) in [
        ("book_id", &args.book_id),
        ("chapter_id", &args.chapter_id),
        ("topic_id", &args.topic_id),
    ] {
        if let Some(value) = value {
            let p = builder.bind(value.clone());
            builder.push(&format!(" AND i.content_structure ->> '{key}' = {p}"));
        }
    }
    if let Some(course_id) = &args.course_id {
        let p = builder.bind(course_id.clone());
        builder.push(&format!(" AND sp.course_id = {p}"));
    }

    push_active_statuses(&mut builder);
    builder.push(
        " AND s.deleted_at IS NULL AND i.deleted_at IS NULL AND sp.deleted_at IS NULL \
         ORDER BY i.content_structure ->> 'book_id'",
    );
    builder
}

fn list_study_plans_query(args: &ListStudyPlansArgs) -> QueryBuilder {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM study_plans AS i \
         JOIN student_study_plans s ON i.study_plan_id = s.study_plan_id",
        select_list::<StudyPlans>(Some("i"))
    ));
    let student = builder.bind(args.student_id.clone());
    builder.push(&format!(" WHERE s.student_id = {student}"));

    if let Some(course_id) = &args.course_id {
        let p = builder.bind(course_id.clone());
        builder.push(&format!(" AND i.course_id = {p}"));
    }
    if let Some(school_id) = args.school_id {
        let p = builder.bind(school_id);
        builder.push(&format!(" AND i.school_id = {p}"));
    }
    if let Some(offset) = &args.offset {
        let p = builder.bind(offset.clone());
        builder.push(&format!(" AND i.study_plan_id < {p}"));
    }

    let limit = builder.bind(i64::from(args.limit));
    builder.push(&format!(
        " AND i.deleted_at IS NULL AND s.deleted_at IS NULL \
         ORDER BY i.study_plan_id DESC LIMIT {limit}"
    ));
    builder
}

/// 学生条目列表的公共部分，返回构造器与 `now` 的占位符
///
/// 条目需处于开放时间窗：`now` 落在 `[available_from, available_to]` 内，
/// 或已开放且没有结束时间。
fn student_items_head(args: &ListStudyPlanItemsArgs) -> (QueryBuilder, String) {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM study_plan_items AS i \
         JOIN student_study_plans s ON i.study_plan_id = s.study_plan_id \
         JOIN study_plans sp ON sp.study_plan_id = s.study_plan_id",
        select_list::<StudyPlanItems>(Some("i"))
    ));
    let student = builder.bind(args.student_id.clone());
    let now = builder.bind(args.now);
    builder.push(&format!(
        " WHERE s.student_id = {student} \
         AND s.deleted_at IS NULL AND i.deleted_at IS NULL AND sp.deleted_at IS NULL \
         AND (({now} BETWEEN i.available_from AND i.available_to) \
         OR (i.available_from <= {now} AND i.available_to IS NULL))"
    ));
    (builder, now)
}

fn push_courses(builder: &mut QueryBuilder, args: &ListStudyPlanItemsArgs) {
    if let Some(course_ids) = &args.course_ids {
        let p = builder.bind(course_ids.clone());
        builder.push(&format!(" AND sp.course_id = ANY({p})"));
    }
}

fn push_study_plan(builder: &mut QueryBuilder, args: &ListStudyPlanItemsArgs) {
    if let Some(study_plan_id) = &args.study_plan_id {
        let p = builder.bind(study_plan_id.clone());
        builder.push(&format!(" AND sp.study_plan_id = {p}"));
    }
}

fn push_active_statuses(builder: &mut QueryBuilder) {
    let plan = builder.bind(StudyPlanStatus::Active);
    let item = builder.bind(StudyPlanItemStatus::Active);
    builder.push(&format!(" AND sp.status = {plan} AND i.status = {item}"));
}

fn push_limit(builder: &mut QueryBuilder, order_by: &str, limit: u32) {
    let limit = builder.bind(i64::from(limit));
    builder.push(&format!(" ORDER BY {order_by} LIMIT {limit}"));
}

fn list_study_plan_items_query(args: &ListStudyPlanItemsArgs) -> QueryBuilder {
    let (mut builder, _) = student_items_head(args);

    if let (Some(display_order), Some(item_id)) = (args.display_order, &args.study_plan_item_id) {
        let order = builder.bind(display_order);
        let id = builder.bind(item_id.clone());
        builder.push(&format!(
            " AND (i.display_order, i.study_plan_item_id) > ({order}, {id})"
        ));
    }
    push_study_plan(&mut builder, args);
    push_courses(&mut builder, args);
    push_limit(
        &mut builder,
        "i.display_order ASC, i.study_plan_item_id ASC",
        args.limit,
    );
    builder
}

fn active_items_query(args: &ListStudyPlanItemsArgs) -> QueryBuilder {
    let (mut builder, now) = student_items_head(args);
    builder.push(&format!(
        " AND i.start_date < {now} AND (i.end_date IS NULL OR i.end_date >= {now})"
    ));

    if let (Some(offset), Some(display_order), Some(item_id)) =
        (args.offset, args.display_order, &args.study_plan_item_id)
    {
        let offset = builder.bind(offset);
        let order = builder.bind(display_order);
        let id = builder.bind(item_id.clone());
        builder.push(&format!(
            " AND (i.start_date, i.display_order, i.study_plan_item_id) > ({offset}, {order}, {id})"
        ));
    }
    push_courses(&mut builder, args);
    push_study_plan(&mut builder, args);
    if !args.include_completed {
        builder.push(" AND i.completed_at IS NULL");
    }
    push_active_statuses(&mut builder);
    push_limit(
        &mut builder,
        "i.start_date ASC, i.display_order ASC, i.study_plan_item_id ASC",
        args.limit,
    );
    builder
}

fn upcoming_items_query(args: &ListStudyPlanItemsArgs) -> QueryBuilder {
    let (mut builder, now) = student_items_head(args);

    // 没有开始时间的条目视为百年之后开始
    let offset = builder.bind(args.offset);
    let id = builder.bind(args.study_plan_item_id.clone().unwrap_or_default());
    builder.push(&format!(
        " AND (COALESCE(i.start_date, {now} + INTERVAL '100 year'), i.study_plan_item_id) \
         > (COALESCE({offset}::timestamptz, {now} + INTERVAL '100 year'), {id}) \
         AND (i.end_date IS NULL OR i.end_date >= {now})"
    ));
    push_courses(&mut builder, args);
    push_study_plan(&mut builder, args);
    if !args.include_completed {
        builder.push(" AND i.completed_at IS NULL");
    }
    push_active_statuses(&mut builder);
    push_limit(
        &mut builder,
        "i.start_date ASC, i.study_plan_item_id ASC",
        args.limit,
    );
    builder
}

fn completed_items_query(args: &ListStudyPlanItemsArgs) -> QueryBuilder {
    let (mut builder, _) = student_items_head(args);

    if let (Some(display_order), Some(item_id)) = (args.display_order, &args.study_plan_item_id) {
        let order = builder.bind(display_order);
        let id = builder.bind(item_id.clone());
        match args.offset {
            Some(offset) => {
                let offset = builder.bind(offset);
                builder.push(&format!(
                    " AND ((i.start_date < {offset}) \
                     OR (i.start_date = {offset} AND i.display_order > {order}) \
                     OR (i.start_date = {offset} AND i.display_order = {order} AND i.study_plan_item_id < {id}))"
                ));
            }
            None => {
                builder.push(&format!(
                    " AND i.start_date IS NULL \
                     AND (i.display_order > {order} OR i.study_plan_item_id < {id})"
                ));
            }
        }
    }
    push_courses(&mut builder, args);
    push_active_statuses(&mut builder);
    builder.push(" AND i.completed_at IS NOT NULL");
    push_limit(
        &mut builder,
        "i.start_date DESC, i.display_order ASC, i.study_plan_item_id DESC",
        args.limit,
    );
    builder
}

fn overdue_items_query(args: &ListStudyPlanItemsArgs) -> QueryBuilder {
    let (mut builder, now) = student_items_head(args);
    builder.push(&format!(" AND i.end_date < {now}"));

    if let (Some(offset), Some(item_id)) = (args.offset, &args.study_plan_item_id) {
        let offset = builder.bind(offset);
        let id = builder.bind(item_id.clone());
        builder.push(&format!(
            " AND (i.start_date, i.study_plan_item_id) < ({offset}, {id})"
        ));
    }
    push_courses(&mut builder, args);
    push_active_statuses(&mut builder);
    builder.push(" AND i.completed_at IS NULL");
    push_limit(
        &mut builder,
        "i.start_date DESC, i.study_plan_item_id DESC",
        args.limit,
    );
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::fixtures::{exec_ok, study_plan_item};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn count_row(count: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("count", Value::from(count))])
    }

    fn args() -> ListStudyPlanItemsArgs {
        ListStudyPlanItemsArgs::new("student-1", Utc::now().fixed_offset(), 10)
    }

    #[tokio::test]
    async fn test_bulk_upsert_revives_soft_deleted_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(1)])
            .into_connection();
        let now = Utc::now().fixed_offset();

        StudentStudyPlanRepo
            .bulk_upsert(
                &db,
                &[student_study_plans::Model {
                    student_id: "student-1".into(),
                    study_plan_id: "sp-1".into(),
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                    master_study_plan_id: Some("master-1".into()),
                }],
            )
            .await
            .unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("ON CONFLICT ON CONSTRAINT student_study_plans_pk"));
        assert!(log.contains("deleted_at = NULL"));
    }

    #[tokio::test]
    async fn test_queue_upsert_runs_in_batch_order() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();
        let now = Utc::now().fixed_offset();

        let mut batch = Batch::new();
        for plan_id in ["sp-1", "sp-2"] {
            StudentStudyPlanRepo.queue_upsert(
                &mut batch,
                &student_study_plans::Model {
                    student_id: "student-1".into(),
                    study_plan_id: plan_id.into(),
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                    master_study_plan_id: Some("master-1".into()),
                },
            );
        }
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.exec(&db).await.unwrap(), vec![1, 1]);

        let log = format!("{:?}", db.into_transaction_log());
        let first = log.find("\"sp-1\"").unwrap();
        let second = log.find("\"sp-2\"").unwrap();
        assert!(first < second);
        assert!(log.contains("ON CONFLICT ON CONSTRAINT student_study_plans_pk"));
    }

    #[tokio::test]
    async fn test_get_by_study_plan_student_and_lo() {
        let now = Utc::now().fixed_offset();
        let copy = student_study_plans::Model {
            student_id: "student-1".into(),
            study_plan_id: "sp-copy".into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            master_study_plan_id: Some("master-1".into()),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![copy.clone()]])
            .into_connection();

        let found = StudentStudyPlanRepo
            .get_by_study_plan_student_and_lo(
                &db,
                &["master-1".to_string()],
                &["student-1".to_string()],
                &["lo-1".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(found, vec![copy]);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("ssp.master_study_plan_id = ANY($2) AND ssp.student_id = ANY($3)"));
        assert!(log.contains("i.available_from IS NOT NULL AND i.available_to IS NOT NULL"));
        assert!(log.contains("i.content_structure ->> 'assignment_id') = ANY($1)"));
    }

    #[tokio::test]
    async fn test_is_student_assigned_item_compares_count() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(2)], vec![count_row(1)]])
            .into_connection();
        let ids = vec!["item-1".to_string(), "item-2".to_string()];

        assert!(
            StudentStudyPlanRepo
                .is_student_assigned_item(&db, "student-1", &ids)
                .await
                .unwrap()
        );
        assert!(
            !StudentStudyPlanRepo
                .is_student_assigned_item(&db, "student-1", &ids)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_find_with_course_ids_uses_composite_keys() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([(
                "study_plan_id",
                Value::from("sp-1".to_string()),
            )])]])
            .into_connection();

        let ids = StudentStudyPlanRepo
            .find_student_study_plan_with_course_ids(
                &db,
                &["s1".to_string(), "s2".to_string()],
                &["c1".to_string(), "c2".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(ids, vec!["sp-1".to_string()]);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("(ssp.student_id, sp.course_id) IN (($1, $2), ($3, $4))"));
    }

    #[tokio::test]
    async fn test_find_with_course_ids_rejects_mismatch() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = StudentStudyPlanRepo
            .find_student_study_plan_with_course_ids(&db, &["s1".to_string()], &[])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E004");
    }

    #[tokio::test]
    async fn test_count_student_study_plan_items_binds_flag() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(4)]])
            .into_connection();

        let count = StudentStudyPlanRepo
            .count_student_study_plan_items(&db, "student-1", "sp-1", Utc::now().fixed_offset(), true)
            .await
            .unwrap();
        assert_eq!(count, 4);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("($4 = FALSE OR spi.completed_at IS NOT NULL)"));
    }

    #[tokio::test]
    async fn test_list_active_items_returns_models() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![study_plan_item("item-1", "sp-1")]])
            .into_connection();

        let items = StudentStudyPlanRepo
            .list_active_study_plan_items(&db, &args())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].study_plan_item_id, "item-1");
    }

    #[test]
    fn test_active_query_keyset_needs_full_cursor() {
        let mut partial = args();
        partial.display_order = Some(2);
        let sql = active_items_query(&partial).sql().to_string();
        assert!(!sql.contains("(i.start_date, i.display_order, i.study_plan_item_id) >"));
        assert!(sql.contains("AND i.completed_at IS NULL"));

        let mut full = partial.clone();
        full.offset = Some(Utc::now().fixed_offset());
        full.study_plan_item_id = Some("item-9".into());
        full.include_completed = true;
        let builder = active_items_query(&full);
        assert!(
            builder
                .sql()
                .contains("(i.start_date, i.display_order, i.study_plan_item_id) > ($3, $4, $5)")
        );
        assert!(!builder.sql().contains("completed_at IS NULL"));
        assert!(builder.sql().ends_with("LIMIT $8"));
    }

    #[test]
    fn test_active_query_uses_supplied_now() {
        let args = args();
        let builder = active_items_query(&args);
        let sql = builder.sql();

        assert!(!sql.contains("NOW()"));
        assert!(sql.contains("AND i.start_date < $2 AND (i.end_date IS NULL OR i.end_date >= $2)"));
        assert_eq!(builder.values()[1], Value::from(args.now));
    }

    #[test]
    fn test_upcoming_query_pushes_undated_items_last() {
        let builder = upcoming_items_query(&args());
        assert!(
            builder
                .sql()
                .contains("COALESCE(i.start_date, $2 + INTERVAL '100 year')")
        );
        assert!(builder.sql().contains("ORDER BY i.start_date ASC, i.study_plan_item_id ASC"));
    }

    #[test]
    fn test_completed_query_cursor_without_start_date() {
        let mut cursor = args();
        cursor.display_order = Some(1);
        cursor.study_plan_item_id = Some("item-3".into());
        let sql = completed_items_query(&cursor).sql().to_string();

        assert!(sql.contains("AND i.start_date IS NULL AND (i.display_order > $3 OR i.study_plan_item_id < $4)"));
        assert!(sql.contains("AND i.completed_at IS NOT NULL"));
    }

    #[test]
    fn test_overdue_query_filters_by_end_date() {
        let mut filtered = args();
        filtered.course_ids = Some(vec!["course-1".into()]);
        let sql = overdue_items_query(&filtered).sql().to_string();

        assert!(sql.contains("AND i.end_date < $2"));
        assert!(sql.contains("AND sp.course_id = ANY($3)"));
        assert!(sql.ends_with("ORDER BY i.start_date DESC, i.study_plan_item_id DESC LIMIT $6"));
    }

    #[test]
    fn test_available_contents_optional_filters() {
        let query = available_contents_query(&ListStudentAvailableContentsArgs {
            student_id: "student-1".into(),
            chapter_id: Some("chapter-1".into()),
            ..Default::default()
        });
        assert!(query.sql().contains("AND i.content_structure ->> 'chapter_id' = $2"));
        assert!(!query.sql().contains("'book_id' ="));
        assert_eq!(query.values().len(), 4);
    }

    #[test]
    fn test_list_study_plans_query_pages_by_id() {
        let builder = list_study_plans_query(&ListStudyPlansArgs {
            student_id: "student-1".into(),
            limit: 5,
            offset: Some("sp-9".into()),
            ..Default::default()
        });
        assert!(builder.sql().contains("AND i.study_plan_id < $2"));
        assert!(builder.sql().ends_with("ORDER BY i.study_plan_id DESC LIMIT $3"));
    }
}
