//! 学习计划条目仓储
//!
//! 主计划的条目通过 `copy_study_plan_item_id` 派生出每个学生副本中的条目。

use std::collections::HashMap;

use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ConnectionTrait, FromQueryResult, TransactionTrait, Value};
use tracing::debug;

use crate::database::{
    Batch, QueryBuilder, bulk_upsert, exec, select_all, select_list, select_one, upsert_statement,
};
use crate::entity::study_plan_items::{self, Entity as StudyPlanItems};
use crate::errors::{RepositoryError, Result};
use crate::models::study_plan_items::{
    requests::{
        CountStudentStudyPlanItemsInClassFilter, FilterStudyPlanItemArgs, StudyPlanItemArgs,
        StudyPlanItemIdentity,
    },
    responses::{
        ItemCountRow, LearningMaterialStudyPlanItem, StudentStudyPlanItem, StudyPlanBookCourseRow,
        StudyProgressItem,
    },
};
use crate::models::{ContentStructure, StudyPlanItemStatus, StudyPlanStatus, UpdateStartEndDateFields};

const BULK_UPSERT_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT study_plan_items_pk DO UPDATE SET \
    available_from = EXCLUDED.available_from, \
    available_to = EXCLUDED.available_to, \
    start_date = EXCLUDED.start_date, \
    end_date = EXCLUDED.end_date, \
    updated_at = NOW(), \
    content_structure = EXCLUDED.content_structure, \
    display_order = EXCLUDED.display_order, \
    status = EXCLUDED.status, \
    school_date = COALESCE(EXCLUDED.school_date, study_plan_items.school_date)";

const SYNC_CONFLICT: &str = "ON CONFLICT (study_plan_id, content_structure_flatten) DO UPDATE SET \
    updated_at = EXCLUDED.updated_at, \
    display_order = EXCLUDED.display_order \
    RETURNING study_plan_item_id";

const COPY_ITEMS_OF_PLAN_SQL: &str = r#"INSERT INTO study_plan_items (
    study_plan_item_id, study_plan_id, available_from, available_to, start_date, end_date,
    created_at, updated_at, deleted_at, completed_at, content_structure, display_order,
    copy_study_plan_item_id, content_structure_flatten, status, school_date
)
SELECT
    gen_random_uuid()::TEXT, $1::TEXT, available_from, available_to, start_date, end_date,
    NOW(), NOW(), deleted_at, completed_at, content_structure, display_order,
    study_plan_item_id, content_structure_flatten, status, school_date
FROM study_plan_items spi
WHERE spi.study_plan_id = $2"#;

const COPY_ITEM_FOR_COPIED_PLANS_SQL: &str = r#"INSERT INTO study_plan_items (
    study_plan_item_id, study_plan_id, available_from, available_to, start_date, end_date,
    created_at, updated_at, deleted_at, completed_at, content_structure, display_order,
    copy_study_plan_item_id, content_structure_flatten, status, school_date
)
SELECT
    gen_random_uuid()::TEXT, sp.study_plan_id, spi.available_from, spi.available_to,
    spi.start_date, spi.end_date, NOW(), NOW(), spi.deleted_at, spi.completed_at,
    spi.content_structure, spi.display_order, spi.study_plan_item_id,
    spi.content_structure_flatten, spi.status, spi.school_date
FROM study_plan_items spi
INNER JOIN study_plans sp ON sp.master_study_plan_id = spi.study_plan_id
WHERE spi.study_plan_id = $1 AND spi.study_plan_item_id = $2
ON CONFLICT (study_plan_id, content_structure_flatten) DO UPDATE SET
    display_order = EXCLUDED.display_order"#;

/// 学生可见的条目：经课程关联的计划，或直接分配给学生的计划
const STUDENT_VISIBLE_ITEMS_SQL: &str = r#"WITH course_plans AS (
        SELECT csp.study_plan_id
        FROM course_students AS cs, course_study_plans AS csp
        WHERE cs.student_id = $2 AND cs.course_id = csp.course_id
            AND cs.deleted_at IS NULL AND csp.deleted_at IS NULL
    )
    SELECT DISTINCT spi.study_plan_item_id
    FROM study_plan_items AS spi, course_plans
    WHERE spi.study_plan_item_id = ANY($3) AND spi.study_plan_id = course_plans.study_plan_id
        AND spi.deleted_at IS NULL
    UNION
    SELECT DISTINCT spi.study_plan_item_id
    FROM study_plan_items AS spi, student_study_plans AS ssp
    WHERE ssp.student_id = $2 AND spi.study_plan_item_id = ANY($3)
        AND ssp.study_plan_id = spi.study_plan_id
        AND ssp.deleted_at IS NULL AND spi.deleted_at IS NULL"#;

const LIST_ITEM_BY_IDENTITY_SQL: &str = r#"SELECT spi.study_plan_item_id
FROM student_study_plans ssp
JOIN LATERAL (
    SELECT study_plan_item_id
    FROM study_plan_items
    WHERE study_plan_id = ssp.study_plan_id
        AND COALESCE(NULLIF(content_structure ->> 'lo_id', ''), content_structure ->> 'assignment_id') = $2
) spi ON TRUE
WHERE (ssp.master_study_plan_id = $1 OR (ssp.master_study_plan_id IS NULL AND ssp.study_plan_id = $1))
    AND ($3::TEXT IS NULL OR ssp.student_id = $3)"#;

const RESET_COMPLETED_BY_IDENTITY_SQL: &str = r#"UPDATE study_plan_items SET completed_at = NULL, updated_at = NOW()
WHERE deleted_at IS NULL AND study_plan_item_id IN (
    SELECT spi.study_plan_item_id
    FROM student_study_plans ssp
    JOIN study_plan_items spi ON spi.study_plan_id = ssp.study_plan_id
    WHERE (ssp.master_study_plan_id = $1 OR (ssp.master_study_plan_id IS NULL AND ssp.study_plan_id = $1))
        AND COALESCE(NULLIF(spi.content_structure ->> 'lo_id', ''), spi.content_structure ->> 'assignment_id') = $2
        AND ssp.student_id = $3
        AND ssp.deleted_at IS NULL
)"#;

#[derive(Debug, FromQueryResult)]
struct ItemIdRow {
    study_plan_item_id: String,
}

#[derive(Debug, FromQueryResult)]
struct ItemPlanRow {
    study_plan_item_id: String,
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

/// 学习计划条目仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct StudyPlanItemRepo;

impl StudyPlanItemRepo {
    /// 多行 upsert，冲突时刷新时间窗、内容结构、排序与状态
    ///
    /// 新行的 `school_date` 为空时保留已有的值。
    pub async fn bulk_insert<C>(&self, db: &C, items: &[study_plan_items::Model]) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, BULK_UPSERT_CONFLICT, items)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("批量写入学习计划条目失败: {e}")))
    }

    /// 将 `original_ids[i]` 的全部条目复制到 `new_ids[i]`
    pub async fn bulk_copy<C>(&self, db: &C, original_ids: &[String], new_ids: &[String]) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if original_ids.len() != new_ids.len() {
            return Err(RepositoryError::validation(
                "original study plan ids and new study plan ids not match",
            ));
        }

        let mut batch = Batch::new();
        for (original, copied) in original_ids.iter().zip(new_ids) {
            batch.queue(
                COPY_ITEMS_OF_PLAN_SQL,
                [Value::from(copied.clone()), Value::from(original.clone())],
            );
        }
        batch
            .exec(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("复制学习计划条目失败: {e}")))?;
        Ok(())
    }

    pub async fn find_by_study_plan_id<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_id: &str,
    ) -> Result<Vec<study_plan_items::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM study_plan_items WHERE study_plan_id = $1",
                select_list::<StudyPlanItems>(None)
            ),
            [Value::from(study_plan_id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学习计划条目失败: {e}")))
    }

    pub async fn find_by_study_plan_id_and_topic_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_id: &str,
        topic_ids: &[String],
    ) -> Result<Vec<study_plan_items::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM study_plan_items \
                 WHERE study_plan_id = $1 AND content_structure ->> 'topic_id' = ANY($2) \
                 AND deleted_at IS NULL",
                select_list::<StudyPlanItems>(None)
            ),
            [Value::from(study_plan_id), Value::from(topic_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("按主题查询学习计划条目失败: {e}")))
    }

    pub async fn mark_item_completed<C: ConnectionTrait>(&self, db: &C, item_id: &str) -> Result<()> {
        exec(
            db,
            "UPDATE study_plan_items SET completed_at = NOW() WHERE study_plan_item_id = $1",
            [Value::from(item_id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("标记条目完成失败: {e}")))?;
        Ok(())
    }

    pub async fn unmark_item_completed<C: ConnectionTrait>(&self, db: &C, item_id: &str) -> Result<()> {
        exec(
            db,
            "UPDATE study_plan_items SET completed_at = NULL WHERE study_plan_item_id = $1",
            [Value::from(item_id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("取消条目完成失败: {e}")))?;
        Ok(())
    }

    /// 按源条目同步其全部副本的时间窗、排序与状态，并恢复已软删除的副本
    pub async fn update_with_copied_from_item<C>(
        &self,
        db: &C,
        items: &[study_plan_items::Model],
    ) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut batch = Batch::new();
        for item in items {
            batch.queue(
                "UPDATE study_plan_items SET \
                 available_from = $1, start_date = $2, end_date = $3, available_to = $4, \
                 display_order = $5, updated_at = NOW(), deleted_at = NULL, status = $7 \
                 WHERE copy_study_plan_item_id = $6",
                [
                    Value::from(item.available_from),
                    Value::from(item.start_date),
                    Value::from(item.end_date),
                    Value::from(item.available_to),
                    Value::from(item.display_order),
                    Value::from(item.study_plan_item_id.clone()),
                    Value::from(item.status.clone()),
                ],
            );
        }
        batch
            .exec(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("同步条目副本失败: {e}")))?;
        Ok(())
    }

    /// 条目 id 到所属计划 id 的映射
    pub async fn find_study_plan_id_by_item_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        item_ids: &[String],
    ) -> Result<HashMap<String, String>> {
        let rows: Vec<ItemPlanRow> = select_all(
            db,
            "SELECT study_plan_item_id, study_plan_id FROM study_plan_items \
             WHERE study_plan_item_id = ANY($1)",
            [Value::from(item_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询条目所属计划失败: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.study_plan_item_id, row.study_plan_id))
            .collect())
    }

    pub async fn find_by_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
    ) -> Result<Vec<study_plan_items::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM study_plan_items \
                 WHERE study_plan_item_id = ANY($1) AND deleted_at IS NULL ORDER BY display_order ASC",
                select_list::<StudyPlanItems>(None)
            ),
            [Value::from(ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学习计划条目失败: {e}")))
    }

    /// 按教材、章节、主题和条目顺序排序的有效条目
    pub async fn find_and_sort_by_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
    ) -> Result<Vec<study_plan_items::Model>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM study_plan_items \
                 WHERE study_plan_item_id = ANY($1) AND deleted_at IS NULL \
                 ORDER BY content_structure ->> 'book_id', content_structure ->> 'chapter_id', \
                 content_structure ->> 'topic_id', display_order, study_plan_item_id",
                select_list::<StudyPlanItems>(None)
            ),
            [Value::from(ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("排序查询学习计划条目失败: {e}")))
    }

    pub async fn soft_delete_with_study_plan_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE study_plan_items SET deleted_at = NOW() WHERE study_plan_id = ANY($1)",
            [Value::from(study_plan_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除计划条目失败: {e}")))
    }

    pub async fn delete_study_plan_items_by_study_plans<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_ids: &[String],
    ) -> Result<u64> {
        self.soft_delete_with_study_plan_ids(db, study_plan_ids).await
    }

    /// 软删除与学习目标关联的条目
    pub async fn delete_study_plan_items_by_lo_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        lo_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE study_plan_items SET deleted_at = NOW() WHERE study_plan_item_id = ANY(\
             SELECT study_plan_item_id FROM lo_study_plan_items WHERE lo_id = ANY($1))",
            [Value::from(lo_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("按学习目标删除条目失败: {e}")))
    }

    /// 统计主计划每个条目在学生副本中的数量
    ///
    /// 返回计数映射与按 id 升序排列的源条目 id。
    pub async fn count_student_in_study_plan_item<C: ConnectionTrait>(
        &self,
        db: &C,
        master_study_plan_id: &str,
        only_completed: bool,
    ) -> Result<(HashMap<String, i64>, Vec<String>)> {
        let rows: Vec<ItemCountRow> = select_all(
            db,
            "SELECT spi.copy_study_plan_item_id AS root_study_plan_item_id, COUNT(*) AS count_student \
             FROM study_plan_items spi INNER JOIN study_plans sp ON spi.study_plan_id = sp.study_plan_id \
             WHERE sp.master_study_plan_id = $1 AND ($2 = FALSE OR spi.completed_at IS NOT NULL) \
             GROUP BY spi.copy_study_plan_item_id \
             ORDER BY spi.copy_study_plan_item_id ASC",
            [Value::from(master_study_plan_id), Value::from(only_completed)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("统计条目学生数失败: {e}")))?;

        let mut counts = HashMap::with_capacity(rows.len());
        let mut sorted = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.root_study_plan_item_id.unwrap_or_default();
            counts.insert(id.clone(), row.count_student);
            sorted.push(id);
        }
        Ok((counts, sorted))
    }

    /// 源条目在各学生副本中的对应条目，可限定学生
    pub async fn retrieve_child_study_plan_item<C: ConnectionTrait>(
        &self,
        db: &C,
        item_id: &str,
        student_ids: Option<&[String]>,
    ) -> Result<HashMap<String, study_plan_items::Model>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT ssp.student_id, {} FROM study_plan_items spi \
             JOIN study_plans sp USING (study_plan_id) \
             JOIN student_study_plans ssp USING (study_plan_id)",
            select_list::<StudyPlanItems>(Some("spi"))
        ));
        let item = builder.bind(item_id);
        builder.push(&format!(" WHERE spi.copy_study_plan_item_id = {item}"));
        if let Some(student_ids) = student_ids {
            let students = builder.bind(student_ids.to_vec());
            builder.push(&format!(" AND ssp.student_id = ANY({students})"));
        }
        builder.push(
            " AND spi.deleted_at IS NULL AND sp.deleted_at IS NULL AND ssp.deleted_at IS NULL \
             ORDER BY ssp.student_id ASC",
        );

        let (sql, values) = builder.into_parts();
        let rows: Vec<StudentStudyPlanItem> = select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询学生条目副本失败: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.student_id, row.item))
            .collect())
    }

    pub async fn retrieve_book_id_by_study_plan_id<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_id: &str,
    ) -> Result<String> {
        let row: Option<BookIdRow> = select_one(
            db,
            "SELECT book_id FROM study_plans WHERE study_plan_id = $1 AND deleted_at IS NULL",
            [Value::from(study_plan_id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学习计划教材失败: {e}")))?;

        row.map(|row| row.book_id.unwrap_or_default())
            .ok_or_else(|| RepositoryError::not_found(format!("学习计划不存在: {study_plan_id}")))
    }

    pub async fn count_student_study_plan_items_in_class<C: ConnectionTrait>(
        &self,
        db: &C,
        filter: &CountStudentStudyPlanItemsInClassFilter,
    ) -> Result<i64> {
        let row: Option<CountRow> = select_one(
            db,
            "SELECT COUNT(*) AS count FROM study_plan_items spi \
             JOIN student_study_plans ssp USING (study_plan_id) \
             JOIN class_students cs USING (student_id) \
             WHERE cs.class_id = $1 AND spi.copy_study_plan_item_id = $2 \
             AND ($3 IS FALSE OR spi.completed_at IS NOT NULL) \
             AND spi.deleted_at IS NULL AND ssp.deleted_at IS NULL AND cs.deleted_at IS NULL",
            [
                Value::from(filter.class_id.clone()),
                Value::from(filter.study_plan_item_id.clone()),
                Value::from(filter.is_completed),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("统计班级条目失败: {e}")))?;

        Ok(row.map(|row| row.count).unwrap_or(0))
    }

    /// 主计划条目的内容结构中出现的 (教材, 课程)，按计划分组
    pub async fn retrieve_study_plan_content_structures_by_books<C: ConnectionTrait>(
        &self,
        db: &C,
        book_ids: &[String],
    ) -> Result<HashMap<String, Vec<ContentStructure>>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let patterns: Vec<String> = book_ids.iter().map(|id| format!("book::{id}%")).collect();
        let rows: Vec<StudyPlanBookCourseRow> = select_all(
            db,
            "SELECT spi.study_plan_id, spi.content_structure ->> 'book_id' AS book_id, \
             spi.content_structure ->> 'course_id' AS course_id \
             FROM study_plan_items spi INNER JOIN study_plans sp ON spi.study_plan_id = sp.study_plan_id \
             WHERE sp.deleted_at IS NULL AND spi.copy_study_plan_item_id IS NULL \
             AND spi.content_structure_flatten LIKE ANY($1) \
             GROUP BY spi.study_plan_id, spi.content_structure ->> 'book_id', spi.content_structure ->> 'course_id'",
            [Value::from(patterns)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询教材内容结构失败: {e}")))?;

        let mut grouped: HashMap<String, Vec<ContentStructure>> = HashMap::new();
        for row in rows {
            grouped.entry(row.study_plan_id).or_default().push(ContentStructure {
                book_id: row.book_id.unwrap_or_default(),
                course_id: row.course_id.unwrap_or_default(),
                ..Default::default()
            });
        }
        Ok(grouped)
    }

    /// 把主计划新增的条目复制到它的所有副本
    pub async fn copy_items_for_copied_study_plans<C>(
        &self,
        db: &C,
        items: &[study_plan_items::Model],
    ) -> Result<()>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut batch = Batch::new();
        for item in items {
            batch.queue(
                COPY_ITEM_FOR_COPIED_PLANS_SQL,
                [
                    Value::from(item.study_plan_id.clone()),
                    Value::from(item.study_plan_item_id.clone()),
                ],
            );
        }
        batch
            .exec(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("复制条目到计划副本失败: {e}")))?;
        Ok(())
    }

    /// 按 (study_plan_id, content_structure_flatten) 同步条目，返回新插入的条目
    ///
    /// 已存在的条目只刷新排序，并把传入条目的 id 改为库中的 id。
    pub async fn bulk_sync<C>(
        &self,
        db: &C,
        items: &mut [study_plan_items::Model],
    ) -> Result<Vec<study_plan_items::Model>>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut batch = Batch::new();
        for item in items.iter() {
            batch.queue_statement(upsert_statement(item, SYNC_CONFLICT));
        }

        let results: Vec<Vec<ItemIdRow>> = batch
            .query(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("同步学习计划条目失败: {e}")))?;

        let mut inserted = Vec::new();
        for (item, rows) in items.iter_mut().zip(results) {
            let returned = rows.into_iter().next().ok_or_else(|| {
                RepositoryError::database_operation(format!(
                    "同步条目未返回 id: {}",
                    item.study_plan_item_id
                ))
            })?;
            if returned.study_plan_item_id == item.study_plan_item_id {
                inserted.push(item.clone());
            } else {
                item.study_plan_item_id = returned.study_plan_item_id;
            }
        }

        debug!("Synced {} items, {} inserted", items.len(), inserted.len());
        Ok(inserted)
    }

    pub async fn update_completed_at_by_id<C: ConnectionTrait>(
        &self,
        db: &C,
        id: &str,
        completed_at: Option<DateTimeWithTimeZone>,
    ) -> Result<()> {
        let affected = exec(
            db,
            "UPDATE study_plan_items SET completed_at = $2, updated_at = NOW() \
             WHERE study_plan_item_id = $1 AND deleted_at IS NULL",
            [Value::from(id), Value::from(completed_at)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("更新条目完成时间失败: {e}")))?;

        if affected == 0 {
            return Err(RepositoryError::not_found(format!(
                "not found any study plan item to update: {id}"
            )));
        }
        Ok(())
    }

    /// 清除学生在主计划下某个学习资料条目的完成时间，返回受影响行数
    pub async fn update_completed_at_to_null_by_study_plan_item_identity<C: ConnectionTrait>(
        &self,
        db: &C,
        identity: &StudyPlanItemIdentity,
    ) -> Result<u64> {
        let student_id = identity.student_id.clone().ok_or_else(|| {
            RepositoryError::validation("student id is required to reset item completion")
        })?;

        exec(
            db,
            RESET_COMPLETED_BY_IDENTITY_SQL,
            [
                Value::from(identity.study_plan_id.clone()),
                Value::from(identity.learning_material_id.clone()),
                Value::from(student_id),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("清除条目完成时间失败: {e}")))
    }

    pub async fn soft_delete_by_study_plan_item_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE study_plan_items SET deleted_at = NOW() \
             WHERE study_plan_item_id = ANY($1) AND deleted_at IS NULL",
            [Value::from(ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除学习计划条目失败: {e}")))
    }

    /// 更新学生可见条目的上课日期
    pub async fn update_school_date<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
        student_id: &str,
        school_date: Option<DateTimeWithTimeZone>,
    ) -> Result<u64> {
        exec(
            db,
            format!(
                "UPDATE study_plan_items SET school_date = $1, updated_at = NOW() \
                 WHERE study_plan_item_id IN ({STUDENT_VISIBLE_ITEMS_SQL})"
            ),
            [
                Value::from(school_date),
                Value::from(student_id),
                Value::from(ids.to_vec()),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("更新条目上课日期失败: {e}")))
    }

    /// 更新学生可见条目的状态
    pub async fn update_status<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
        student_id: &str,
        status: StudyPlanItemStatus,
    ) -> Result<u64> {
        exec(
            db,
            format!(
                "UPDATE study_plan_items SET status = $1, updated_at = NOW() \
                 WHERE study_plan_item_id IN ({STUDENT_VISIBLE_ITEMS_SQL})"
            ),
            [
                Value::from(status),
                Value::from(student_id),
                Value::from(ids.to_vec()),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("更新条目状态失败: {e}")))
    }

    /// 更新主计划副本中某学习资料对应条目的上课日期
    pub async fn update_school_date_by_study_plan_item_identity<C: ConnectionTrait>(
        &self,
        db: &C,
        learning_material_id: &str,
        master_study_plan_id: &str,
        student_ids: &[String],
        school_date: Option<DateTimeWithTimeZone>,
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE study_plan_items SET school_date = $1, updated_at = NOW() \
             WHERE study_plan_item_id = ANY(\
             SELECT spi.study_plan_item_id FROM study_plan_items spi \
             JOIN student_study_plans ssp ON spi.study_plan_id = ssp.study_plan_id \
             WHERE ssp.master_study_plan_id = $2 \
             AND (spi.content_structure ->> 'lo_id' = $3 OR spi.content_structure ->> 'assignment_id' = $3) \
             AND ssp.student_id = ANY($4))",
            [
                Value::from(school_date),
                Value::from(master_study_plan_id),
                Value::from(learning_material_id),
                Value::from(student_ids.to_vec()),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("更新学习资料上课日期失败: {e}")))
    }

    pub async fn bulk_update_school_date<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
        school_date: Option<DateTimeWithTimeZone>,
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE study_plan_items SET school_date = $1, updated_at = NOW() \
             WHERE study_plan_item_id = ANY($2)",
            [Value::from(school_date), Value::from(ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("批量更新上课日期失败: {e}")))
    }

    pub async fn find_with_filter<C: ConnectionTrait>(
        &self,
        db: &C,
        filter: &StudyPlanItemArgs,
    ) -> Result<Vec<study_plan_items::Model>> {
        let (sql, values) = find_with_filter_query(filter).into_parts();
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("筛选学习计划条目失败: {e}")))
    }

    pub async fn find_with_filter_v2<C: ConnectionTrait>(
        &self,
        db: &C,
        filter: &FilterStudyPlanItemArgs,
    ) -> Result<Vec<study_plan_items::Model>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM study_plan_items",
            select_list::<StudyPlanItems>(None)
        ));
        let plan = builder.bind(filter.study_plan_id.clone());
        let topic = builder.bind(filter.topic_id.clone());
        builder.push(&format!(
            " WHERE study_plan_id = {plan} AND content_structure ->> 'topic_id' = {topic}"
        ));
        if let Some(lo_id) = &filter.lo_id {
            let p = builder.bind(lo_id.clone());
            builder.push(&format!(" AND content_structure ->> 'lo_id' = {p}"));
        }
        if let Some(assignment_id) = &filter.assignment_id {
            let p = builder.bind(assignment_id.clone());
            builder.push(&format!(" AND content_structure ->> 'assignment_id' = {p}"));
        }

        let (sql, values) = builder.into_parts();
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("筛选学习计划条目失败: {e}")))
    }

    /// 学生在课程某教材下当前开放的条目
    pub async fn fetch_by_study_progress<C: ConnectionTrait>(
        &self,
        db: &C,
        course_id: &str,
        book_id: &str,
        student_id: &str,
    ) -> Result<Vec<StudyProgressItem>> {
        select_all(
            db,
            "SELECT spi.study_plan_item_id, spi.content_structure, spi.completed_at \
             FROM student_study_plans ssp \
             JOIN course_students cs ON cs.student_id = ssp.student_id \
             JOIN study_plan_items spi ON spi.study_plan_id = ssp.study_plan_id \
             JOIN study_plans sp ON sp.study_plan_id = spi.study_plan_id \
             WHERE cs.deleted_at IS NULL AND ssp.deleted_at IS NULL AND spi.deleted_at IS NULL \
             AND cs.course_id = $1 AND ssp.student_id = $2 \
             AND spi.content_structure ->> 'book_id' = $3 \
             AND spi.content_structure ->> 'course_id' = $1 \
             AND spi.status = $4 AND sp.status = $5 \
             AND spi.available_from <= NOW() AND NOW() <= spi.available_to \
             GROUP BY spi.study_plan_item_id, spi.content_structure, spi.completed_at",
            [
                Value::from(course_id),
                Value::from(student_id),
                Value::from(book_id),
                Value::from(StudyPlanItemStatus::Active),
                Value::from(StudyPlanStatus::Active),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询学习进度条目失败: {e}")))
    }

    /// 教材下关联到指定学习目标或作业的条目
    pub async fn retrieve_by_book_content<C: ConnectionTrait>(
        &self,
        db: &C,
        book_ids: &[String],
        lo_ids: &[String],
        assignment_ids: &[String],
    ) -> Result<Vec<study_plan_items::Model>> {
        select_all(
            db,
            format!(
                "SELECT DISTINCT {} FROM study_plan_items spi JOIN study_plans sp USING (study_plan_id) \
                 LEFT JOIN lo_study_plan_items lspi ON lspi.study_plan_item_id = spi.study_plan_item_id \
                 LEFT JOIN assignment_study_plan_items aspi ON aspi.study_plan_item_id = spi.study_plan_item_id \
                 WHERE sp.book_id = ANY($1) AND spi.deleted_at IS NULL AND sp.deleted_at IS NULL \
                 AND (lspi.lo_id = ANY($2) OR aspi.assignment_id = ANY($3))",
                select_list::<StudyPlanItems>(Some("spi"))
            ),
            [
                Value::from(book_ids.to_vec()),
                Value::from(lo_ids.to_vec()),
                Value::from(assignment_ids.to_vec()),
            ],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("按教材内容查询条目失败: {e}")))
    }

    /// 在开放时间窗允许的范围内批量修改开始/结束日期，返回受影响行数
    pub async fn bulk_update_start_end_date<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
        fields: UpdateStartEndDateFields,
        start_date: Option<DateTimeWithTimeZone>,
        end_date: Option<DateTimeWithTimeZone>,
    ) -> Result<u64> {
        let (sql, values) = start_end_date_statement(ids, fields, start_date, end_date);
        exec(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("批量更新条目日期失败: {e}")))
    }

    /// 按身份逐个定位条目 id，结果与输入一一对应
    pub async fn list_sp_item_by_identity<C>(
        &self,
        db: &C,
        identities: &[StudyPlanItemIdentity],
    ) -> Result<Vec<String>>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let mut batch = Batch::new();
        for identity in identities {
            batch.queue(
                LIST_ITEM_BY_IDENTITY_SQL,
                [
                    Value::from(identity.study_plan_id.clone()),
                    Value::from(identity.learning_material_id.clone()),
                    Value::from(identity.student_id.clone()),
                ],
            );
        }

        let results: Vec<Vec<ItemIdRow>> = batch
            .query(db)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("按身份查询条目失败: {e}")))?;

        results
            .into_iter()
            .zip(identities)
            .map(|(rows, identity)| {
                rows.into_iter()
                    .next()
                    .map(|row| row.study_plan_item_id)
                    .ok_or_else(|| {
                        RepositoryError::not_found(format!(
                            "学习计划条目不存在: {} / {}",
                            identity.study_plan_id, identity.learning_material_id
                        ))
                    })
            })
            .collect()
    }

    pub async fn update_study_plan_items_status<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
        status: StudyPlanItemStatus,
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE study_plan_items SET status = $1, updated_at = NOW() \
             WHERE study_plan_item_id = ANY($2) AND deleted_at IS NULL",
            [Value::from(status), Value::from(ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("更新条目状态失败: {e}")))
    }

    /// 计划内每个未删除条目的学习资料 id
    pub async fn find_learning_material_by_study_plan_id<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_id: &str,
    ) -> Result<Vec<LearningMaterialStudyPlanItem>> {
        select_all(
            db,
            "SELECT COALESCE(NULLIF(content_structure ->> 'lo_id', ''), content_structure ->> 'assignment_id', '') \
             AS learning_material_id, study_plan_item_id \
             FROM study_plan_items WHERE study_plan_id = $1 AND deleted_at IS NULL",
            [Value::from(study_plan_id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询计划学习资料失败: {e}")))
    }
}

fn find_with_filter_query(filter: &StudyPlanItemArgs) -> QueryBuilder {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM study_plan_items WHERE deleted_at IS NULL",
        select_list::<StudyPlanItems>(None)
    ));

    if let Some(ids) = &filter.study_plan_ids {
        let p = builder.bind(ids.clone());
        builder.push(&format!(" AND study_plan_id = ANY({p})"));
    }
    if let Some(ids) = &filter.topic_ids {
        let p = builder.bind(ids.clone());
        builder.push(&format!(" AND content_structure ->> 'topic_id' = ANY({p})"));
    }
    match (&filter.lo_ids, &filter.assignment_ids) {
        (None, None) => {}
        (lo_ids, assignment_ids) => {
            let mut conditions = Vec::new();
            if let Some(ids) = lo_ids {
                let p = builder.bind(ids.clone());
                conditions.push(format!("content_structure ->> 'lo_id' = ANY({p})"));
            }
            if let Some(ids) = assignment_ids {
                let p = builder.bind(ids.clone());
                conditions.push(format!("content_structure ->> 'assignment_id' = ANY({p})"));
            }
            builder.push(&format!(" AND ({})", conditions.join(" OR ")));
        }
    }
    if filter.available_date_filter {
        builder.push(" AND available_from <= NOW() AND NOW() <= available_to");
    }
    builder
}

fn start_end_date_statement(
    ids: &[String],
    fields: UpdateStartEndDateFields,
    start_date: Option<DateTimeWithTimeZone>,
    end_date: Option<DateTimeWithTimeZone>,
) -> (String, Vec<Value>) {
    let ids = Value::from(ids.to_vec());
    let (set, guard, values) = match fields {
        UpdateStartEndDateFields::All => (
            "start_date = $2, end_date = $3",
            "available_from <= $2 AND (available_to > $3 OR available_to IS NULL)",
            vec![ids, Value::from(start_date), Value::from(end_date)],
        ),
        UpdateStartEndDateFields::StartDate => (
            "start_date = $2",
            "available_from <= $2",
            vec![ids, Value::from(start_date)],
        ),
        UpdateStartEndDateFields::EndDate => (
            "end_date = $2",
            "(available_to > $2 OR available_to IS NULL)",
            vec![ids, Value::from(end_date)],
        ),
    };

    (
        format!(
            "UPDATE study_plan_items SET updated_at = NOW(), {set} \
             WHERE study_plan_item_id = ANY($1) AND {guard}"
        ),
        values,
    )
}
