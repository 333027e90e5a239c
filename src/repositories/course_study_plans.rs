//! 课程学习计划仓储与课程统计

use sea_orm::{ConnectionTrait, TransactionTrait, Value};
use tracing::debug;

use crate::database::{
    Batch, QueryBuilder, bulk_upsert, exec, select_all, select_list, upsert_statement,
};
use crate::entity::course_study_plans::{self, Entity as CourseStudyPlans};
use crate::errors::{RepositoryError, Result};
use crate::models::course_study_plans::{
    requests::{ListCourseStatisticArgs, ListCourseStatisticItemsArgs, ListCourseStudyPlansArgs},
    responses::{
        CourseStatisticItem, ItemStatisticRow, LearningMaterialStatistic,
        STATISTIC_TYPE_LEARNING_MATERIAL, TopicStatistic,
    },
};
use crate::models::{StudyPlanItemStatus, SubmissionStatus};

const UPSERT_CONFLICT: &str =
    "ON CONFLICT ON CONSTRAINT course_study_plans_pk DO UPDATE SET updated_at = EXCLUDED.updated_at";

/// 学习材料与主题两级汇总，`course_stats` 由 [`course_stats_query`] 生成
///
/// 学习材料行的 `display_order` 取条目排序，主题行取主题下最小的条目排序。
const STATISTIC_AGGREGATE_SQL: &str = r#"
(SELECT
    learning_material_id,
    topic_id,
    SUM((status = $ACTIVE)::INT)::INTEGER AS total_assign_student,
    SUM((status = $ACTIVE AND is_completed)::INT)::INTEGER AS completed_student,
    COALESCE(AVG(percentage), -1)::INTEGER AS average_score,
    AVG(percentage)::INTEGER AS average_score_raw,
    'LEARNING_MATERIAL' AS statistic_type,
    MIN(display_order) AS display_order
FROM course_stats
GROUP BY learning_material_id, topic_id)
UNION ALL
(SELECT
    'NONE' AS learning_material_id,
    topic_stat.topic_id,
    SUM((active_lm > 0)::INT)::INTEGER AS total_assign_student,
    SUM((active_lm > 0 AND active_lm = completed_lm)::INT)::INTEGER AS completed_student,
    COALESCE((
        SELECT AVG(ls.average_score_raw)
        FROM (
            SELECT topic_id, AVG(percentage)::INTEGER AS average_score_raw
            FROM course_stats
            GROUP BY learning_material_id, topic_id
        ) ls
        WHERE ls.average_score_raw IS NOT NULL AND ls.topic_id = topic_stat.topic_id
    )::INTEGER, -1) AS average_score,
    NULL::INTEGER AS average_score_raw,
    'TOPIC' AS statistic_type,
    MIN(topic_stat.display_order) AS display_order
FROM (
    SELECT
        topic_id,
        student_id,
        MIN(display_order) AS display_order,
        SUM((status = $ACTIVE)::INT) AS active_lm,
        SUM((status = $ACTIVE AND is_completed)::INT) AS completed_lm
    FROM course_stats
    GROUP BY topic_id, student_id
) topic_stat
GROUP BY topic_stat.topic_id)
ORDER BY display_order, statistic_type"#;

/// 课程学习计划仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct CourseStudyPlanRepo;

impl CourseStudyPlanRepo {
    /// 批量 upsert，冲突时只刷新 `updated_at`
    pub fn queue_upsert(&self, batch: &mut Batch, item: &course_study_plans::Model) {
        batch.queue_statement(upsert_statement(item, UPSERT_CONFLICT));
    }

    pub async fn bulk_upsert<C>(&self, db: &C, items: &[course_study_plans::Model]) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, UPSERT_CONFLICT, items).await.map_err(|e| {
            RepositoryError::database_operation(format!("批量写入课程学习计划失败: {e}"))
        })
    }

    /// 课程关联的有效主计划
    pub async fn find_by_course_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        course_ids: &[String],
    ) -> Result<Vec<course_study_plans::Model>> {
        self.list_course_study_plans(
            db,
            &ListCourseStudyPlansArgs {
                course_ids: Some(course_ids.to_vec()),
                book_ids: None,
            },
        )
        .await
    }

    pub async fn list_course_study_plans<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListCourseStudyPlansArgs,
    ) -> Result<Vec<course_study_plans::Model>> {
        let (sql, values) = list_course_study_plans_query(args).into_parts();
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询课程学习计划失败: {e}")))
    }

    /// 软删除一条课程与计划的关联
    pub async fn delete_course_study_plan_by<C: ConnectionTrait>(
        &self,
        db: &C,
        course_id: &str,
        study_plan_id: &str,
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE course_study_plans AS csp SET deleted_at = NOW() \
             WHERE csp.course_id = $1 AND csp.study_plan_id = $2",
            [Value::from(course_id), Value::from(study_plan_id)],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除课程学习计划失败: {e}")))
    }

    /// 主计划在课程内每个学生副本的条目
    pub async fn list_course_statistic_items<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListCourseStatisticItemsArgs,
    ) -> Result<Vec<CourseStatisticItem>> {
        let (sql, values) = course_statistic_items_query(args).into_parts();
        select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询课程统计条目失败: {e}")))
    }

    /// 课程统计，返回 (主题统计, 学习材料统计)
    pub async fn list_course_statistic<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &ListCourseStatisticArgs,
    ) -> Result<(Vec<TopicStatistic>, Vec<LearningMaterialStatistic>)> {
        let (sql, values) = course_statistic_query(args).into_parts();
        let rows: Vec<ItemStatisticRow> = select_all(db, sql, values)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("查询课程统计失败: {e}")))?;
        debug!("Course statistic returned {} rows", rows.len());

        Ok(split_statistics(rows))
    }
}

fn split_statistics(
    rows: Vec<ItemStatisticRow>,
) -> (Vec<TopicStatistic>, Vec<LearningMaterialStatistic>) {
    let mut topics = Vec::new();
    let mut materials = Vec::new();

    for row in rows {
        if row.statistic_type == STATISTIC_TYPE_LEARNING_MATERIAL {
            materials.push(LearningMaterialStatistic {
                learning_material_id: row.learning_material_id,
                topic_id: row.topic_id,
                total_assign_student: row.total_assign_student,
                completed_student: row.completed_student,
                average_score: row.average_score,
                average_score_raw: row.average_score_raw,
            });
        } else {
            topics.push(TopicStatistic {
                topic_id: row.topic_id,
                total_assign_student: row.total_assign_student,
                completed_student: row.completed_student,
                average_score: row.average_score,
            });
        }
    }

    (topics, materials)
}

fn list_course_study_plans_query(args: &ListCourseStudyPlansArgs) -> QueryBuilder {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM course_study_plans AS csp \
         JOIN study_plans AS sp ON sp.study_plan_id = csp.study_plan_id \
         AND sp.master_study_plan_id IS NULL AND sp.deleted_at IS NULL \
         WHERE csp.deleted_at IS NULL",
        select_list::<CourseStudyPlans>(Some("csp"))
    ));
    if let Some(course_ids) = &args.course_ids {
        let p = builder.bind(course_ids.clone());
        builder.push(&format!(" AND csp.course_id = ANY({p})"));
    }
    if let Some(book_ids) = &args.book_ids {
        let p = builder.bind(book_ids.clone());
        builder.push(&format!(" AND sp.book_id = ANY({p})"));
    }
    builder
}

fn course_statistic_items_query(args: &ListCourseStatisticItemsArgs) -> QueryBuilder {
    let mut builder = QueryBuilder::new(
        "SELECT spi.content_structure, spi.copy_study_plan_item_id AS root_study_plan_item_id, \
         ssp.student_id, spi.study_plan_item_id, spi.status, spi.completed_at, \
         COALESCE(NULLIF(spi.content_structure ->> 'lo_id', ''), spi.content_structure ->> 'assignment_id') AS learning_material_id \
         FROM course_study_plans csp \
         JOIN study_plans sp ON sp.course_id = csp.course_id AND sp.master_study_plan_id = csp.study_plan_id \
         JOIN student_study_plans ssp ON ssp.study_plan_id = sp.study_plan_id \
         JOIN course_students cst ON cst.course_id = csp.course_id AND cst.student_id = ssp.student_id \
         JOIN study_plan_items spi ON spi.study_plan_id = sp.study_plan_id",
    );
    let course = builder.bind(args.course_id.clone());
    let plan = builder.bind(args.study_plan_id.clone());
    builder.push(&format!(
        " WHERE csp.course_id = {course} AND sp.master_study_plan_id = {plan}"
    ));

    if let Some(class_ids) = &args.class_ids {
        let p = builder.bind(class_ids.clone());
        builder.push(&format!(
            " AND EXISTS (SELECT 1 FROM class_students cs \
             JOIN course_classes cc ON cc.class_id = cs.class_id AND cc.course_id = csp.course_id \
             WHERE cs.student_id = ssp.student_id AND cs.class_id = ANY({p}) \
             AND cs.deleted_at IS NULL AND cc.deleted_at IS NULL)"
        ));
    }

    builder.push(
        " AND csp.deleted_at IS NULL AND sp.deleted_at IS NULL AND spi.deleted_at IS NULL \
         AND ssp.deleted_at IS NULL AND cst.deleted_at IS NULL \
         AND spi.content_structure IS NOT NULL \
         ORDER BY spi.content_structure ->> 'book_id', spi.content_structure ->> 'chapter_id', \
         spi.display_order, spi.study_plan_item_id",
    );
    builder
}

/// 统计明细：每个学生在主计划每个条目上的状态、完成情况与得分百分比
///
/// 得分取该条目最新一次已批改提交的 `correct_score / total_score`，
/// 仅统计当前在读（`start_at`/`end_at` 覆盖当前时间）的学生。
fn course_stats_query(args: &ListCourseStatisticArgs) -> (QueryBuilder, String) {
    let mut builder = QueryBuilder::new("");
    let course = builder.bind(args.course_id.clone());
    let plan = builder.bind(args.study_plan_id.clone());
    let graded = builder.bind(vec![
        SubmissionStatus::MARKED.to_string(),
        SubmissionStatus::RETURNED.to_string(),
    ]);
    let active = builder.bind(StudyPlanItemStatus::Active);

    builder.push(&format!(
        "WITH course_stats AS (SELECT \
         ssp.student_id, \
         COALESCE(spi.content_structure ->> 'topic_id', '') AS topic_id, \
         COALESCE(NULLIF(spi.content_structure ->> 'lo_id', ''), spi.content_structure ->> 'assignment_id', '') AS learning_material_id, \
         spi.status, \
         spi.display_order, \
         spi.completed_at IS NOT NULL AS is_completed, \
         (SELECT (ls.correct_score / NULLIF(ls.total_score, 0) * 100)::FLOAT8 \
          FROM student_latest_submissions ls \
          WHERE ls.study_plan_item_id = spi.study_plan_item_id AND ls.student_id = ssp.student_id \
          AND ls.status = ANY({graded}) AND ls.deleted_at IS NULL \
          LIMIT 1) AS percentage \
         FROM study_plans sp \
         JOIN student_study_plans ssp ON ssp.master_study_plan_id = sp.study_plan_id \
         JOIN course_students cs ON cs.course_id = sp.course_id AND cs.student_id = ssp.student_id \
         JOIN study_plan_items spi ON spi.study_plan_id = ssp.study_plan_id \
         WHERE sp.course_id = {course} AND sp.study_plan_id = {plan} \
         AND sp.master_study_plan_id IS NULL \
         AND (cs.start_at IS NULL OR cs.start_at <= NOW()) AND (cs.end_at IS NULL OR NOW() <= cs.end_at) \
         AND spi.available_from IS NOT NULL AND spi.available_to IS NOT NULL \
         AND sp.deleted_at IS NULL AND ssp.deleted_at IS NULL AND cs.deleted_at IS NULL \
         AND spi.deleted_at IS NULL"
    ));

    if let Some(student_ids) = &args.student_ids {
        let p = builder.bind(student_ids.clone());
        builder.push(&format!(" AND ssp.student_id = ANY({p})"));
    }
    builder.push(")");
    (builder, active)
}

fn course_statistic_query(args: &ListCourseStatisticArgs) -> QueryBuilder {
    let (mut builder, active) = course_stats_query(args);
    builder.push(&STATISTIC_AGGREGATE_SQL.replace("$ACTIVE", &active));
    builder
}
