//! 作业及其与学习计划条目的关联

use sea_orm::{ConnectionTrait, TransactionTrait, Value};

use crate::database::{bulk_upsert, exec, select_all, select_list};
use crate::entity::prelude::*;
use crate::errors::{RepositoryError, Result};

const ASSIGNMENT_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT assignments_pk DO UPDATE SET \
    name = EXCLUDED.name, \
    type = EXCLUDED.type, \
    status = EXCLUDED.status, \
    instruction = EXCLUDED.instruction, \
    max_grade = EXCLUDED.max_grade, \
    is_required_grade = EXCLUDED.is_required_grade, \
    display_order = EXCLUDED.display_order, \
    topic_id = EXCLUDED.topic_id, \
    content = EXCLUDED.content, \
    updated_at = EXCLUDED.updated_at, \
    deleted_at = NULL";

const ASSIGNMENT_ITEM_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT assignment_study_plan_items_pk \
    DO UPDATE SET updated_at = EXCLUDED.updated_at, deleted_at = NULL";

const LO_ITEM_CONFLICT: &str = "ON CONFLICT ON CONSTRAINT lo_study_plan_items_pk \
    DO UPDATE SET updated_at = EXCLUDED.updated_at, deleted_at = NULL";

/// 作业仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentRepo;

impl AssignmentRepo {
    /// 批量 upsert，冲突时覆盖全部内容并恢复软删除
    pub async fn bulk_upsert<C>(&self, db: &C, assignments: &[AssignmentModel]) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, ASSIGNMENT_CONFLICT, assignments)
            .await
            .map_err(|e| RepositoryError::database_operation(format!("批量写入作业失败: {e}")))
    }

    /// 未删除的作业
    pub async fn retrieve_assignments<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: &[String],
    ) -> Result<Vec<AssignmentModel>> {
        select_all(
            db,
            format!(
                "SELECT {} FROM assignments WHERE assignment_id = ANY($1) AND deleted_at IS NULL",
                select_list::<Assignments>(None)
            ),
            [Value::from(ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("查询作业失败: {e}")))
    }

    pub async fn soft_delete<C: ConnectionTrait>(&self, db: &C, ids: &[String]) -> Result<u64> {
        exec(
            db,
            "UPDATE assignments SET deleted_at = NOW(), updated_at = NOW() \
             WHERE assignment_id = ANY($1) AND deleted_at IS NULL",
            [Value::from(ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除作业失败: {e}")))
    }
}

/// 作业与条目关联仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentStudyPlanItemRepo;

impl AssignmentStudyPlanItemRepo {
    /// 写入关联，已存在的关联刷新时间并恢复
    pub async fn bulk_insert<C>(&self, db: &C, items: &[AssignmentStudyPlanItemModel]) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, ASSIGNMENT_ITEM_CONFLICT, items).await.map_err(|e| {
            RepositoryError::database_operation(format!("批量写入作业条目关联失败: {e}"))
        })
    }

    pub async fn soft_delete_by_study_plan_item_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_item_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE assignment_study_plan_items SET deleted_at = NOW() \
             WHERE study_plan_item_id = ANY($1) AND deleted_at IS NULL",
            [Value::from(study_plan_item_ids.to_vec())],
        )
        .await
        .map_err(|e| RepositoryError::database_operation(format!("删除作业条目关联失败: {e}")))
    }
}

/// 学习目标与条目关联仓储
#[derive(Debug, Clone, Copy, Default)]
pub struct LoStudyPlanItemRepo;

impl LoStudyPlanItemRepo {
    pub async fn bulk_insert<C>(&self, db: &C, items: &[LoStudyPlanItemModel]) -> Result<u64>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        bulk_upsert(db, LO_ITEM_CONFLICT, items).await.map_err(|e| {
            RepositoryError::database_operation(format!("批量写入学习目标条目关联失败: {e}"))
        })
    }

    pub async fn soft_delete_by_study_plan_item_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        study_plan_item_ids: &[String],
    ) -> Result<u64> {
        exec(
            db,
            "UPDATE lo_study_plan_items SET deleted_at = NOW() \
             WHERE study_plan_item_id = ANY($1) AND deleted_at IS NULL",
            [Value::from(study_plan_item_ids.to_vec())],
        )
        .await
        .map_err(|e| {
            RepositoryError::database_operation(format!("删除学习目标条目关联失败: {e}"))
        })
    }
}
