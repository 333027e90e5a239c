use sea_orm::{DbErr, FromQueryResult, QueryResult};

use crate::entity::{study_plan_items, study_plans};

/// 复制学习计划的返回行
#[derive(Debug, Clone, FromQueryResult)]
pub struct CopiedStudyPlan {
    pub study_plan_id: String,
    pub master_study_plan_id: Option<String>,
}

/// 学生条目副本的身份
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct StudyPlanIdentity {
    pub study_plan_id: String,
    pub student_id: String,
    pub learning_material_id: String,
    pub study_plan_item_id: String,
}

/// 学习计划附带（可能为空的）学生 id
#[derive(Debug, Clone, PartialEq)]
pub struct StudyPlanCombineStudentId {
    pub study_plan: study_plans::Model,
    pub student_id: Option<String>,
}

impl FromQueryResult for StudyPlanCombineStudentId {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        Ok(Self {
            study_plan: study_plans::Model::from_query_result(res, pre)?,
            student_id: res.try_get(pre, "student_id")?,
        })
    }
}

/// 学生的学习计划
#[derive(Debug, Clone, PartialEq)]
pub struct StudentStudyPlan {
    pub study_plan: study_plans::Model,
    pub student_id: String,
}

impl FromQueryResult for StudentStudyPlan {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        Ok(Self {
            study_plan: study_plans::Model::from_query_result(res, pre)?,
            student_id: res.try_get(pre, "student_id")?,
        })
    }
}

/// 学习计划及其（左连接得到的）条目
///
/// 计划下没有匹配条目时 `item` 为空。计划列以 `sp_` 前缀返回，避免与条目列重名。
#[derive(Debug, Clone, PartialEq)]
pub struct StudyPlanItemInfo {
    pub item: Option<study_plan_items::Model>,
    pub study_plan_id: String,
    pub master_study_plan_id: Option<String>,
    pub book_id: Option<String>,
    pub course_id: Option<String>,
}

impl FromQueryResult for StudyPlanItemInfo {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        let item_id: Option<String> = res.try_get(pre, "study_plan_item_id")?;
        let item = match item_id {
            Some(_) => Some(study_plan_items::Model::from_query_result(res, pre)?),
            None => None,
        };

        Ok(Self {
            item,
            study_plan_id: res.try_get(pre, "sp_study_plan_id")?,
            master_study_plan_id: res.try_get(pre, "sp_master_study_plan_id")?,
            book_id: res.try_get(pre, "sp_book_id")?,
            course_id: res.try_get(pre, "sp_course_id")?,
        })
    }
}
