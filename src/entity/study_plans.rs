//! 学习计划实体
//!
//! `master_study_plan_id` 为空的是课程级主计划，学生副本通过该列指向主计划。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "study_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub study_plan_id: String,
    pub master_study_plan_id: Option<String>,
    pub name: String,
    pub study_plan_type: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub school_id: Option<i32>,
    pub course_id: Option<String>,
    pub book_id: Option<String>,
    pub status: String,
    pub track_school_progress: bool,
    pub grades: Option<Vec<i32>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::study_plan_items::Entity")]
    StudyPlanItems,
    #[sea_orm(has_many = "super::student_study_plans::Entity")]
    StudentStudyPlans,
    #[sea_orm(has_many = "super::course_study_plans::Entity")]
    CourseStudyPlans,
}

impl Related<super::study_plan_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudyPlanItems.def()
    }
}

impl Related<super::student_study_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentStudyPlans.def()
    }
}

impl Related<super::course_study_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseStudyPlans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 是否为主计划
    pub fn is_master(&self) -> bool {
        self.master_study_plan_id.is_none()
    }
}
