//! 课程学习计划关联实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "course_study_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub study_plan_id: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::study_plans::Entity",
        from = "Column::StudyPlanId",
        to = "super::study_plans::Column::StudyPlanId"
    )]
    StudyPlan,
}

impl Related<super::study_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudyPlan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
