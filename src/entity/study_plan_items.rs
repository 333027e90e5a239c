//! 学习计划条目实体

use sea_orm::entity::prelude::*;

use crate::errors::Result as RepoResult;
use crate::models::ContentStructure;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "study_plan_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub study_plan_item_id: String,
    pub study_plan_id: String,
    pub available_from: Option<DateTimeWithTimeZone>,
    pub available_to: Option<DateTimeWithTimeZone>,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub end_date: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub content_structure: Option<Json>,
    pub display_order: i32,
    pub copy_study_plan_item_id: Option<String>,
    pub content_structure_flatten: Option<String>,
    pub status: String,
    pub school_date: Option<DateTimeWithTimeZone>,
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

impl Model {
    /// 解析内容结构，列为空时返回 None
    pub fn parsed_content_structure(&self) -> RepoResult<Option<ContentStructure>> {
        self.content_structure
            .clone()
            .map(ContentStructure::from_json)
            .transpose()
    }
}
