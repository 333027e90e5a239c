//! 学生提交实体
//!
//! 列表查询读取的是 `student_latest_submissions` 视图，列与本表一致。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "student_submissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_submission_id: String,
    pub study_plan_item_id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub submission_content: Option<Json>,
    pub check_list: Option<Json>,
    pub note: Option<String>,
    pub student_submission_grade_id: Option<String>,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub deleted_by: Option<String>,
    pub editor_id: Option<String>,
    pub complete_date: Option<DateTimeWithTimeZone>,
    pub duration: Option<i32>,
    pub correct_score: Option<f32>,
    pub total_score: Option<f32>,
    pub understanding_level: Option<String>,
    pub study_plan_id: Option<String>,
    pub learning_material_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
