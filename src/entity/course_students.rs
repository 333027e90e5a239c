//! 课程学生实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "course_students")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_student_id: String,
    pub course_id: String,
    pub student_id: String,
    pub start_at: Option<DateTimeWithTimeZone>,
    pub end_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::course_students_access_paths::Entity")]
    AccessPaths,
}

impl Related<super::course_students_access_paths::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessPaths.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
