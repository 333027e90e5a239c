//! 课程学生访问路径实体（校区维度）

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "course_students_access_paths")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_student_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub location_id: String,
    pub course_id: String,
    pub student_id: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course_students::Entity",
        from = "Column::CourseStudentId",
        to = "super::course_students::Column::CourseStudentId"
    )]
    CourseStudent,
}

impl Related<super::course_students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseStudent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
