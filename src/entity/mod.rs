//! SeaORM 实体定义
//!
//! 每个实体与一张表一一对应，列的声明顺序与迁移一致，
//! 仓储层据此生成字段清单与参数列表。

pub mod prelude;

pub mod assignment_study_plan_items;
pub mod assignments;
pub mod class_students;
pub mod course_classes;
pub mod course_students;
pub mod course_students_access_paths;
pub mod course_study_plans;
pub mod lo_study_plan_items;
pub mod student_study_plans;
pub mod student_submissions;
pub mod study_plan_items;
pub mod study_plans;
pub mod users;
