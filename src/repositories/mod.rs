//! 仓储层
//!
//! 每个仓储是无状态的单元结构体，方法接收调用方提供的连接或事务，
//! 因此同一组调用既可以直接在连接池上执行，也可以放进同一个事务。

pub mod assignments;
pub mod course_study_plans;
pub mod enrollments;
pub mod student_study_plans;
pub mod student_submissions;
pub mod study_plan_items;
pub mod study_plans;

#[cfg(test)]
mod fixtures;

pub use assignments::{AssignmentRepo, AssignmentStudyPlanItemRepo, LoStudyPlanItemRepo};
pub use course_study_plans::CourseStudyPlanRepo;
pub use enrollments::{
    ClassStudentRepo, CourseClassRepo, CourseStudentAccessPathRepo, CourseStudentRepo,
};
pub use student_study_plans::StudentStudyPlanRepo;
pub use student_submissions::StudentSubmissionRepo;
pub use study_plan_items::StudyPlanItemRepo;
pub use study_plans::StudyPlanRepo;
