//! 预导入模块，方便使用

pub use super::assignment_study_plan_items::{
    Entity as AssignmentStudyPlanItems, Model as AssignmentStudyPlanItemModel,
};
pub use super::assignments::{Entity as Assignments, Model as AssignmentModel};
pub use super::class_students::{Entity as ClassStudents, Model as ClassStudentModel};
pub use super::course_classes::{Entity as CourseClasses, Model as CourseClassModel};
pub use super::course_students::{Entity as CourseStudents, Model as CourseStudentModel};
pub use super::course_students_access_paths::{
    Entity as CourseStudentsAccessPaths, Model as CourseStudentAccessPathModel,
};
pub use super::course_study_plans::{Entity as CourseStudyPlans, Model as CourseStudyPlanModel};
pub use super::lo_study_plan_items::{
    Entity as LoStudyPlanItems, Model as LoStudyPlanItemModel,
};
pub use super::student_study_plans::{
    Entity as StudentStudyPlans, Model as StudentStudyPlanModel,
};
pub use super::student_submissions::{
    Entity as StudentSubmissions, Model as StudentSubmissionModel,
};
pub use super::study_plan_items::{Entity as StudyPlanItems, Model as StudyPlanItemModel};
pub use super::study_plans::{Entity as StudyPlans, Model as StudyPlanModel};
pub use super::users::{Entity as Users, Model as UserModel};
