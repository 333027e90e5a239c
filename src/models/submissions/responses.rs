use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DbErr, FromQueryResult, QueryResult};

use crate::entity::student_submissions;

/// 提交及其所在课程与条目的起止时间
///
/// 起止时间取主计划条目与学生副本中较晚更新的一方。
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSubmissionInfo {
    pub submission: student_submissions::Model,
    pub course_id: Option<String>,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub end_date: Option<DateTimeWithTimeZone>,
}

impl FromQueryResult for StudentSubmissionInfo {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        Ok(Self {
            submission: student_submissions::Model::from_query_result(res, pre)?,
            course_id: res.try_get(pre, "course_id")?,
            start_date: res.try_get(pre, "start_date")?,
            end_date: res.try_get(pre, "end_date")?,
        })
    }
}
