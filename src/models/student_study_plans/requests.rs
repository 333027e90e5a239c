use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Deserialize;

/// 学生可学习内容查询条件，`student_id` 之外的字段为空表示不过滤
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListStudentAvailableContentsArgs {
    pub student_id: String,
    pub study_plan_ids: Option<Vec<String>>,
    /// 只保留该时刻处于开放时间窗内的条目
    pub offset: Option<DateTimeWithTimeZone>,
    pub book_id: Option<String>,
    pub chapter_id: Option<String>,
    pub topic_id: Option<String>,
    pub course_id: Option<String>,
}

/// 学生名下学习计划分页，按 study_plan_id 倒序
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListStudyPlansArgs {
    pub student_id: String,
    pub course_id: Option<String>,
    pub school_id: Option<i32>,
    pub limit: u32,
    /// 上一页最后一条的 study_plan_id
    pub offset: Option<String>,
}

/// 学生条目列表参数
///
/// `now` 决定开放时间窗与截止判断。游标字段为上一页最后一条的
/// `(start_date, display_order, study_plan_item_id)`，各列表只使用其中与排序相关的部分。
#[derive(Debug, Clone, Deserialize)]
pub struct ListStudyPlanItemsArgs {
    pub student_id: String,
    pub limit: u32,
    pub now: DateTimeWithTimeZone,
    pub course_ids: Option<Vec<String>>,
    pub study_plan_id: Option<String>,
    #[serde(default)]
    pub include_completed: bool,

    pub offset: Option<DateTimeWithTimeZone>,
    pub study_plan_item_id: Option<String>,
    pub display_order: Option<i32>,
}

impl ListStudyPlanItemsArgs {
    pub fn new(student_id: impl Into<String>, now: DateTimeWithTimeZone, limit: u32) -> Self {
        Self {
            student_id: student_id.into(),
            limit,
            now,
            course_ids: None,
            study_plan_id: None,
            include_completed: false,
            offset: None,
            study_plan_item_id: None,
            display_order: None,
        }
    }
}
