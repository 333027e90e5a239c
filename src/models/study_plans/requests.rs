use serde::Deserialize;

/// 按课程分页查询学习计划
///
/// 游标为上一页最后一条的 `(name, study_plan_id)`，两者都为空时从头开始。
#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveStudyPlanByCourseArgs {
    pub course_id: String,
    pub limit: u32,
    pub study_plan_name: Option<String>,
    pub study_plan_id: Option<String>,
}

/// 学习计划与教材的对应
#[derive(Debug, Clone, Deserialize)]
pub struct StudyPlanBook {
    pub study_plan_id: String,
    pub book_id: String,
}

/// 学习计划条目信息查询条件，字段为空表示不过滤
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyPlanItemInfoArgs {
    pub book_ids: Option<Vec<String>>,
    pub lo_ids: Option<Vec<String>>,
    pub assignment_ids: Option<Vec<String>>,
}

// 学生学习计划列表参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListStudentStudyPlansArgs {
    pub student_ids: Vec<String>,
    pub course_id: Option<String>,
    pub limit: u32,
    /// 上一页最后一条的 study_plan_id
    pub offset: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub book_ids: Option<Vec<String>>,
    pub grades: Option<Vec<i32>>,
}
