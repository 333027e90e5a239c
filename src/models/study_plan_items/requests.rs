use serde::Deserialize;

/// 班级内某条目的学生副本计数条件
#[derive(Debug, Clone, Deserialize)]
pub struct CountStudentStudyPlanItemsInClassFilter {
    pub class_id: String,
    pub study_plan_item_id: String,
    /// 为真时只统计已完成的副本
    pub is_completed: bool,
}

/// 条目组合筛选，数组为空表示不限制
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyPlanItemArgs {
    pub study_plan_ids: Option<Vec<String>>,
    pub topic_ids: Option<Vec<String>>,
    pub assignment_ids: Option<Vec<String>>,
    pub lo_ids: Option<Vec<String>>,
    /// 只返回当前处于开放时间窗内的条目
    pub available_date_filter: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterStudyPlanItemArgs {
    pub study_plan_id: String,
    pub topic_id: String,
    pub assignment_id: Option<String>,
    pub lo_id: Option<String>,
}

/// 通过主计划、学习资料（和学生）定位条目
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StudyPlanItemIdentity {
    pub study_plan_id: String,
    pub learning_material_id: String,
    pub student_id: Option<String>,
}
