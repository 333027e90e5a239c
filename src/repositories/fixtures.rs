//! 仓储测试共用的构造函数

use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{IdenStatic, Iterable, MockExecResult, ModelTrait, Value};

use crate::entity::{student_submissions, study_plan_items, study_plans};
use crate::models::{ContentStructure, StudyPlanItemStatus, StudyPlanStatus, SubmissionStatus};

pub fn exec_ok(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

pub fn study_plan(id: &str, master: Option<&str>) -> study_plans::Model {
    let now = Utc::now().fixed_offset();
    study_plans::Model {
        study_plan_id: id.to_string(),
        master_study_plan_id: master.map(str::to_string),
        name: format!("plan {id}"),
        study_plan_type: Some("STUDY_PLAN_TYPE_COURSE".to_string()),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        school_id: Some(1),
        course_id: Some("course-1".to_string()),
        book_id: Some("book-1".to_string()),
        status: StudyPlanStatus::ACTIVE.to_string(),
        track_school_progress: false,
        grades: Some(vec![5]),
    }
}

pub fn study_plan_item(id: &str, study_plan_id: &str) -> study_plan_items::Model {
    let now = Utc::now().fixed_offset();
    let content = ContentStructure {
        course_id: "course-1".into(),
        book_id: "book-1".into(),
        chapter_id: "chapter-1".into(),
        topic_id: "topic-1".into(),
        lo_id: Some(format!("lo-{id}")),
        assignment_id: None,
    };
    study_plan_items::Model {
        study_plan_item_id: id.to_string(),
        study_plan_id: study_plan_id.to_string(),
        available_from: Some(now),
        available_to: None,
        start_date: Some(now),
        end_date: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        completed_at: None,
        content_structure: content.to_json().ok(),
        display_order: 1,
        copy_study_plan_item_id: None,
        content_structure_flatten: Some(content.flatten()),
        status: StudyPlanItemStatus::ACTIVE.to_string(),
        school_date: None,
    }
}

pub fn student_submission(id: &str, item_id: &str) -> student_submissions::Model {
    let now = Utc::now().fixed_offset();
    student_submissions::Model {
        student_submission_id: id.to_string(),
        study_plan_item_id: item_id.to_string(),
        assignment_id: "as-1".to_string(),
        student_id: "student-1".to_string(),
        submission_content: None,
        check_list: None,
        note: None,
        student_submission_grade_id: None,
        status: SubmissionStatus::NOT_MARKED.to_string(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        deleted_by: None,
        editor_id: None,
        complete_date: None,
        duration: None,
        correct_score: None,
        total_score: None,
        understanding_level: None,
        study_plan_id: Some("sp-1".to_string()),
        learning_material_id: Some("as-1".to_string()),
    }
}

/// 把条目模型展开成模拟结果行，便于追加额外列
pub fn item_row(item: &study_plan_items::Model) -> BTreeMap<&'static str, Value> {
    model_row(item)
}

pub fn plan_row(plan: &study_plans::Model) -> BTreeMap<&'static str, Value> {
    model_row(plan)
}

pub fn submission_row(submission: &student_submissions::Model) -> BTreeMap<&'static str, Value> {
    model_row(submission)
}

fn model_row<M: ModelTrait>(model: &M) -> BTreeMap<&'static str, Value> {
    <<M::Entity as sea_orm::EntityTrait>::Column as Iterable>::iter()
        .map(|column| (column.as_str(), model.get(column)))
        .collect()
}
