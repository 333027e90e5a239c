use serde::{Deserialize, Serialize};

use crate::errors::{RepositoryError, Result};

/// 学习计划条目在课程内容树中的位置
///
/// `lo_id` 与 `assignment_id` 二选一，序列化时省略为空的一方。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStructure {
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub book_id: String,
    #[serde(default)]
    pub chapter_id: String,
    #[serde(default)]
    pub topic_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lo_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<String>,
}

impl ContentStructure {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| RepositoryError::serialization(format!("内容结构解析失败: {e}")))
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| RepositoryError::serialization(format!("内容结构序列化失败: {e}")))
    }

    /// 学习资料 id：非空的 `lo_id`，否则 `assignment_id`
    pub fn learning_material_id(&self) -> Option<&str> {
        match self.lo_id.as_deref() {
            Some(lo_id) if !lo_id.is_empty() => Some(lo_id),
            _ => self.assignment_id.as_deref().filter(|id| !id.is_empty()),
        }
    }

    /// 扁平化键，同一学习计划内唯一
    ///
    /// `book::{book}topic::{topic}chapter::{chapter}course::{course}lo::{lo}`，
    /// 作业条目以 `assignment::{id}` 结尾。
    pub fn flatten(&self) -> String {
        let head = format!(
            "book::{}topic::{}chapter::{}course::{}",
            self.book_id, self.topic_id, self.chapter_id, self.course_id
        );
        match (self.lo_id.as_deref(), self.assignment_id.as_deref()) {
            (Some(lo_id), _) if !lo_id.is_empty() => format!("{head}lo::{lo_id}"),
            (_, Some(assignment_id)) => format!("{head}assignment::{assignment_id}"),
            _ => head,
        }
    }
}
