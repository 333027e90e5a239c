use serde::{Deserialize, Serialize};

/// 为状态枚举生成字面量常量、`as_str`、`Display` 与 `FromStr`
macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident => $const_name:ident = $literal:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $literal)]
                $variant,
            )+
        }

        impl $name {
            $(pub const $const_name: &'static str = $literal;)+

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $literal,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($literal => Ok($name::$variant),)+
                    _ => Err(format!("无效的{}: {s}", $label)),
                }
            }
        }

        impl From<$name> for sea_orm::Value {
            fn from(status: $name) -> Self {
                sea_orm::Value::from(status.as_str())
            }
        }
    };
}

status_enum! {
    /// 学习计划状态
    StudyPlanStatus, "学习计划状态" {
        Active => ACTIVE = "STUDY_PLAN_STATUS_ACTIVE",
        Archived => ARCHIVED = "STUDY_PLAN_STATUS_ARCHIVED",
    }
}

status_enum! {
    /// 学习计划条目状态
    StudyPlanItemStatus, "学习计划条目状态" {
        Active => ACTIVE = "STUDY_PLAN_ITEM_STATUS_ACTIVE",
        Archived => ARCHIVED = "STUDY_PLAN_ITEM_STATUS_ARCHIVED",
    }
}

status_enum! {
    /// 学习计划类型
    StudyPlanType, "学习计划类型" {
        Course => COURSE = "STUDY_PLAN_TYPE_COURSE",
        Individual => INDIVIDUAL = "STUDY_PLAN_TYPE_INDIVIDUAL",
    }
}

status_enum! {
    /// 提交状态
    SubmissionStatus, "提交状态" {
        NotMarked => NOT_MARKED = "SUBMISSION_STATUS_NOT_MARKED",
        Marked => MARKED = "SUBMISSION_STATUS_MARKED",
        InProgress => IN_PROGRESS = "SUBMISSION_STATUS_IN_PROGRESS",
        Returned => RETURNED = "SUBMISSION_STATUS_RETURNED",
        Resubmit => RESUBMIT = "SUBMISSION_STATUS_RESUBMIT",
    }
}

status_enum! {
    /// 作业类型（列表只关心被排除的任务类型）
    AssignmentType, "作业类型" {
        LearningObjective => LEARNING_OBJECTIVE = "ASSIGNMENT_TYPE_LEARNING_OBJECTIVE",
        Task => TASK = "ASSIGNMENT_TYPE_TASK",
    }
}

status_enum! {
    /// 批量更新条目日期时的字段范围
    UpdateStartEndDateFields, "日期更新字段" {
        All => ALL = "UPDATE_START_END_DATE_FIELDS_ALL",
        StartDate => START_DATE = "UPDATE_START_END_DATE_FIELDS_START_DATE",
        EndDate => END_DATE = "UPDATE_START_END_DATE_FIELDS_END_DATE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_display_and_parse() {
        assert_eq!(
            StudyPlanStatus::Active.to_string(),
            StudyPlanStatus::ACTIVE
        );
        assert_eq!(
            SubmissionStatus::from_str("SUBMISSION_STATUS_RETURNED").unwrap(),
            SubmissionStatus::Returned
        );
        assert!(StudyPlanItemStatus::from_str("ACTIVE").is_err());
    }

    #[test]
    fn test_status_serde_uses_literal() {
        let json = serde_json::to_string(&StudyPlanType::Individual).unwrap();
        assert_eq!(json, "\"STUDY_PLAN_TYPE_INDIVIDUAL\"");
        let parsed: UpdateStartEndDateFields =
            serde_json::from_str("\"UPDATE_START_END_DATE_FIELDS_END_DATE\"").unwrap();
        assert_eq!(parsed, UpdateStartEndDateFields::EndDate);
    }
}
