mod content_structure;
mod status;

pub use content_structure::ContentStructure;
pub use status::{
    AssignmentType, StudyPlanItemStatus, StudyPlanStatus, StudyPlanType, SubmissionStatus,
    UpdateStartEndDateFields,
};
