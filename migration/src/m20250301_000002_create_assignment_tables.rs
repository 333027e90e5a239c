use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 每个学生在每个学习计划条目上的最新提交
const CREATE_LATEST_SUBMISSIONS_VIEW: &str = r#"
CREATE OR REPLACE VIEW student_latest_submissions AS
SELECT DISTINCT ON (ss.student_id, ss.study_plan_item_id) ss.*
FROM student_submissions ss
ORDER BY ss.student_id, ss.study_plan_item_id, ss.created_at DESC, ss.student_submission_id DESC
"#;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 作业表
        manager
            .create_table(
                Table::create()
                    .table(Assignments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Assignments::AssignmentId).text().not_null())
                    .col(ColumnDef::new(Assignments::Name).text().not_null())
                    .col(ColumnDef::new(Assignments::Type).text().not_null())
                    .col(ColumnDef::new(Assignments::Status).text().not_null())
                    .col(ColumnDef::new(Assignments::Instruction).text().null())
                    .col(ColumnDef::new(Assignments::MaxGrade).integer().null())
                    .col(
                        ColumnDef::new(Assignments::IsRequiredGrade)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Assignments::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Assignments::TopicId).text().null())
                    .col(ColumnDef::new(Assignments::Content).json_binary().null())
                    .col(
                        ColumnDef::new(Assignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assignments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assignments::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("assignments_pk")
                            .col(Assignments::AssignmentId),
                    )
                    .to_owned(),
            )
            .await?;

        // 作业与学习计划条目关联表
        manager
            .create_table(
                Table::create()
                    .table(AssignmentStudyPlanItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AssignmentStudyPlanItems::AssignmentId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AssignmentStudyPlanItems::StudyPlanItemId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AssignmentStudyPlanItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AssignmentStudyPlanItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AssignmentStudyPlanItems::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("assignment_study_plan_items_pk")
                            .col(AssignmentStudyPlanItems::AssignmentId)
                            .col(AssignmentStudyPlanItems::StudyPlanItemId),
                    )
                    .to_owned(),
            )
            .await?;

        // 学习目标与学习计划条目关联表
        manager
            .create_table(
                Table::create()
                    .table(LoStudyPlanItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LoStudyPlanItems::LoId).text().not_null())
                    .col(
                        ColumnDef::new(LoStudyPlanItems::StudyPlanItemId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoStudyPlanItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoStudyPlanItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoStudyPlanItems::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("lo_study_plan_items_pk")
                            .col(LoStudyPlanItems::LoId)
                            .col(LoStudyPlanItems::StudyPlanItemId),
                    )
                    .to_owned(),
            )
            .await?;

        // 学生提交表
        manager
            .create_table(
                Table::create()
                    .table(StudentSubmissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StudentSubmissions::StudentSubmissionId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentSubmissions::StudyPlanItemId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentSubmissions::AssignmentId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentSubmissions::StudentId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentSubmissions::SubmissionContent)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudentSubmissions::CheckList)
                            .json_binary()
                            .null(),
                    )
                    .col(ColumnDef::new(StudentSubmissions::Note).text().null())
                    .col(
                        ColumnDef::new(StudentSubmissions::StudentSubmissionGradeId)
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(StudentSubmissions::Status).text().not_null())
                    .col(
                        ColumnDef::new(StudentSubmissions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentSubmissions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentSubmissions::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(StudentSubmissions::DeletedBy).text().null())
                    .col(ColumnDef::new(StudentSubmissions::EditorId).text().null())
                    .col(
                        ColumnDef::new(StudentSubmissions::CompleteDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(StudentSubmissions::Duration).integer().null())
                    .col(ColumnDef::new(StudentSubmissions::CorrectScore).float().null())
                    .col(ColumnDef::new(StudentSubmissions::TotalScore).float().null())
                    .col(
                        ColumnDef::new(StudentSubmissions::UnderstandingLevel)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudentSubmissions::StudyPlanId)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudentSubmissions::LearningMaterialId)
                            .text()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("student_submissions_pk")
                            .col(StudentSubmissions::StudentSubmissionId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_student_submissions_study_plan_item_id")
                    .table(StudentSubmissions::Table)
                    .col(StudentSubmissions::StudyPlanItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(CREATE_LATEST_SUBMISSIONS_VIEW)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP VIEW IF EXISTS student_latest_submissions")
            .await?;
        manager
            .drop_table(Table::drop().table(StudentSubmissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LoStudyPlanItems::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(AssignmentStudyPlanItems::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Assignments::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Assignments {
    #[sea_orm(iden = "assignments")]
    Table,
    AssignmentId,
    Name,
    Type,
    Status,
    Instruction,
    MaxGrade,
    IsRequiredGrade,
    DisplayOrder,
    TopicId,
    Content,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum AssignmentStudyPlanItems {
    #[sea_orm(iden = "assignment_study_plan_items")]
    Table,
    AssignmentId,
    StudyPlanItemId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum LoStudyPlanItems {
    #[sea_orm(iden = "lo_study_plan_items")]
    Table,
    LoId,
    StudyPlanItemId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum StudentSubmissions {
    #[sea_orm(iden = "student_submissions")]
    Table,
    StudentSubmissionId,
    StudyPlanItemId,
    AssignmentId,
    StudentId,
    SubmissionContent,
    CheckList,
    Note,
    StudentSubmissionGradeId,
    Status,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    DeletedBy,
    EditorId,
    CompleteDate,
    Duration,
    CorrectScore,
    TotalScore,
    UnderstandingLevel,
    StudyPlanId,
    LearningMaterialId,
}
