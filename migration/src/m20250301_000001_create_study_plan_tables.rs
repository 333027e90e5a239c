use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 学习计划表
        manager
            .create_table(
                Table::create()
                    .table(StudyPlans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(StudyPlans::StudyPlanId).text().not_null())
                    .col(ColumnDef::new(StudyPlans::MasterStudyPlanId).text().null())
                    .col(ColumnDef::new(StudyPlans::Name).text().not_null())
                    .col(ColumnDef::new(StudyPlans::StudyPlanType).text().null())
                    .col(
                        ColumnDef::new(StudyPlans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlans::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(StudyPlans::SchoolId).integer().null())
                    .col(ColumnDef::new(StudyPlans::CourseId).text().null())
                    .col(ColumnDef::new(StudyPlans::BookId).text().null())
                    .col(
                        ColumnDef::new(StudyPlans::Status)
                            .text()
                            .not_null()
                            .default("STUDY_PLAN_STATUS_ACTIVE"),
                    )
                    .col(
                        ColumnDef::new(StudyPlans::TrackSchoolProgress)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(StudyPlans::Grades)
                            .array(ColumnType::Integer)
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("study_plans_pk")
                            .col(StudyPlans::StudyPlanId),
                    )
                    .to_owned(),
            )
            .await?;

        // 学习计划条目表
        manager
            .create_table(
                Table::create()
                    .table(StudyPlanItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StudyPlanItems::StudyPlanItemId)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StudyPlanItems::StudyPlanId).text().not_null())
                    .col(
                        ColumnDef::new(StudyPlanItems::AvailableFrom)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::AvailableTo)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::StartDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::EndDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::ContentStructure)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::CopyStudyPlanItemId)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::ContentStructureFlatten)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::Status)
                            .text()
                            .not_null()
                            .default("STUDY_PLAN_ITEM_STATUS_ACTIVE"),
                    )
                    .col(
                        ColumnDef::new(StudyPlanItems::SchoolDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("study_plan_items_pk")
                            .col(StudyPlanItems::StudyPlanItemId),
                    )
                    .to_owned(),
            )
            .await?;

        // 学生学习计划表
        manager
            .create_table(
                Table::create()
                    .table(StudentStudyPlans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(StudentStudyPlans::StudentId).text().not_null())
                    .col(
                        ColumnDef::new(StudentStudyPlans::StudyPlanId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentStudyPlans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentStudyPlans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentStudyPlans::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StudentStudyPlans::MasterStudyPlanId)
                            .text()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("student_study_plans_pk")
                            .col(StudentStudyPlans::StudentId)
                            .col(StudentStudyPlans::StudyPlanId),
                    )
                    .to_owned(),
            )
            .await?;

        // 课程学习计划关联表
        manager
            .create_table(
                Table::create()
                    .table(CourseStudyPlans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CourseStudyPlans::CourseId).text().not_null())
                    .col(
                        ColumnDef::new(CourseStudyPlans::StudyPlanId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudyPlans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudyPlans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudyPlans::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("course_study_plans_pk")
                            .col(CourseStudyPlans::CourseId)
                            .col(CourseStudyPlans::StudyPlanId),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建索引
        // 同一计划下的内容结构唯一，供同步时 ON CONFLICT 使用
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("study_plan_items_study_plan_id_content_structure_flatten_un")
                    .table(StudyPlanItems::Table)
                    .col(StudyPlanItems::StudyPlanId)
                    .col(StudyPlanItems::ContentStructureFlatten)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_study_plans_master_study_plan_id")
                    .table(StudyPlans::Table)
                    .col(StudyPlans::MasterStudyPlanId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_study_plans_book_id")
                    .table(StudyPlans::Table)
                    .col(StudyPlans::BookId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_study_plan_items_copy_study_plan_item_id")
                    .table(StudyPlanItems::Table)
                    .col(StudyPlanItems::CopyStudyPlanItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_student_study_plans_master_study_plan_id")
                    .table(StudentStudyPlans::Table)
                    .col(StudentStudyPlans::MasterStudyPlanId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按照创建的相反顺序删除
        manager
            .drop_table(Table::drop().table(CourseStudyPlans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudentStudyPlans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudyPlanItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudyPlans::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum StudyPlans {
    #[sea_orm(iden = "study_plans")]
    Table,
    StudyPlanId,
    MasterStudyPlanId,
    Name,
    StudyPlanType,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    SchoolId,
    CourseId,
    BookId,
    Status,
    TrackSchoolProgress,
    Grades,
}

#[derive(DeriveIden)]
enum StudyPlanItems {
    #[sea_orm(iden = "study_plan_items")]
    Table,
    StudyPlanItemId,
    StudyPlanId,
    AvailableFrom,
    AvailableTo,
    StartDate,
    EndDate,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    CompletedAt,
    ContentStructure,
    DisplayOrder,
    CopyStudyPlanItemId,
    ContentStructureFlatten,
    Status,
    SchoolDate,
}

#[derive(DeriveIden)]
enum StudentStudyPlans {
    #[sea_orm(iden = "student_study_plans")]
    Table,
    StudentId,
    StudyPlanId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    MasterStudyPlanId,
}

#[derive(DeriveIden)]
enum CourseStudyPlans {
    #[sea_orm(iden = "course_study_plans")]
    Table,
    CourseId,
    StudyPlanId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
