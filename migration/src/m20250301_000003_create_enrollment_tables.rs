use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 用户表（仅保存提交列表按姓名筛选所需的字段）
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::UserId).text().not_null())
                    .col(ColumnDef::new(Users::Name).text().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(Index::create().name("users_pk").col(Users::UserId))
                    .to_owned(),
            )
            .await?;

        // 课程学生表
        manager
            .create_table(
                Table::create()
                    .table(CourseStudents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CourseStudents::CourseStudentId)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CourseStudents::CourseId).text().not_null())
                    .col(ColumnDef::new(CourseStudents::StudentId).text().not_null())
                    .col(
                        ColumnDef::new(CourseStudents::StartAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudents::EndAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudents::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("course_students_pk")
                            .col(CourseStudents::CourseStudentId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("course_students_course_id_student_id_un")
                    .table(CourseStudents::Table)
                    .col(CourseStudents::CourseId)
                    .col(CourseStudents::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 课程学生访问路径表（按校区划分可见范围）
        manager
            .create_table(
                Table::create()
                    .table(CourseStudentsAccessPaths::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CourseStudentsAccessPaths::CourseStudentId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudentsAccessPaths::LocationId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudentsAccessPaths::CourseId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudentsAccessPaths::StudentId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudentsAccessPaths::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudentsAccessPaths::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseStudentsAccessPaths::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("course_students_access_paths_pk")
                            .col(CourseStudentsAccessPaths::CourseStudentId)
                            .col(CourseStudentsAccessPaths::LocationId),
                    )
                    .to_owned(),
            )
            .await?;

        // 课程班级关联表
        manager
            .create_table(
                Table::create()
                    .table(CourseClasses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CourseClasses::CourseId).text().not_null())
                    .col(ColumnDef::new(CourseClasses::ClassId).text().not_null())
                    .col(
                        ColumnDef::new(CourseClasses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseClasses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CourseClasses::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("course_classes_pk")
                            .col(CourseClasses::CourseId)
                            .col(CourseClasses::ClassId),
                    )
                    .to_owned(),
            )
            .await?;

        // 班级学生表
        manager
            .create_table(
                Table::create()
                    .table(ClassStudents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ClassStudents::StudentId).text().not_null())
                    .col(ColumnDef::new(ClassStudents::ClassId).text().not_null())
                    .col(
                        ColumnDef::new(ClassStudents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassStudents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassStudents::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("class_students_pk")
                            .col(ClassStudents::StudentId)
                            .col(ClassStudents::ClassId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_class_students_class_id")
                    .table(ClassStudents::Table)
                    .col(ClassStudents::ClassId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClassStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CourseClasses::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(CourseStudentsAccessPaths::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(CourseStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    #[sea_orm(iden = "users")]
    Table,
    UserId,
    Name,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum CourseStudents {
    #[sea_orm(iden = "course_students")]
    Table,
    CourseStudentId,
    CourseId,
    StudentId,
    StartAt,
    EndAt,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum CourseStudentsAccessPaths {
    #[sea_orm(iden = "course_students_access_paths")]
    Table,
    CourseStudentId,
    LocationId,
    CourseId,
    StudentId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum CourseClasses {
    #[sea_orm(iden = "course_classes")]
    Table,
    CourseId,
    ClassId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum ClassStudents {
    #[sea_orm(iden = "class_students")]
    Table,
    StudentId,
    ClassId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
