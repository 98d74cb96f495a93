use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Incidents {
    Table,
    Id,
    ReporterId,
    IncidentType,
    Description,
    Barangay,
    City,
    Status,
    SeverityLevel,
    Latitude,
    Longitude,
    Coordinates,
    AreaHa,
    Photos,
    Videos,
    DateReported,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Incidents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Incidents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Incidents::ReporterId).integer().not_null())
                    .col(
                        ColumnDef::new(Incidents::IncidentType)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Incidents::Description).text().not_null())
                    .col(ColumnDef::new(Incidents::Barangay).string_len(100).null())
                    .col(ColumnDef::new(Incidents::City).string_len(100).null())
                    .col(
                        ColumnDef::new(Incidents::Status)
                            .string_len(20)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(Incidents::SeverityLevel).string_len(20).null())
                    .col(ColumnDef::new(Incidents::Latitude).double().null())
                    .col(ColumnDef::new(Incidents::Longitude).double().null())
                    .col(ColumnDef::new(Incidents::Coordinates).text().null())
                    .col(ColumnDef::new(Incidents::AreaHa).double().null())
                    .col(ColumnDef::new(Incidents::Photos).text().null())
                    .col(ColumnDef::new(Incidents::Videos).text().null())
                    .col(
                        ColumnDef::new(Incidents::DateReported)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Incidents::Table).to_owned())
            .await
    }
}
