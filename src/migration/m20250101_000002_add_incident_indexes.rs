use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // Listing order
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_incidents_reported
             ON incidents (date_reported DESC, id DESC)",
        )
        .await?;

        // Dashboard location filters
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_incidents_city_barangay
             ON incidents (city, barangay)",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_incidents_type
             ON incidents (incident_type)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("DROP INDEX IF EXISTS idx_incidents_type")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_incidents_city_barangay")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_incidents_reported")
            .await?;

        Ok(())
    }
}
