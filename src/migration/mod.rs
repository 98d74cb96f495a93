use sea_orm_migration::prelude::*;

mod m20250101_000001_create_incidents_table;
mod m20250101_000002_add_incident_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_incidents_table::Migration),
            Box::new(m20250101_000002_add_incident_indexes::Migration),
        ]
    }
}
