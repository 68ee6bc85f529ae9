//! Database migrations.
//!
//! The schema is one raw-SQL migration; later changes append new files here.

pub use sea_orm_migration::prelude::*;

mod m20261019_000001_initial;

/// Applied migrations are recorded here instead of sea-orm's default table.
pub const MIGRATION_TABLE: &str = "mycoguard_migrations";

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20261019_000001_initial::Migration)]
    }

    fn migration_table_name() -> DynIden {
        Alias::new(MIGRATION_TABLE).into_iden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_by_name() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|m| m.name().to_string())
            .collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "m20261019_000001_initial");
    }
}
