//! Schema bootstrap
//!
//! Creates the blog tables from the entity definitions. Existing tables are
//! left alone, so this is safe to run on every start.

use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Schema};
use tracing::info;

use crate::shared::error::Result;
use crate::{post, role, user};

/// Create `role`, `user` and `post` in foreign-key order
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, role::entity::Entity).await?;
    create_table(db, user::entity::Entity).await?;
    create_table(db, post::entity::Entity).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();

    db.execute(backend.build(&statement)).await?;
    Ok(())
}
