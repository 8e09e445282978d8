//! Role Repository

use sea_orm::{
    ActiveModelTrait, ActiveValue::{NotSet, Set}, DatabaseConnection, EntityTrait,
    ModelTrait, QueryOrder,
};
use crate::role::entity::{self, Entity as RoleEntity, Model as Role, NewRole, RoleChanges};
use crate::shared::error::{PlatformError, Result};

pub struct RoleRepository {
    db: DatabaseConnection,
}

impl RoleRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn insert(&self, role: NewRole) -> Result<Role> {
        let model = entity::ActiveModel {
            id: NotSet,
            name: Set(role.name),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Role>> {
        Ok(RoleEntity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Role> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Role", id))
    }

    pub async fn list_all(&self) -> Result<Vec<Role>> {
        Ok(RoleEntity::find()
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_fields(&self, role: Role, changes: RoleChanges) -> Result<Role> {
        let mut model: entity::ActiveModel = role.clone().into();
        if let Some(name) = changes.name {
            model.name = Set(name);
        }

        if !model.is_changed() {
            return Ok(role);
        }
        Ok(model.update(&self.db).await?)
    }

    pub async fn delete(&self, role: Role) -> Result<()> {
        role.delete(&self.db).await?;
        Ok(())
    }
}
