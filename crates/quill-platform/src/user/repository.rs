//! User Repository

use sea_orm::{
    ActiveModelTrait, ActiveValue::{NotSet, Set}, ColumnTrait, DatabaseConnection, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder,
};
use crate::role::entity::Model as Role;
use crate::user::entity::{self, Entity as UserEntity, Model as User, NewUser, UserChanges};
use crate::shared::error::{PlatformError, Result};

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub async fn insert(&self, user: NewUser) -> Result<User> {
        let model = entity::ActiveModel {
            id: NotSet,
            username: Set(user.username),
            password: Set(user.password_hash),
            role_id: Set(user.role_id),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>> {
        Ok(UserEntity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("User", id))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(UserEntity::find()
            .filter(entity::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        Ok(UserEntity::find()
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// All users paired with their role, in one joined query.
    pub async fn list_all_with_role(&self) -> Result<Vec<(User, Option<Role>)>> {
        Ok(UserEntity::find()
            .find_also_related(crate::role::entity::Entity)
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_fields(&self, user: User, changes: UserChanges) -> Result<User> {
        let mut model: entity::ActiveModel = user.clone().into();
        if let Some(username) = changes.username {
            model.username = Set(username);
        }
        if let Some(password_hash) = changes.password_hash {
            model.password = Set(password_hash);
        }
        if let Some(role_id) = changes.role_id {
            model.role_id = Set(role_id);
        }

        if !model.is_changed() {
            return Ok(user);
        }
        Ok(model.update(&self.db).await?)
    }

    pub async fn delete(&self, user: User) -> Result<()> {
        user.delete(&self.db).await?;
        Ok(())
    }
}
