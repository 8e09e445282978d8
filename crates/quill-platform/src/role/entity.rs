//! Role Entity
//!
//! A named role. Users reference exactly one role; the authorization gate
//! compares the role name against the name a route requires.

use sea_orm::entity::prelude::*;

/// Role name granted access to user management.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "role")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::user::entity::Entity")]
    Users,
}

impl Related<crate::user::entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields of a role to be created
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
}

/// Overlay applied by `RoleRepository::update_fields`
#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub name: Option<String>,
}
