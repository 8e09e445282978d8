//! Post Entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,

    pub body: String,

    pub created: DateTimeUtc,

    pub author_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::user::entity::Entity",
        from = "Column::AuthorId",
        to = "crate::user::entity::Column::Id"
    )]
    Author,
}

impl Related<crate::user::entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields of a post to be created. `created` falls back to the current time.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub author_id: i32,
    pub created: Option<DateTime<Utc>>,
}

/// Overlay applied by `PostRepository::update_fields`
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub body: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub author_id: Option<i32>,
}
