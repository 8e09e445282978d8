//! Post Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::{NotSet, Set}, DatabaseConnection, EntityTrait, ModelTrait,
    QueryOrder,
};
use crate::post::entity::{self, Entity as PostEntity, Model as Post, NewPost, PostChanges};
use crate::shared::error::{PlatformError, Result};

pub struct PostRepository {
    db: DatabaseConnection,
}

impl PostRepository {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    /// The author is not looked up first; a dangling `author_id` is
    /// rejected by the foreign key.
    pub async fn insert(&self, post: NewPost) -> Result<Post> {
        let model = entity::ActiveModel {
            id: NotSet,
            title: Set(post.title),
            body: Set(post.body),
            created: Set(post.created.unwrap_or_else(Utc::now)),
            author_id: Set(post.author_id),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Post>> {
        Ok(PostEntity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Post> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Post", id))
    }

    pub async fn list_all(&self) -> Result<Vec<Post>> {
        Ok(PostEntity::find()
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_fields(&self, post: Post, changes: PostChanges) -> Result<Post> {
        let mut model: entity::ActiveModel = post.clone().into();
        if let Some(title) = changes.title {
            model.title = Set(title);
        }
        if let Some(body) = changes.body {
            model.body = Set(body);
        }
        if let Some(created) = changes.created {
            model.created = Set(created);
        }
        if let Some(author_id) = changes.author_id {
            model.author_id = Set(author_id);
        }

        if !model.is_changed() {
            return Ok(post);
        }
        Ok(model.update(&self.db).await?)
    }

    pub async fn delete(&self, post: Post) -> Result<()> {
        post.delete(&self.db).await?;
        Ok(())
    }
}
