use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::post::post_model::{Post, PostWithCreator};
use crate::post::post_store::PostStore;
use crate::user::model::User;
use crate::utils::error::CustomError;

#[derive(Default)]
struct Tables {
    /// Insertion order doubles as creation order
    posts: Vec<Post>,
    users: HashMap<ObjectId, User>,
}

/// Process-local store for development and tests
#[derive(Default)]
pub struct InMemoryPostStore {
    tables: RwLock<Tables>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn count_posts(&self) -> Result<u64, CustomError> {
        Ok(self.tables.read().await.posts.len() as u64)
    }

    async fn list_posts(&self, skip: u64, limit: u64) -> Result<Vec<PostWithCreator>, CustomError> {
        let tables = self.tables.read().await;
        let items = tables
            .posts
            .iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|post| PostWithCreator {
                post: post.clone(),
                creator: tables.users.get(&post.creator).map(User::summary),
            })
            .collect();
        Ok(items)
    }

    async fn insert_post(&self, post: &Post) -> Result<(), CustomError> {
        self.tables.write().await.posts.push(post.clone());
        Ok(())
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<Post>, CustomError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| &p.id == id).cloned())
    }

    async fn update_post(
        &self,
        id: &ObjectId,
        title: &str,
        content: &str,
        image_url: &str,
    ) -> Result<Option<Post>, CustomError> {
        let mut tables = self.tables.write().await;
        let Some(post) = tables.posts.iter_mut().find(|p| &p.id == id) else {
            return Ok(None);
        };

        post.title = title.to_string();
        post.content = content.to_string();
        post.image_url = image_url.to_string();
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: &ObjectId) -> Result<bool, CustomError> {
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| &p.id != id);
        Ok(tables.posts.len() < before)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, CustomError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn add_post_to_user(&self, user_id: &ObjectId, post_id: &ObjectId) -> Result<bool, CustomError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(user_id) {
            Some(user) => {
                user.posts.push(*post_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_post_from_user(
        &self,
        user_id: &ObjectId,
        post_id: &ObjectId,
    ) -> Result<bool, CustomError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(user_id) {
            Some(user) => {
                user.posts.retain(|p| p != post_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
