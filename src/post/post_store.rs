use async_trait::async_trait;
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Document, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection};

use crate::post::post_model::{Post, PostWithCreator};
use crate::user::model::{CreatorSummary, User};
use crate::utils::error::CustomError;

/// Persistence operations the post lifecycle needs. Each call is an
/// independent write; nothing here spans more than one record.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn count_posts(&self) -> Result<u64, CustomError>;

    /// Posts in creation order with their creators populated
    async fn list_posts(&self, skip: u64, limit: u64) -> Result<Vec<PostWithCreator>, CustomError>;

    async fn insert_post(&self, post: &Post) -> Result<(), CustomError>;

    async fn find_post(&self, id: &ObjectId) -> Result<Option<Post>, CustomError>;

    /// Returns the post as stored after the update
    async fn update_post(
        &self,
        id: &ObjectId,
        title: &str,
        content: &str,
        image_url: &str,
    ) -> Result<Option<Post>, CustomError>;

    async fn delete_post(&self, id: &ObjectId) -> Result<bool, CustomError>;

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, CustomError>;

    /// Append `post_id` to the user's back-references
    async fn add_post_to_user(&self, user_id: &ObjectId, post_id: &ObjectId) -> Result<bool, CustomError>;

    async fn remove_post_from_user(
        &self,
        user_id: &ObjectId,
        post_id: &ObjectId,
    ) -> Result<bool, CustomError>;
}

pub struct MongoPostStore {
    posts: Collection<Post>,
    users: Collection<User>,
}

impl MongoPostStore {
    pub fn new(client: &Client, database_name: &str) -> Self {
        let db = client.database(database_name);
        MongoPostStore {
            posts: db.collection::<Post>("posts"),
            users: db.collection::<User>("users"),
        }
    }

    /// Split a `$lookup` result into the post and its (optional) creator
    fn populated_from_document(mut document: Document) -> Result<PostWithCreator, CustomError> {
        let creator = match document.remove("creatorDocs") {
            Some(bson::Bson::Array(docs)) => docs
                .into_iter()
                .next()
                .map(bson::from_bson::<CreatorSummary>)
                .transpose()
                .map_err(|e| {
                    log::error!("Malformed user document: {}", e);
                    CustomError::InternalServerError("Failed to read creator".to_string())
                })?,
            _ => None,
        };

        let post = bson::from_document::<Post>(document).map_err(|e| {
            log::error!("Malformed post document: {}", e);
            CustomError::InternalServerError("Failed to read post".to_string())
        })?;

        Ok(PostWithCreator { post, creator })
    }
}

#[async_trait]
impl PostStore for MongoPostStore {
    async fn count_posts(&self) -> Result<u64, CustomError> {
        Ok(self.posts.count_documents(doc! {}).await?)
    }

    async fn list_posts(&self, skip: u64, limit: u64) -> Result<Vec<PostWithCreator>, CustomError> {
        let pipeline = vec![
            doc! { "$sort": { "_id": 1 } },
            doc! { "$skip": bson_count(skip) },
            doc! { "$limit": bson_count(limit) },
            doc! {
                "$lookup": {
                    "from": "users",
                    "localField": "creator",
                    "foreignField": "_id",
                    "as": "creatorDocs",
                }
            },
        ];

        let documents: Vec<Document> = self.posts.aggregate(pipeline).await?.try_collect().await?;

        documents
            .into_iter()
            .map(Self::populated_from_document)
            .collect()
    }

    async fn insert_post(&self, post: &Post) -> Result<(), CustomError> {
        self.posts.insert_one(post).await?;
        Ok(())
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<Post>, CustomError> {
        Ok(self.posts.find_one(doc! { "_id": id }).await?)
    }

    async fn update_post(
        &self,
        id: &ObjectId,
        title: &str,
        content: &str,
        image_url: &str,
    ) -> Result<Option<Post>, CustomError> {
        let updated_at = bson::to_bson(&Utc::now()).map_err(|e| {
            log::error!("Failed to encode timestamp: {}", e);
            CustomError::InternalServerError("Failed to update post".to_string())
        })?;

        let update = doc! {
            "$set": {
                "title": title,
                "content": content,
                "imageUrl": image_url,
                "updatedAt": updated_at,
            }
        };

        Ok(self
            .posts
            .find_one_and_update(doc! { "_id": id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_post(&self, id: &ObjectId) -> Result<bool, CustomError> {
        let result = self.posts.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, CustomError> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn add_post_to_user(&self, user_id: &ObjectId, post_id: &ObjectId) -> Result<bool, CustomError> {
        let result = self
            .users
            .update_one(doc! { "_id": user_id }, doc! { "$push": { "posts": post_id } })
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn remove_post_from_user(
        &self,
        user_id: &ObjectId,
        post_id: &ObjectId,
    ) -> Result<bool, CustomError> {
        let result = self
            .users
            .update_one(doc! { "_id": user_id }, doc! { "$pull": { "posts": post_id } })
            .await?;
        Ok(result.matched_count > 0)
    }
}

/// Pipeline stages take signed counts; huge values saturate instead of wrapping
fn bson_count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_counts_never_go_negative() {
        assert_eq!(bson_count(0), 0);
        assert_eq!(bson_count(2), 2);
        assert_eq!(bson_count(u64::MAX - 1), i64::MAX);
        assert_eq!(bson_count(1 << 63), i64::MAX);
    }
}
