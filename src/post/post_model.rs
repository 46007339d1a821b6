use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::user::model::CreatorSummary;
use crate::utils::uploads::FileUpload;

/// Stored post document
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator: ObjectId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(title: String, content: String, image_url: String, creator: ObjectId) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            title,
            content,
            image_url,
            creator,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A post with its creator reference expanded
#[derive(Debug, Clone)]
pub struct PostWithCreator {
    pub post: Post,
    /// `None` when the referenced user no longer exists
    pub creator: Option<CreatorSummary>,
}

/// One page of the listing
#[derive(Debug, Clone)]
pub struct PostPage {
    pub items: Vec<PostWithCreator>,
    pub total_count: u64,
}

/// Title/content as submitted, trimmed before validation
#[derive(Debug, Clone, Validate)]
pub struct PostInput {
    #[validate(length(min = 5, message = "Title must be at least 5 characters"))]
    pub title: String,
    #[validate(length(min = 5, message = "Content must be at least 5 characters"))]
    pub content: String,
}

impl PostInput {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        }
    }
}

/// Where an updated post's image comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    Uploaded(FileUpload),
    Existing(String),
}

// ============================================
// Response views (ids rendered as hex strings)
// ============================================

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CreatorView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

impl From<&CreatorSummary> for CreatorView {
    fn from(summary: &CreatorSummary) -> Self {
        Self {
            id: summary.id.to_hex(),
            name: summary.name.clone(),
        }
    }
}

/// Post as sent to clients; `C` is either the creator id or its summary
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostView<C> {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator: C,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post with its creator as a bare id
pub type PostResponse = PostView<String>;
/// Post with its creator populated (`null` when the user is gone)
pub type PopulatedPostResponse = PostView<Option<CreatorView>>;

impl<C> PostView<C> {
    fn with_creator(post: &Post, creator: C) -> Self {
        Self {
            id: post.id.to_hex(),
            title: post.title.clone(),
            content: post.content.clone(),
            image_url: post.image_url.clone(),
            creator,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl From<&Post> for PostResponse {
    fn from(post: &Post) -> Self {
        PostView::with_creator(post, post.creator.to_hex())
    }
}

impl From<&PostWithCreator> for PopulatedPostResponse {
    fn from(item: &PostWithCreator) -> Self {
        PostView::with_creator(&item.post, item.creator.as_ref().map(CreatorView::from))
    }
}

impl PostView<CreatorView> {
    pub fn populated(post: &Post, creator: &CreatorSummary) -> Self {
        PostView::with_creator(post, CreatorView::from(creator))
    }
}
