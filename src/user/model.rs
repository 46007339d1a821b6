use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Stored user. `posts` is a back-reference list; `Post::creator` is the
/// authoritative owner link.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub posts: Vec<ObjectId>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            email: email.into(),
            posts: Vec::new(),
        }
    }

    pub fn summary(&self) -> CreatorSummary {
        CreatorSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Populated view of a post's creator
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CreatorSummary {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
}
