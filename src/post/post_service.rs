use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use validator::Validate;

use crate::feed::model::{ChangeNotification, POSTS_EVENT, PostAction};
use crate::feed::notifier::NotificationSink;
use crate::post::post_model::{ImageSource, Post, PostInput, PostPage, PostResponse, PostView};
use crate::post::post_store::PostStore;
use crate::user::model::CreatorSummary;
use crate::utils::error::CustomError;
use crate::utils::helpers::POSTS_PER_PAGE;
use crate::utils::uploads::{FileUpload, FileValidator, ImageStore};

const POST_NOT_FOUND: &str = "Could not find post!";
const NOT_OWNER: &str = "You are not allowed to edit this post!";

/// Post lifecycle: list, create, fetch, update and delete, keeping the
/// owner's back-references and the image files in step with the posts.
pub struct PostService {
    store: Arc<dyn PostStore>,
    images: ImageStore,
    notifier: Arc<dyn NotificationSink>,
    validator: FileValidator,
}

impl PostService {
    pub fn new(
        store: Arc<dyn PostStore>,
        images: ImageStore,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        PostService {
            store,
            images,
            notifier,
            validator: FileValidator::images(),
        }
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Largest image upload worth buffering
    pub fn max_image_bytes(&self) -> usize {
        self.validator.max_file_size
    }

    pub async fn list_posts(&self, page: u64) -> Result<PostPage, CustomError> {
        let page = page.max(1);
        let skip = (page - 1).saturating_mul(POSTS_PER_PAGE);

        let total_count = self.store.count_posts().await?;
        let items = self.store.list_posts(skip, POSTS_PER_PAGE).await?;

        Ok(PostPage { items, total_count })
    }

    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        image: Option<FileUpload>,
        user_id: ObjectId,
    ) -> Result<(Post, CreatorSummary), CustomError> {
        let input = validate_input(title, content)?;
        let file = self.accepted_image(image).ok_or_else(no_image)?;

        let image_url = self.images.save(&file).await?;

        match self.persist_new_post(input, image_url.clone(), user_id).await {
            Ok(created) => Ok(created),
            Err(e) => {
                self.images.remove(&image_url).await;
                Err(e)
            }
        }
    }

    async fn persist_new_post(
        &self,
        input: PostInput,
        image_url: String,
        user_id: ObjectId,
    ) -> Result<(Post, CreatorSummary), CustomError> {
        let post = Post::new(input.title, input.content, image_url, user_id);
        self.store.insert_post(&post).await?;

        let creator = match self.store.find_user(&user_id).await {
            Ok(Some(user)) => user.summary(),
            Ok(None) => {
                self.discard_post(&post.id).await;
                return Err(unknown_creator(&user_id));
            }
            Err(e) => {
                self.discard_post(&post.id).await;
                return Err(e);
            }
        };

        match self.store.add_post_to_user(&user_id, &post.id).await {
            Ok(true) => {}
            Ok(false) => {
                self.discard_post(&post.id).await;
                return Err(unknown_creator(&user_id));
            }
            Err(e) => {
                self.discard_post(&post.id).await;
                return Err(e);
            }
        }

        log::info!("Post {} created by {}", post.id, user_id);
        self.notify(PostAction::Create, PostView::populated(&post, &creator));

        Ok((post, creator))
    }

    /// Undo an insert whose owner link could not be written
    async fn discard_post(&self, post_id: &ObjectId) {
        if let Err(e) = self.store.delete_post(post_id).await {
            log::error!("Failed to roll back post {}: {}", post_id, e);
        }
    }

    pub async fn get_post(&self, id: &str) -> Result<Post, CustomError> {
        let post_id = parse_post_id(id)?;
        self.store
            .find_post(&post_id)
            .await?
            .ok_or_else(|| CustomError::NotFoundError(POST_NOT_FOUND.to_string()))
    }

    pub async fn update_post(
        &self,
        id: &str,
        title: &str,
        content: &str,
        image: Option<ImageSource>,
        user_id: ObjectId,
    ) -> Result<Post, CustomError> {
        let input = validate_input(title, content)?;

        let (image_url, uploaded) = match image {
            Some(ImageSource::Uploaded(file)) => {
                let file = self.accepted_image(Some(file)).ok_or_else(no_image)?;
                (self.images.save(&file).await?, true)
            }
            Some(ImageSource::Existing(locator)) if !locator.trim().is_empty() => {
                (locator.trim().to_string(), false)
            }
            _ => return Err(no_image()),
        };

        let result = self.apply_update(id, input, &image_url, uploaded, user_id).await;
        if result.is_err() && uploaded {
            self.images.remove(&image_url).await;
        }
        result
    }

    async fn apply_update(
        &self,
        id: &str,
        input: PostInput,
        image_url: &str,
        uploaded: bool,
        user_id: ObjectId,
    ) -> Result<Post, CustomError> {
        let post = self.get_post(id).await?;
        if post.creator != user_id {
            return Err(CustomError::ForbiddenError(NOT_OWNER.to_string()));
        }

        // a kept locator may only name this post's own stored file
        if !uploaded && !self.keeps_own_image(&post, image_url).await {
            log::info!("Post {} update named foreign image locator '{}'", post.id, image_url);
            return Err(no_image());
        }

        let updated = self
            .store
            .update_post(&post.id, &input.title, &input.content, image_url)
            .await?
            .ok_or_else(|| CustomError::NotFoundError(POST_NOT_FOUND.to_string()))?;

        if post.image_url != image_url {
            self.images.remove(&post.image_url).await;
        }

        log::info!("Post {} updated by {}", post.id, user_id);
        self.notify(PostAction::Update, PostResponse::from(&updated));

        Ok(updated)
    }

    async fn keeps_own_image(&self, post: &Post, locator: &str) -> bool {
        post.image_url == locator && self.images.contains(locator).await
    }

    pub async fn delete_post(&self, id: &str, user_id: ObjectId) -> Result<(), CustomError> {
        let post = self.get_post(id).await?;
        if post.creator != user_id {
            return Err(CustomError::ForbiddenError(NOT_OWNER.to_string()));
        }

        self.images.remove(&post.image_url).await;

        if !self.store.delete_post(&post.id).await? {
            return Err(CustomError::NotFoundError(POST_NOT_FOUND.to_string()));
        }

        match self.store.remove_post_from_user(&post.creator, &post.id).await {
            Ok(true) => {}
            Ok(false) => log::warn!("Owner {} of deleted post {} not found", post.creator, post.id),
            Err(e) => {
                log::error!("Post {} deleted but owner back-reference remains", post.id);
                return Err(e);
            }
        }

        log::info!("Post {} deleted by {}", post.id, user_id);
        self.notify(PostAction::Delete, post.id.to_hex());

        Ok(())
    }

    /// Uploads that fail the image rules are treated as absent
    fn accepted_image(&self, image: Option<FileUpload>) -> Option<FileUpload> {
        let file = image?;
        match self.validator.validate(&file) {
            Ok(()) => Some(file),
            Err(reason) => {
                log::info!("Rejected upload '{}': {}", file.file_name, reason);
                None
            }
        }
    }

    fn notify<P: Serialize>(&self, action: PostAction, post: P) {
        match serde_json::to_value(ChangeNotification { action, post }) {
            Ok(payload) => self.notifier.publish(POSTS_EVENT, payload),
            Err(e) => log::error!("Failed to encode {:?} notification: {}", action, e),
        }
    }
}

/// The token named a user the store does not know
fn unknown_creator(user_id: &ObjectId) -> CustomError {
    log::error!("Creator {} of a new post does not exist", user_id);
    CustomError::InternalServerError("User not found".to_string())
}

fn no_image() -> CustomError {
    CustomError::MissingImageError("No image provided!".to_string())
}

/// A malformed id cannot name a stored post
fn parse_post_id(id: &str) -> Result<ObjectId, CustomError> {
    ObjectId::parse_str(id).map_err(|_| CustomError::NotFoundError(POST_NOT_FOUND.to_string()))
}

fn validate_input(title: &str, content: &str) -> Result<PostInput, CustomError> {
    let input = PostInput::new(title, content);
    input.validate().map_err(|errors| {
        let mut details: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        details.sort();
        CustomError::ValidationError(format!("Validation failed! {}", details.join("; ")))
    })?;
    Ok(input)
}
