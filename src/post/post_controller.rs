use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::middleware::auth::get_user_id_from_request;
use crate::post::post_form::extract_post_form;
use crate::post::post_model::{CreatorView, PopulatedPostResponse, PostResponse};
use crate::post::post_service::PostService;
use crate::utils::error::CustomError;
use crate::utils::helpers::{parse_page, service_name};
use crate::utils::uploads::IMAGE_DIR;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// List posts, two per page
/// GET /feed/posts?page=N
pub async fn get_posts(
    post_service: web::Data<PostService>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, CustomError> {
    let page = parse_page(query.page.as_deref());
    let result = post_service.list_posts(page).await?;

    let posts: Vec<_> = result.items.iter().map(PopulatedPostResponse::from).collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Posts fetched successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "posts": posts,
        "totalItems": result.total_count,
    })))
}

/// Create a post from a multipart form
/// POST /feed/posts
pub async fn create_post(
    req: HttpRequest,
    post_service: web::Data<PostService>,
    payload: Multipart,
) -> Result<HttpResponse, CustomError> {
    let user_id = get_user_id_from_request(&req)?;
    let form = extract_post_form(payload, post_service.max_image_bytes()).await?;

    let (post, creator) = post_service
        .create_post(&form.title, &form.content, form.image_file, user_id)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Post was created successfully!",
        "httpStatusCode": 201,
        "service": service_name(),
        "post": PostResponse::from(&post),
        "creator": CreatorView::from(&creator),
    })))
}

/// GET /feed/posts/{id}
pub async fn get_post(
    post_id: web::Path<String>,
    post_service: web::Data<PostService>,
) -> Result<HttpResponse, CustomError> {
    let post = post_service.get_post(&post_id.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Post fetched successfully",
        "httpStatusCode": 200,
        "service": service_name(),
        "post": PostResponse::from(&post),
    })))
}

/// Replace title, content and image of an owned post
/// PUT /feed/posts/{id}
pub async fn update_post(
    req: HttpRequest,
    post_id: web::Path<String>,
    post_service: web::Data<PostService>,
    payload: Multipart,
) -> Result<HttpResponse, CustomError> {
    let user_id = get_user_id_from_request(&req)?;
    let form = extract_post_form(payload, post_service.max_image_bytes()).await?;
    let title = form.title.clone();
    let content = form.content.clone();

    let post = post_service
        .update_post(&post_id.into_inner(), &title, &content, form.image_source(), user_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Post updated!",
        "httpStatusCode": 200,
        "service": service_name(),
        "post": PostResponse::from(&post),
    })))
}

/// DELETE /feed/posts/{id}
pub async fn delete_post(
    req: HttpRequest,
    post_id: web::Path<String>,
    post_service: web::Data<PostService>,
) -> Result<HttpResponse, CustomError> {
    let user_id = get_user_id_from_request(&req)?;
    post_service.delete_post(&post_id.into_inner(), user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Post deleted successfully!",
        "httpStatusCode": 200,
        "service": service_name(),
    })))
}

/// Serve a stored image by file name
/// GET /images/{file}
pub async fn get_image(
    file: web::Path<String>,
    post_service: web::Data<PostService>,
) -> Result<HttpResponse, CustomError> {
    let locator = format!("{}/{}", IMAGE_DIR, file.into_inner());
    let path = post_service
        .images()
        .resolve(&locator)
        .ok_or_else(|| CustomError::NotFoundError("Image not found".to_string()))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CustomError::NotFoundError("Image not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            "image/jpeg"
        }
        _ => "application/octet-stream",
    };

    Ok(HttpResponse::Ok().content_type(content_type).body(bytes))
}
