use super::post_controller::{create_post, delete_post, get_image, get_post, get_posts, update_post};
use crate::middleware::auth::verify_token;
use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

pub fn post_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/feed")
            .wrap(HttpAuthentication::bearer(verify_token))
            .route("/posts", web::get().to(get_posts))
            .route("/posts", web::post().to(create_post))
            .route("/posts/{id}", web::get().to(get_post))
            .route("/posts/{id}", web::put().to(update_post))
            .route("/posts/{id}", web::delete().to(delete_post)),
    );
    cfg.route("/images/{file}", web::get().to(get_image));
}
