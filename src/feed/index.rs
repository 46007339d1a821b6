use super::controller::ws_feed;
use actix_web::web;

pub fn feed_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/socket", web::get().to(ws_feed));
}
