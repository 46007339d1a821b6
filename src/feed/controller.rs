use actix::Addr;
use actix_web::{HttpRequest, HttpResponse, web};
use actix_web_actors::ws;

use crate::feed::server::FeedServer;
use crate::feed::session::FeedSession;

/// WebSocket subscription to post changes
/// GET /socket
pub async fn ws_feed(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<FeedServer>>,
) -> Result<HttpResponse, actix_web::Error> {
    log::info!(
        "Feed subscription from {}",
        req.peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );

    let session = FeedSession::posts(server.get_ref().clone());
    ws::start(session, &req, stream)
}
