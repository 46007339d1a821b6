use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, Running, StreamHandler};
use actix_web_actors::ws;
use uuid::Uuid;

use crate::feed::model::{ClientMessage, POSTS_EVENT, ServerMessage};
use crate::feed::server::{Connect, Disconnect, FeedServer, WsMessage};

const PING_EVERY: Duration = Duration::from_secs(5);
const SILENCE_LIMIT: Duration = Duration::from_secs(10);

/// When a subscriber was last heard from
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    last_seen: Instant,
}

impl Liveness {
    pub fn new(now: Instant) -> Self {
        Self { last_seen: now }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }

    pub fn is_silent(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > SILENCE_LIMIT
    }
}

/// Answer to a text frame. Feed sockets are read-only, so the only request
/// understood is a ping.
pub fn reply_to(text: &str, event: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => ServerMessage::Pong,
        Err(e) => ServerMessage::Error {
            message: format!(
                "This socket only streams '{}' events and accepts {{\"type\":\"ping\"}}: {}",
                event, e
            ),
        },
    }
}

/// A websocket subscribed to one feed event
pub struct FeedSession {
    id: String,
    event: &'static str,
    server: Addr<FeedServer>,
    liveness: Liveness,
}

impl FeedSession {
    /// Subscription to post changes
    pub fn posts(server: Addr<FeedServer>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event: POSTS_EVENT,
            server,
            liveness: Liveness::new(Instant::now()),
        }
    }

    fn push(&self, msg: &ServerMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(msg) {
            Ok(json) => ctx.text(json),
            Err(e) => log::error!("Feed session {} could not encode reply: {}", self.id, e),
        }
    }
}

impl Actor for FeedSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(PING_EVERY, |session, ctx| {
            if session.liveness.is_silent(Instant::now()) {
                log::warn!("Dropping silent feed session {}", session.id);
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });

        self.server.do_send(Connect {
            session_id: self.id.clone(),
            event: self.event.to_string(),
            addr: ctx.address().recipient(),
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.server.do_send(Disconnect {
            session_id: self.id.clone(),
        });
        Running::Stop
    }
}

impl Handler<WsMessage> for FeedSession {
    type Result = ();

    fn handle(&mut self, msg: WsMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for FeedSession {
    fn handle(&mut self, frame: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Feed session {} protocol error: {}", self.id, e);
                ctx.stop();
                return;
            }
        };
        self.liveness.touch(Instant::now());

        match frame {
            ws::Message::Ping(bytes) => ctx.pong(&bytes),
            ws::Message::Pong(_) | ws::Message::Nop => {}
            ws::Message::Text(text) => {
                let reply = reply_to(&text, self.event);
                self.push(&reply, ctx);
            }
            ws::Message::Binary(_) | ws::Message::Continuation(_) => {
                let reply = ServerMessage::Error {
                    message: "Only text frames are accepted".to_string(),
                };
                self.push(&reply, ctx);
            }
            ws::Message::Close(reason) => {
                log::info!("Feed session {} closed: {:?}", self.id, reason);
                ctx.close(reason);
                ctx.stop();
            }
        }
    }
}
