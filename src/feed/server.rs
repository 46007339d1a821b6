use crate::feed::model::ServerMessage;
use actix::prelude::*;
use std::collections::HashMap;

/// Register a session for one event name
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub session_id: String,
    pub event: String,
    pub addr: Recipient<WsMessage>,
}

/// Drop a session from the registry
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub session_id: String,
}

/// Publish an event to the sessions subscribed to it
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Broadcast {
    pub event: String,
    pub payload: serde_json::Value,
}

#[cfg(test)]
#[derive(Message)]
#[rtype(result = "usize")]
pub struct SessionCount;

/// WebSocket message wrapper
#[derive(Message)]
#[rtype(result = "()")]
pub struct WsMessage(pub String);

struct Subscriber {
    event: String,
    addr: Recipient<WsMessage>,
}

/// Tracks live sessions and fans each event out to its subscribers
pub struct FeedServer {
    sessions: HashMap<String, Subscriber>,
}

impl FeedServer {
    pub fn new() -> Self {
        FeedServer {
            sessions: HashMap::new(),
        }
    }

    /// Deliver an event frame to every session subscribed to `event`,
    /// returning how many were reached
    fn fan_out(&self, event: &str, data: serde_json::Value) -> usize {
        let frame = ServerMessage::Event {
            event: event.to_string(),
            data,
        };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to encode '{}' broadcast: {}", event, e);
                return 0;
            }
        };

        let mut reached = 0;
        for subscriber in self.sessions.values().filter(|s| s.event == event) {
            subscriber.addr.do_send(WsMessage(json.clone()));
            reached += 1;
        }
        reached
    }
}

impl Default for FeedServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for FeedServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for FeedServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        log::info!("Feed session {} subscribed to '{}'", msg.session_id, msg.event);

        let greeting = ServerMessage::Connected {
            session_id: msg.session_id.clone(),
        };
        match serde_json::to_string(&greeting) {
            Ok(json) => msg.addr.do_send(WsMessage(json)),
            Err(e) => log::error!("Failed to encode greeting: {}", e),
        }

        self.sessions.insert(
            msg.session_id,
            Subscriber {
                event: msg.event,
                addr: msg.addr,
            },
        );
    }
}

impl Handler<Disconnect> for FeedServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        if self.sessions.remove(&msg.session_id).is_some() {
            log::info!("Feed session {} disconnected", msg.session_id);
        }
    }
}

impl Handler<Broadcast> for FeedServer {
    type Result = ();

    fn handle(&mut self, msg: Broadcast, _: &mut Context<Self>) {
        let reached = self.fan_out(&msg.event, msg.payload);
        log::debug!("Broadcast '{}' reached {} session(s)", msg.event, reached);
    }
}

#[cfg(test)]
impl Handler<SessionCount> for FeedServer {
    type Result = usize;

    fn handle(&mut self, _: SessionCount, _: &mut Context<Self>) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Collects whatever the server pushes to it
    struct Inbox {
        received: Arc<Mutex<Vec<String>>>,
    }

    impl Actor for Inbox {
        type Context = Context<Self>;
    }

    impl Handler<WsMessage> for Inbox {
        type Result = ();

        fn handle(&mut self, msg: WsMessage, _: &mut Context<Self>) {
            self.received.lock().unwrap().push(msg.0);
        }
    }

    async fn subscribe(server: &Addr<FeedServer>, id: &str, event: &str) -> Arc<Mutex<Vec<String>>> {
        let received = Arc::new(Mutex::new(Vec::new()));
        let inbox = Inbox {
            received: received.clone(),
        }
        .start();
        server
            .send(Connect {
                session_id: id.to_string(),
                event: event.to_string(),
                addr: inbox.recipient(),
            })
            .await
            .unwrap();
        received
    }

    #[actix_web::test]
    async fn broadcast_reaches_only_subscribers_of_the_event() {
        let server = FeedServer::new().start();
        let first = subscribe(&server, "s0", "posts").await;
        let second = subscribe(&server, "s1", "posts").await;
        let other = subscribe(&server, "s2", "comments").await;
        assert_eq!(server.send(SessionCount).await.unwrap(), 3);

        server
            .send(Broadcast {
                event: "posts".into(),
                payload: json!({ "action": "create" }),
            })
            .await
            .unwrap();
        // let the inboxes drain their mailboxes
        actix_web::rt::time::sleep(std::time::Duration::from_millis(20)).await;

        for inbox in [&first, &second] {
            let frames = inbox.lock().unwrap();
            assert_eq!(frames.len(), 2, "connected frame plus one event");
            let greeting: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
            assert_eq!(greeting["type"], "connected");
            let event: serde_json::Value = serde_json::from_str(&frames[1]).unwrap();
            assert_eq!(event["type"], "event");
            assert_eq!(event["event"], "posts");
            assert_eq!(event["data"]["action"], "create");
        }
        assert_eq!(other.lock().unwrap().len(), 1, "greeting only");

        server
            .send(Disconnect {
                session_id: "s0".into(),
            })
            .await
            .unwrap();
        assert_eq!(server.send(SessionCount).await.unwrap(), 2);
    }
}
