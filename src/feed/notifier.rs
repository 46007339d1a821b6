use actix::Addr;

use crate::feed::server::{Broadcast, FeedServer};

/// Fire-and-forget publication of named events to live subscribers.
/// Implementations must not block and must not report delivery failures.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: &str, payload: serde_json::Value);
}

impl NotificationSink for Addr<FeedServer> {
    fn publish(&self, event: &str, payload: serde_json::Value) {
        self.do_send(Broadcast {
            event: event.to_string(),
            payload,
        });
    }
}
