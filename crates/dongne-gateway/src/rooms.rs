use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use dongne_types::events::ServerEvent;
use dongne_types::models::ChatId;

pub type ConnId = Uuid;

type Sender = mpsc::UnboundedSender<ServerEvent>;

/// Chat-room membership for every open socket.
#[derive(Clone, Default)]
pub struct Rooms {
    inner: Arc<RwLock<RoomsInner>>,
}

#[derive(Default)]
struct RoomsInner {
    /// Every registered connection, joined to a room or not.
    connections: HashMap<ConnId, Sender>,

    /// chat_id -> (conn_id -> sender)
    rooms: HashMap<ChatId, HashMap<ConnId, Sender>>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. Returns (conn_id, receiver) for its outbound events.
    pub async fn register(&self) -> (ConnId, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().await.connections.insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Add a connection to a chat room. Joining twice is a no-op.
    pub async fn join(&self, conn_id: ConnId, chat_id: ChatId) {
        let mut inner = self.inner.write().await;
        let Some(tx) = inner.connections.get(&conn_id).cloned() else {
            return;
        };
        inner.rooms.entry(chat_id).or_default().insert(conn_id, tx);
        debug!("Connection {} joined chat {}", conn_id, chat_id);
    }

    pub async fn leave(&self, conn_id: ConnId, chat_id: ChatId) {
        let mut inner = self.inner.write().await;
        if let Some(members) = inner.rooms.get_mut(&chat_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                inner.rooms.remove(&chat_id);
            }
        }
    }

    /// Forget a connection entirely: every room membership and its sender.
    pub async fn disconnect(&self, conn_id: ConnId) {
        let mut inner = self.inner.write().await;
        inner.connections.remove(&conn_id);
        inner.rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Send an event to every connection in the chat's room. Returns how many
    /// connections it was handed to.
    pub async fn broadcast(&self, chat_id: ChatId, event: ServerEvent) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(&chat_id) else {
            return 0;
        };
        members
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    pub async fn room_size(&self, chat_id: ChatId) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(&chat_id)
            .map_or(0, HashMap::len)
    }
}
