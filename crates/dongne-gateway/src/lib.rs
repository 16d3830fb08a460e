//! Real-time chat fan-out over WebSocket.

pub mod connection;
pub mod rooms;

pub use connection::handle_socket;
pub use rooms::{ConnId, Rooms};
