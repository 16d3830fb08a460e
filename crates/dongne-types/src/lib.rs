//! Wire types shared by the database layer, the REST handlers and the chat gateway.

pub mod api;
pub mod events;
pub mod models;
