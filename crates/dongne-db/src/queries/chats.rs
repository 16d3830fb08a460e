use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};

use dongne_types::api::NewMessage;
use dongne_types::models::{Chat, ChatId, ChatWithDetails, ItemId, Message};

use super::{OptionalExt, placeholders};
use crate::models::{
    CHAT_COLUMNS, ITEM_COLUMNS, USER_COLUMNS, chat_at, chat_cols, item_at, item_cols, message_at,
    message_cols, user_at, user_cols,
};
use crate::{Database, DbError, format_ts};

impl Database {
    /// Every chat the user takes part in, most recently active first.
    pub fn list_chats_for_user(&self, user_id: &str) -> Result<Vec<ChatWithDetails>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{}
                 WHERE ch.seller_id = ?1 OR ch.buyer_id = ?1
                 ORDER BY ch.updated_at DESC, ch.id DESC",
                chat_select()
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut chats = stmt
                .query_map([user_id], chat_details_at)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let ids: Vec<ChatId> = chats.iter().map(|c| c.chat.id).collect();
            let mut latest = last_messages(conn, &ids)?;
            for details in &mut chats {
                details.last_message = latest.remove(&details.chat.id);
            }
            Ok(chats)
        })
    }

    /// Returns the chat for this (item, seller, buyer) triple, creating it on first use.
    pub fn get_or_create_chat(&self, item_id: ItemId, seller_id: &str, buyer_id: &str) -> Result<Chat> {
        self.with_conn_mut(|conn| {
            let existing = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM chats ch
                         WHERE ch.item_id = ?1 AND ch.seller_id = ?2 AND ch.buyer_id = ?3
                         ORDER BY ch.id LIMIT 1",
                        chat_cols("ch")
                    ),
                    rusqlite::params![item_id, seller_id, buyer_id],
                    |row| chat_at(row, 0),
                )
                .optional()?;
            if let Some(chat) = existing {
                return Ok(chat);
            }

            let chat = conn.query_row(
                &format!(
                    "INSERT INTO chats (item_id, seller_id, buyer_id) VALUES (?1, ?2, ?3)
                     RETURNING {}",
                    chat_cols("")
                ),
                rusqlite::params![item_id, seller_id, buyer_id],
                |row| chat_at(row, 0),
            )?;
            tracing::debug!(chat_id = chat.id, item_id, "Chat opened");
            Ok(chat)
        })
    }

    pub fn get_chat(&self, id: ChatId) -> Result<Option<Chat>> {
        self.with_conn(|conn| query_chat(conn, id))
    }

    /// A chat with its item, both participants and the full message history.
    pub fn get_chat_with_messages(&self, id: ChatId) -> Result<Option<ChatWithDetails>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE ch.id = ?1", chat_select());
            let Some(mut details) = conn.query_row(&sql, [id], chat_details_at).optional()? else {
                return Ok(None);
            };
            details.messages = query_messages(conn, id)?;
            details.last_message = details.messages.last().cloned();
            Ok(Some(details))
        })
    }

    /// Inserts the message and bumps the chat's `updated_at` in one transaction.
    pub fn create_message(&self, new: &NewMessage) -> Result<Message> {
        let now = format_ts(Utc::now());
        self.with_conn_mut(|conn| {
            if query_chat(conn, new.chat_id)?.is_none() {
                return Err(DbError::NotFound("Chat").into());
            }

            let tx = conn.unchecked_transaction()?;
            let message = tx.query_row(
                &format!(
                    "INSERT INTO messages (chat_id, sender_id, content, message_type)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {}",
                    message_cols("")
                ),
                rusqlite::params![
                    new.chat_id,
                    new.sender_id,
                    new.content,
                    new.message_type.as_str(),
                ],
                |row| message_at(row, 0),
            )?;
            tx.execute(
                "UPDATE chats SET updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now, new.chat_id],
            )?;
            tx.commit()?;
            Ok(message)
        })
    }

    pub fn list_messages(&self, chat_id: ChatId) -> Result<Vec<Message>> {
        self.with_conn(|conn| query_messages(conn, chat_id))
    }
}

fn chat_select() -> String {
    format!(
        "SELECT {}, {}, {}, {}
         FROM chats ch
         JOIN items i ON i.id = ch.item_id
         JOIN users s ON s.id = ch.seller_id
         JOIN users b ON b.id = ch.buyer_id",
        chat_cols("ch"),
        item_cols("i"),
        user_cols("s"),
        user_cols("b"),
    )
}

fn chat_details_at(row: &Row) -> rusqlite::Result<ChatWithDetails> {
    let seller_at = CHAT_COLUMNS + ITEM_COLUMNS;
    Ok(ChatWithDetails {
        chat: chat_at(row, 0)?,
        item: item_at(row, CHAT_COLUMNS)?,
        seller: user_at(row, seller_at)?,
        buyer: user_at(row, seller_at + USER_COLUMNS)?,
        messages: Vec::new(),
        last_message: None,
    })
}

fn query_chat(conn: &Connection, id: ChatId) -> Result<Option<Chat>> {
    let sql = format!("SELECT {} FROM chats ch WHERE ch.id = ?1", chat_cols("ch"));
    conn.query_row(&sql, [id], |row| chat_at(row, 0)).optional()
}

fn query_messages(conn: &Connection, chat_id: ChatId) -> Result<Vec<Message>> {
    let sql = format!(
        "SELECT {} FROM messages m WHERE m.chat_id = ?1 ORDER BY m.created_at, m.id",
        message_cols("m")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([chat_id], |row| message_at(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Newest message per chat for a batch of chats.
fn last_messages(conn: &Connection, chat_ids: &[ChatId]) -> Result<HashMap<ChatId, Message>> {
    if chat_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "SELECT {cols} FROM (
            SELECT {cols}, ROW_NUMBER() OVER (
                PARTITION BY chat_id ORDER BY created_at DESC, id DESC
            ) AS rn
            FROM messages
            WHERE chat_id IN ({ids})
         )
         WHERE rn = 1",
        cols = message_cols(""),
        ids = placeholders(chat_ids.len()),
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(chat_ids.iter()), |row| {
            message_at(row, 0)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|m| (m.chat_id, m)).collect())
}
