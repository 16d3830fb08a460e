//! Column lists and row mappers shared by the query modules.
//!
//! Joined queries select several entities side by side, so every mapper takes
//! the index of its first column and the `*_COLUMNS` counts tell the caller
//! where the next entity starts.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use dongne_types::models::{Category, Chat, Item, Message, User};

pub const USER_COLUMNS: usize = 10;
pub const CATEGORY_COLUMNS: usize = 4;
pub const ITEM_COLUMNS: usize = 13;
pub const CHAT_COLUMNS: usize = 6;
pub const MESSAGE_COLUMNS: usize = 6;

pub fn user_cols(alias: &str) -> String {
    prefixed(
        alias,
        &[
            "id",
            "email",
            "first_name",
            "last_name",
            "profile_image_url",
            "nickname",
            "location",
            "phone_verified",
            "created_at",
            "updated_at",
        ],
    )
}

pub fn category_cols(alias: &str) -> String {
    prefixed(alias, &["id", "name", "slug", "created_at"])
}

pub fn item_cols(alias: &str) -> String {
    prefixed(
        alias,
        &[
            "id",
            "seller_id",
            "title",
            "description",
            "price",
            "category_id",
            "region_code",
            "images",
            "status",
            "views",
            "is_negotiable",
            "created_at",
            "updated_at",
        ],
    )
}

pub fn chat_cols(alias: &str) -> String {
    prefixed(
        alias,
        &["id", "item_id", "seller_id", "buyer_id", "created_at", "updated_at"],
    )
}

pub fn message_cols(alias: &str) -> String {
    prefixed(
        alias,
        &["id", "chat_id", "sender_id", "content", "message_type", "created_at"],
    )
}

/// An empty alias yields bare column names, as `RETURNING` requires.
fn prefixed(alias: &str, cols: &[&str]) -> String {
    cols.iter()
        .map(|c| {
            if alias.is_empty() {
                c.to_string()
            } else {
                format!("{alias}.{c}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn user_at(row: &Row, base: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(base)?,
        email: row.get(base + 1)?,
        first_name: row.get(base + 2)?,
        last_name: row.get(base + 3)?,
        profile_image_url: row.get(base + 4)?,
        nickname: row.get(base + 5)?,
        location: row.get(base + 6)?,
        phone_verified: row.get(base + 7)?,
        created_at: ts_at(row, base + 8)?,
        updated_at: ts_at(row, base + 9)?,
    })
}

pub fn category_at(row: &Row, base: usize) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        slug: row.get(base + 2)?,
        created_at: ts_at(row, base + 3)?,
    })
}

pub fn item_at(row: &Row, base: usize) -> rusqlite::Result<Item> {
    let images: String = row.get(base + 7)?;
    let images: Vec<String> =
        serde_json::from_str(&images).map_err(|e| conversion(base + 7, e))?;
    let status: String = row.get(base + 8)?;

    Ok(Item {
        id: row.get(base)?,
        seller_id: row.get(base + 1)?,
        title: row.get(base + 2)?,
        description: row.get(base + 3)?,
        price: row.get(base + 4)?,
        category_id: row.get(base + 5)?,
        region_code: row.get(base + 6)?,
        images,
        status: status.parse().map_err(|e: String| conversion(base + 8, e))?,
        views: row.get(base + 9)?,
        is_negotiable: row.get(base + 10)?,
        created_at: ts_at(row, base + 11)?,
        updated_at: ts_at(row, base + 12)?,
    })
}

pub fn chat_at(row: &Row, base: usize) -> rusqlite::Result<Chat> {
    Ok(Chat {
        id: row.get(base)?,
        item_id: row.get(base + 1)?,
        seller_id: row.get(base + 2)?,
        buyer_id: row.get(base + 3)?,
        created_at: ts_at(row, base + 4)?,
        updated_at: ts_at(row, base + 5)?,
    })
}

pub fn message_at(row: &Row, base: usize) -> rusqlite::Result<Message> {
    let message_type: String = row.get(base + 4)?;
    Ok(Message {
        id: row.get(base)?,
        chat_id: row.get(base + 1)?,
        sender_id: row.get(base + 2)?,
        content: row.get(base + 3)?,
        message_type: message_type
            .parse()
            .map_err(|e: String| conversion(base + 4, e))?,
        created_at: ts_at(row, base + 5)?,
    })
}

/// Accepts our RFC 3339 text and SQLite's bare `YYYY-MM-DD HH:MM:SS` form.
pub fn ts_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).map_err(|e| conversion(idx, e))
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
}

fn conversion<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}
