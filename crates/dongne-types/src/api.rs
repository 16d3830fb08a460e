use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CategoryId, ChatId, ItemId, ItemStatus, MessageType, UserId};

// -- JWT Claims --

/// Bearer token claims. Issued by `POST /api/auth/token` for non-browser clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub exp: usize,
}

/// Body of `POST /api/auth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// -- Users --

/// Profile fields sourced from the identity provider, keyed by the provider's subject id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertUser {
    pub id: UserId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

// -- Categories --

/// Missing fields deserialize as empty so the handler can report them per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

// -- Items --

#[derive(Debug, Clone)]
pub struct NewItem {
    pub seller_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub price: i64,
    pub category_id: CategoryId,
    pub region_code: String,
    pub images: Vec<String>,
    pub status: ItemStatus,
    pub is_negotiable: bool,
}

/// Raw query string of `GET /api/items`. Everything stays text here because
/// search forms submit empty values for fields the user left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuery {
    pub category_id: Option<String>,
    pub region_code: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Resolved listing filter handed to the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub category_id: Option<CategoryId>,
    pub region_code: Option<String>,
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            region_code: None,
            search: None,
            limit: ItemQuery::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ItemQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Page numbers start at 1; blank values count as absent. Numbers that
    /// do not parse are reported per field.
    pub fn into_filter(self) -> Result<ItemFilter, Vec<FieldError>> {
        let mut errors = Vec::new();
        let category_id = number(self.category_id, "categoryId", &mut errors);
        let page: u32 = number(self.page, "page", &mut errors).unwrap_or(1).max(1);
        let limit: u32 = number(self.limit, "limit", &mut errors)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ItemFilter {
            category_id,
            region_code: non_blank(self.region_code),
            search: non_blank(self.search),
            limit,
            offset: (page - 1).saturating_mul(limit),
        })
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn number<T: FromStr>(raw: Option<String>, field: &str, errors: &mut Vec<FieldError>) -> Option<T> {
    let raw = non_blank(raw)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.push(FieldError::new(field, format!("{field} must be a whole number")));
            None
        }
    }
}

// -- Likes --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    pub is_liked: bool,
}

// -- Chats --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub item_id: ItemId,
    pub seller_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    pub message_type: MessageType,
}

// -- Errors --

/// One failed field in a `{message, errors}` validation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
