use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, Row};

use dongne_types::api::{ItemFilter, NewItem};
use dongne_types::models::{Item, ItemCounts, ItemId, ItemWithDetails};

use super::{OptionalExt, like_pattern, placeholders};
use crate::Database;
use crate::models::{
    ITEM_COLUMNS, USER_COLUMNS, category_at, category_cols, item_at, item_cols, user_at, user_cols,
};

impl Database {
    /// Active listings, newest first. Search matches title or description.
    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<ItemWithDetails>> {
        let pattern = filter.search.as_deref().map(like_pattern);
        self.with_conn(|conn| {
            let sql = format!(
                "{}
                 WHERE i.status = 'active'
                   AND (?1 IS NULL OR i.category_id = ?1)
                   AND (?2 IS NULL OR i.region_code = ?2)
                   AND (?3 IS NULL
                        OR i.title LIKE ?3 ESCAPE '\\'
                        OR i.description LIKE ?3 ESCAPE '\\')
                 ORDER BY i.created_at DESC, i.id DESC
                 LIMIT ?4 OFFSET ?5",
                details_select()
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map(
                    rusqlite::params![
                        filter.category_id,
                        filter.region_code,
                        pattern,
                        filter.limit,
                        filter.offset,
                    ],
                    details_at,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            fill_like_counts(conn, &mut rows)?;
            Ok(rows)
        })
    }

    /// One listing in any status. `viewer` fills in `is_liked`.
    pub fn get_item(&self, id: ItemId, viewer: Option<&str>) -> Result<Option<ItemWithDetails>> {
        self.with_conn(|conn| {
            let Some(mut details) = query_item_details(conn, id)? else {
                return Ok(None);
            };

            let (likes, chats) = conn.query_row(
                "SELECT (SELECT COUNT(*) FROM likes WHERE item_id = ?1),
                        (SELECT COUNT(*) FROM chats WHERE item_id = ?1)",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            details.count = ItemCounts { likes, chats };

            if let Some(user_id) = viewer {
                let liked: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM likes WHERE item_id = ?1 AND user_id = ?2)",
                    rusqlite::params![id, user_id],
                    |row| row.get(0),
                )?;
                details.is_liked = Some(liked);
            } else {
                details.is_liked = Some(false);
            }

            Ok(Some(details))
        })
    }

    pub fn create_item(&self, new: &NewItem) -> Result<Item> {
        let images = serde_json::to_string(&new.images)?;
        self.with_conn_mut(|conn| {
            let sql = format!(
                "INSERT INTO items
                    (seller_id, title, description, price, category_id, region_code,
                     images, status, is_negotiable)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 RETURNING {}",
                item_cols("")
            );
            let item = conn.query_row(
                &sql,
                rusqlite::params![
                    new.seller_id,
                    new.title,
                    new.description,
                    new.price,
                    new.category_id,
                    new.region_code,
                    images,
                    new.status.as_str(),
                    new.is_negotiable,
                ],
                |row| item_at(row, 0),
            )?;
            Ok(item)
        })
    }

    pub fn increment_views(&self, id: ItemId) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE items SET views = views + 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

/// `SELECT ... FROM items i` joined with seller and category.
/// Callers append their own WHERE/ORDER BY; counts start at zero.
pub(crate) fn details_select() -> String {
    format!(
        "SELECT {}, {}, {}
         FROM items i
         JOIN users u ON u.id = i.seller_id
         JOIN categories c ON c.id = i.category_id",
        item_cols("i"),
        user_cols("u"),
        category_cols("c"),
    )
}

pub(crate) fn details_at(row: &Row) -> rusqlite::Result<ItemWithDetails> {
    Ok(ItemWithDetails {
        item: item_at(row, 0)?,
        seller: user_at(row, ITEM_COLUMNS)?,
        category: category_at(row, ITEM_COLUMNS + USER_COLUMNS)?,
        likes: Vec::new(),
        count: ItemCounts::default(),
        is_liked: None,
    })
}

/// One grouped query for the whole page instead of a count per row.
pub(crate) fn fill_like_counts(conn: &Connection, rows: &mut [ItemWithDetails]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "SELECT item_id, COUNT(*) FROM likes WHERE item_id IN ({}) GROUP BY item_id",
        placeholders(rows.len())
    );
    let ids: Vec<ItemId> = rows.iter().map(|d| d.item.id).collect();
    let mut stmt = conn.prepare(&sql)?;
    let counts: HashMap<ItemId, i64> = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<std::result::Result<_, _>>()?;

    for details in rows.iter_mut() {
        details.count.likes = counts.get(&details.item.id).copied().unwrap_or(0);
    }
    Ok(())
}

pub(crate) fn query_item_details(conn: &Connection, id: ItemId) -> Result<Option<ItemWithDetails>> {
    let sql = format!("{} WHERE i.id = ?1", details_select());
    conn.query_row(&sql, [id], details_at).optional()
}
