use anyhow::Result;

use dongne_types::api::LikeToggle;
use dongne_types::models::{ItemId, ItemWithDetails};

use super::items::{details_at, details_select, fill_like_counts};
use crate::{Database, DbError};

impl Database {
    /// Items the user has liked, most recent like first.
    pub fn list_liked_items(&self, user_id: &str) -> Result<Vec<ItemWithDetails>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{}
                 JOIN likes lk ON lk.item_id = i.id
                 WHERE lk.user_id = ?1
                 ORDER BY lk.created_at DESC, lk.id DESC",
                details_select()
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map([user_id], details_at)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            fill_like_counts(conn, &mut rows)?;
            for details in &mut rows {
                details.is_liked = Some(true);
            }
            Ok(rows)
        })
    }

    /// Removes the user's like if one exists, otherwise adds it. Runs under the
    /// writer lock so concurrent toggles cannot leave duplicate rows.
    pub fn toggle_like(&self, user_id: &str, item_id: ItemId) -> Result<LikeToggle> {
        self.with_conn_mut(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1)",
                [item_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(DbError::NotFound("Item").into());
            }

            let removed = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND item_id = ?2",
                rusqlite::params![user_id, item_id],
            )?;
            if removed > 0 {
                return Ok(LikeToggle { is_liked: false });
            }

            conn.execute(
                "INSERT INTO likes (user_id, item_id) VALUES (?1, ?2)",
                rusqlite::params![user_id, item_id],
            )?;
            Ok(LikeToggle { is_liked: true })
        })
    }
}
