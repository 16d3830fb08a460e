use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;

use dongne_types::models::UserId;

use super::OptionalExt;
use crate::{Database, format_ts};

impl Database {
    /// Stores a login session. `sid` should already be hashed by the caller.
    pub fn create_session(&self, sid: &str, user_id: &str, expire: DateTime<Utc>) -> Result<()> {
        let sess = json!({ "userId": user_id }).to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (sid, sess, expire) VALUES (?1, ?2, ?3)
                 ON CONFLICT(sid) DO UPDATE SET sess = excluded.sess, expire = excluded.expire",
                rusqlite::params![sid, sess, format_ts(expire)],
            )?;
            Ok(())
        })
    }

    /// The session's user, or `None` when the session is unknown or expired at `now`.
    pub fn get_session_user(&self, sid: &str, now: DateTime<Utc>) -> Result<Option<UserId>> {
        let sess: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT sess FROM sessions WHERE sid = ?1 AND expire > ?2",
                rusqlite::params![sid, format_ts(now)],
                |row| row.get(0),
            )
            .optional()
        })?;

        let Some(sess) = sess else {
            return Ok(None);
        };
        let doc: serde_json::Value = serde_json::from_str(&sess)?;
        Ok(doc
            .get("userId")
            .and_then(|v| v.as_str())
            .map(str::to_owned))
    }

    pub fn delete_session(&self, sid: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM sessions WHERE sid = ?1", [sid])?;
            Ok(())
        })
    }

    /// Deletes sessions that expired at or before `now`. Returns how many went.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let purged = conn.execute(
                "DELETE FROM sessions WHERE expire <= ?1",
                [format_ts(now)],
            )?;
            Ok(purged)
        })
    }
}
