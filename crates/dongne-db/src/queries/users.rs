use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

use dongne_types::api::UpsertUser;
use dongne_types::models::User;

use super::{OptionalExt, unique_conflict};
use crate::models::{user_at, user_cols};
use crate::{Database, format_ts};

impl Database {
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Insert-or-update keyed by the provider's subject id. `default_location`
    /// only applies to first-time users; profile edits never reset it.
    pub fn upsert_user(&self, user: &UpsertUser, default_location: &str) -> Result<User> {
        let now = format_ts(Utc::now());
        self.with_conn_mut(|conn| {
            let sql = format!(
                "INSERT INTO users (id, email, first_name, last_name, profile_image_url, location)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    profile_image_url = excluded.profile_image_url,
                    updated_at = ?7
                 RETURNING {}",
                user_cols("")
            );
            conn.query_row(
                &sql,
                rusqlite::params![
                    user.id,
                    user.email,
                    user.first_name,
                    user.last_name,
                    user.profile_image_url,
                    default_location,
                    now,
                ],
                |row| user_at(row, 0),
            )
            .map_err(|e| unique_conflict(e, "email"))
        })
    }
}

pub(crate) fn query_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE u.id = ?1", user_cols("u"));
    conn.query_row(&sql, [id], |row| user_at(row, 0)).optional()
}

#[cfg(test)]
mod tests {
    use crate::is_conflict;
    use crate::testutil::open_temp;
    use dongne_types::api::UpsertUser;

    #[test]
    fn upsert_inserts_then_updates_profile() {
        let (_dir, db) = open_temp();
        let first = db
            .upsert_user(
                &UpsertUser {
                    id: "sub-1".into(),
                    email: Some("a@example.com".into()),
                    first_name: Some("Ann".into()),
                    ..Default::default()
                },
                "성수동",
            )
            .unwrap();
        assert_eq!(first.location.as_deref(), Some("성수동"));
        assert!(!first.phone_verified);

        let second = db
            .upsert_user(
                &UpsertUser {
                    id: "sub-1".into(),
                    email: Some("ann@example.com".into()),
                    first_name: Some("Ann".into()),
                    ..Default::default()
                },
                "뚝섬동",
            )
            .unwrap();
        assert_eq!(second.email.as_deref(), Some("ann@example.com"));
        assert_eq!(second.location.as_deref(), Some("성수동"));
        assert_eq!(second.created_at, first.created_at);

        assert_eq!(db.get_user("sub-1").unwrap(), Some(second));
        assert_eq!(db.get_user("nobody").unwrap(), None);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let (_dir, db) = open_temp();
        let mk = |id: &str| UpsertUser {
            id: id.into(),
            email: Some("same@example.com".into()),
            ..Default::default()
        };
        db.upsert_user(&mk("a"), "성수동").unwrap();
        let err = db.upsert_user(&mk("b"), "성수동").unwrap_err();
        assert!(is_conflict(&err));
    }
}
