use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const CURRENT_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial marketplace schema)");
        conn.execute_batch(
            "
            BEGIN;

            -- Login sessions; sess holds a JSON document
            CREATE TABLE sessions (
                sid     TEXT PRIMARY KEY,
                sess    TEXT NOT NULL,
                expire  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_expire ON sessions(expire);

            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT UNIQUE,
                first_name          TEXT,
                last_name           TEXT,
                profile_image_url   TEXT,
                nickname            TEXT,
                location            TEXT,
                phone_verified      INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE categories (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                slug        TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE items (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                seller_id       TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                description     TEXT,
                price           INTEGER NOT NULL,
                category_id     INTEGER NOT NULL REFERENCES categories(id),
                region_code     TEXT NOT NULL,
                images          TEXT NOT NULL DEFAULT '[]',
                status          TEXT NOT NULL DEFAULT 'active',
                views           INTEGER NOT NULL DEFAULT 0,
                is_negotiable   INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_items_listing ON items(status, created_at);

            CREATE TABLE likes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL REFERENCES users(id),
                item_id     INTEGER NOT NULL REFERENCES items(id),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_likes_user_item ON likes(user_id, item_id);
            CREATE INDEX idx_likes_item ON likes(item_id);

            CREATE TABLE chats (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id     INTEGER NOT NULL REFERENCES items(id),
                seller_id   TEXT NOT NULL REFERENCES users(id),
                buyer_id    TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_chats_triple ON chats(item_id, seller_id, buyer_id);
            CREATE INDEX idx_chats_buyer ON chats(buyer_id);

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id         INTEGER NOT NULL REFERENCES chats(id),
                sender_id       TEXT NOT NULL REFERENCES users(id),
                content         TEXT NOT NULL,
                message_type    TEXT NOT NULL DEFAULT 'text',
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_messages_chat ON messages(chat_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", CURRENT_VERSION);
    Ok(())
}
