use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Connection lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Turns a `NotFound` into `Ok(None)` so callers can branch on absence.
pub trait OptionalRecord<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalRecord<T> for StoreResult<T> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Thread-safe SQLite store
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `db_path`
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                first_name TEXT,
                last_name TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS wishlists (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                code TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_wishlists_user ON wishlists(user_id);
            CREATE INDEX IF NOT EXISTS idx_wishlists_code ON wishlists(code);

            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                wishlist_id TEXT NOT NULL,
                user_id TEXT,
                name TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (wishlist_id) REFERENCES wishlists(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_items_wishlist ON items(wishlist_id);
            CREATE INDEX IF NOT EXISTS idx_items_user ON items(user_id);

            CREATE TABLE IF NOT EXISTS wishlist_users (
                id TEXT PRIMARY KEY,
                wishlist_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (wishlist_id, user_id),
                FOREIGN KEY (wishlist_id) REFERENCES wishlists(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_wishlist_users_user ON wishlist_users(user_id);

            CREATE TABLE IF NOT EXISTS user_friends (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                friend_id TEXT NOT NULL,
                request_accepted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (user_id <> friend_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (friend_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- one edge per unordered pair
            CREATE UNIQUE INDEX IF NOT EXISTS idx_user_friends_pair
                ON user_friends (MIN(user_id, friend_id), MAX(user_id, friend_id));

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                user_id TEXT NOT NULL,
                by_user_id TEXT NOT NULL,
                object_id TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (by_user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
            "#,
        )?;
        Ok(())
    }

    // ==================== User Operations ====================

    pub fn create_user(&self, user: &mut User) -> StoreResult<()> {
        let conn = self.conn()?;
        user.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        user.created_at = now;
        user.updated_at = now;

        conn.execute(
            r#"INSERT INTO users (id, username, email, password_hash, first_name, last_name,
               enabled, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                &user.id,
                &user.username,
                &user.email,
                &user.password_hash,
                &user.first_name,
                &user.last_name,
                user.enabled,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| constraint_to_conflict(e, "User"))?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> StoreResult<User> {
        let conn = self.conn()?;
        conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], row_to_user)
            .map_err(|e| not_found(e, format!("User {}", id)))
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .map_err(|e| not_found(e, format!("User {}", username)))
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM users WHERE email = ?1 COLLATE NOCASE",
            params![email],
            row_to_user,
        )
        .map_err(|e| not_found(e, format!("User {}", email)))
    }

    pub fn update_user(&self, user: &mut User) -> StoreResult<()> {
        let conn = self.conn()?;
        user.updated_at = Utc::now();

        let rows = conn
            .execute(
                r#"UPDATE users SET username = ?1, email = ?2, password_hash = ?3, first_name = ?4,
                   last_name = ?5, enabled = ?6, updated_at = ?7 WHERE id = ?8"#,
                params![
                    &user.username,
                    &user.email,
                    &user.password_hash,
                    &user.first_name,
                    &user.last_name,
                    user.enabled,
                    user.updated_at.to_rfc3339(),
                    &user.id,
                ],
            )
            .map_err(|e| constraint_to_conflict(e, "User"))?;

        if rows == 0 {
            return Err(StoreError::NotFound(format!("User {}", user.id)));
        }
        Ok(())
    }

    /// Deletes the user. Owned wishlists, memberships, friend edges and
    /// notifications go with it; claims on other wishlists are released.
    pub fn delete_user(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("User {}", id)));
        }
        Ok(())
    }

    /// Users ordered by first name. `window` is `(limit, offset)`.
    pub fn list_users(&self, window: Option<(i64, i64)>) -> StoreResult<Vec<User>> {
        let conn = self.conn()?;
        let (limit, offset) = window.unwrap_or((-1, 0));
        let mut stmt = conn.prepare(
            r#"SELECT * FROM users ORDER BY first_name ASC, username ASC LIMIT ?1 OFFSET ?2"#,
        )?;
        let rows = stmt.query_map(params![limit, offset], row_to_user)?;
        collect(rows)
    }

    pub fn count_users(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==================== Wishlist Operations ====================

    pub fn create_wishlist(&self, wishlist: &mut Wishlist) -> StoreResult<()> {
        let conn = self.conn()?;
        wishlist.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        wishlist.created_at = now;
        wishlist.updated_at = now;

        conn.execute(
            r#"INSERT INTO wishlists (id, user_id, name, code, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                &wishlist.id,
                &wishlist.user_id,
                &wishlist.name,
                &wishlist.code,
                wishlist.created_at.to_rfc3339(),
                wishlist.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_wishlist(&self, id: &str) -> StoreResult<Wishlist> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM wishlists WHERE id = ?1",
            params![id],
            row_to_wishlist,
        )
        .map_err(|e| not_found(e, format!("Wishlist {}", id)))
    }

    pub fn get_wishlist_by_code(&self, code: &str) -> StoreResult<Wishlist> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM wishlists WHERE code = ?1 ORDER BY rowid LIMIT 1",
            params![code],
            row_to_wishlist,
        )
        .map_err(|e| not_found(e, format!("Wishlist with code {}", code)))
    }

    pub fn list_wishlists_by_owner(&self, user_id: &str) -> StoreResult<Vec<Wishlist>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT * FROM wishlists WHERE user_id = ?1 ORDER BY rowid ASC")?;
        let rows = stmt.query_map(params![user_id], row_to_wishlist)?;
        collect(rows)
    }

    pub fn update_wishlist_code(&self, id: &str, code: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE wishlists SET code = ?1, updated_at = ?2 WHERE id = ?3",
            params![code, Utc::now().to_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Wishlist {}", id)));
        }
        Ok(())
    }

    /// Deletes the wishlist together with its items and memberships
    pub fn delete_wishlist(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM wishlists WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Wishlist {}", id)));
        }
        Ok(())
    }

    // ==================== Membership Operations ====================

    pub fn add_wishlist_user(&self, member: &mut WishlistUser) -> StoreResult<()> {
        let conn = self.conn()?;
        member.id = Uuid::new_v4().to_string();
        member.created_at = Utc::now();

        conn.execute(
            r#"INSERT INTO wishlist_users (id, wishlist_id, user_id, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                &member.id,
                &member.wishlist_id,
                &member.user_id,
                member.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| constraint_to_conflict(e, "Wishlist member"))?;
        Ok(())
    }

    pub fn is_wishlist_member(&self, wishlist_id: &str, user_id: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM wishlist_users WHERE wishlist_id = ?1 AND user_id = ?2",
                params![wishlist_id, user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Members of a wishlist in the order they joined
    pub fn list_wishlist_members(&self, wishlist_id: &str) -> StoreResult<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT u.* FROM users u
               JOIN wishlist_users wu ON wu.user_id = u.id
               WHERE wu.wishlist_id = ?1
               ORDER BY wu.rowid ASC"#,
        )?;
        let rows = stmt.query_map(params![wishlist_id], row_to_user)?;
        collect(rows)
    }

    /// Wishlists the user has been added to
    pub fn list_member_wishlists(&self, user_id: &str) -> StoreResult<Vec<Wishlist>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT w.* FROM wishlists w
               JOIN wishlist_users wu ON wu.wishlist_id = w.id
               WHERE wu.user_id = ?1
               ORDER BY wu.rowid ASC"#,
        )?;
        let rows = stmt.query_map(params![user_id], row_to_wishlist)?;
        collect(rows)
    }

    /// Removes a membership and releases the member's claims on items of
    /// that wishlist in one transaction. Returns the number of released claims.
    pub fn remove_wishlist_user(&self, wishlist_id: &str, user_id: &str) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM wishlist_users WHERE wishlist_id = ?1 AND user_id = ?2",
            params![wishlist_id, user_id],
        )?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!(
                "Member {} of wishlist {}",
                user_id, wishlist_id
            )));
        }

        let released = tx.execute(
            r#"UPDATE items SET user_id = NULL, updated_at = ?1
               WHERE wishlist_id = ?2 AND user_id = ?3"#,
            params![Utc::now().to_rfc3339(), wishlist_id, user_id],
        )?;

        tx.commit()?;
        Ok(released)
    }

    // ==================== Item Operations ====================

    pub fn create_item(&self, item: &mut Item) -> StoreResult<()> {
        let conn = self.conn()?;
        item.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        item.created_at = now;
        item.updated_at = now;

        conn.execute(
            r#"INSERT INTO items (id, wishlist_id, user_id, name, description, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                &item.id,
                &item.wishlist_id,
                &item.user_id,
                &item.name,
                &item.description,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_item(&self, id: &str) -> StoreResult<Item> {
        let conn = self.conn()?;
        conn.query_row("SELECT * FROM items WHERE id = ?1", params![id], row_to_item)
            .map_err(|e| not_found(e, format!("Item {}", id)))
    }

    pub fn list_items(&self, wishlist_id: &str) -> StoreResult<Vec<Item>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT * FROM items WHERE wishlist_id = ?1 ORDER BY rowid ASC")?;
        let rows = stmt.query_map(params![wishlist_id], row_to_item)?;
        collect(rows)
    }

    /// Claims the item for `user_id` unless another user already holds it.
    /// Returns false when the item is held by someone else.
    pub fn claim_item(&self, item_id: &str, user_id: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"UPDATE items SET user_id = ?1, updated_at = ?2
               WHERE id = ?3 AND (user_id IS NULL OR user_id = ?1)"#,
            params![user_id, Utc::now().to_rfc3339(), item_id],
        )?;
        Ok(rows > 0)
    }

    /// Releases the item if it is unclaimed or held by `user_id`.
    /// Returns false when the item is held by someone else.
    pub fn release_item(&self, item_id: &str, user_id: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"UPDATE items SET user_id = NULL, updated_at = ?1
               WHERE id = ?2 AND (user_id IS NULL OR user_id = ?3)"#,
            params![Utc::now().to_rfc3339(), item_id, user_id],
        )?;
        Ok(rows > 0)
    }

    // ==================== Friend Operations ====================

    pub fn create_friend_edge(&self, edge: &mut UserFriend) -> StoreResult<()> {
        let conn = self.conn()?;
        edge.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        edge.created_at = now;
        edge.updated_at = now;

        conn.execute(
            r#"INSERT INTO user_friends (id, user_id, friend_id, request_accepted, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                &edge.id,
                &edge.user_id,
                &edge.friend_id,
                edge.request_accepted,
                edge.created_at.to_rfc3339(),
                edge.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| constraint_to_conflict(e, "Friend edge"))?;
        Ok(())
    }

    /// The edge between two users, whichever of them sent the request
    pub fn find_friend_edge(&self, a: &str, b: &str) -> StoreResult<UserFriend> {
        let conn = self.conn()?;
        conn.query_row(
            r#"SELECT * FROM user_friends
               WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)"#,
            params![a, b],
            row_to_friend,
        )
        .map_err(|e| not_found(e, format!("Friend edge {} / {}", a, b)))
    }

    pub fn accept_friend_edge(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE user_friends SET request_accepted = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Friend edge {}", id)));
        }
        Ok(())
    }

    pub fn delete_friend_edge(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM user_friends WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Friend edge {}", id)));
        }
        Ok(())
    }

    /// Every edge touching the user, in either direction
    pub fn list_friend_edges(&self, user_id: &str) -> StoreResult<Vec<UserFriend>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT * FROM user_friends WHERE user_id = ?1 OR friend_id = ?1
               ORDER BY rowid ASC"#,
        )?;
        let rows = stmt.query_map(params![user_id], row_to_friend)?;
        collect(rows)
    }

    // ==================== Notification Operations ====================

    pub fn create_notification(&self, notification: &mut Notification) -> StoreResult<()> {
        let conn = self.conn()?;
        notification.id = Uuid::new_v4().to_string();
        notification.created_at = Utc::now();

        conn.execute(
            r#"INSERT INTO notifications (id, type, user_id, by_user_id, object_id, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                &notification.id,
                notification.notification_type.as_str(),
                &notification.user_id,
                &notification.by_user_id,
                &notification.object_id,
                notification.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_notification(&self, id: &str) -> StoreResult<Notification> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM notifications WHERE id = ?1",
            params![id],
            row_to_notification,
        )
        .map_err(|e| not_found(e, format!("Notification {}", id)))
    }

    /// Newest first. `window` is `(limit, offset)`.
    pub fn list_notifications(
        &self,
        user_id: &str,
        window: Option<(i64, i64)>,
    ) -> StoreResult<Vec<Notification>> {
        let conn = self.conn()?;
        let (limit, offset) = window.unwrap_or((-1, 0));
        let mut stmt = conn.prepare(
            r#"SELECT * FROM notifications WHERE user_id = ?1
               ORDER BY rowid DESC LIMIT ?2 OFFSET ?3"#,
        )?;
        let rows = stmt.query_map(params![user_id, limit, offset], row_to_notification)?;
        collect(rows)
    }

    pub fn delete_notification(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("Notification {}", id)));
        }
        Ok(())
    }
}

// ==================== Row mapping ====================

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        enabled: row.get("enabled")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
    })
}

fn row_to_wishlist(row: &rusqlite::Row) -> rusqlite::Result<Wishlist> {
    Ok(Wishlist {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        code: row.get("code")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
    })
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get("id")?,
        wishlist_id: row.get("wishlist_id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
    })
}

fn row_to_friend(row: &rusqlite::Row) -> rusqlite::Result<UserFriend> {
    Ok(UserFriend {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        friend_id: row.get("friend_id")?,
        request_accepted: row.get("request_accepted")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
    })
}

fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
    let type_str: String = row.get("type")?;
    let notification_type = type_str.parse::<NotificationType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;

    Ok(Notification {
        id: row.get("id")?,
        notification_type,
        user_id: row.get("user_id")?,
        by_user_id: row.get("by_user_id")?,
        object_id: row.get("object_id")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
    })
}

fn collect<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> StoreResult<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn not_found(e: rusqlite::Error, what: String) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(what),
        _ => StoreError::Database(e),
    }
}

fn constraint_to_conflict(e: rusqlite::Error, what: &str) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, ref msg)
            if err.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(format!(
                "{}: {}",
                what,
                msg.as_deref().unwrap_or("constraint violation")
            ))
        }
        _ => StoreError::Database(e),
    }
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
