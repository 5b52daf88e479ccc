//! SQLite persistence layer.
//!
//! Owns the schema plus the chat mutations the socket relay performs.
//! Route handlers run their own queries against the shared connection;
//! the helpers here exist because the relay and the chat routes touch
//! the same tables and must agree on their shape.

use rusqlite::{Connection, OptionalExtension, Result};
use std::sync::Mutex;

pub struct Database(pub Mutex<Connection>);

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self(Mutex::new(conn)))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self(Mutex::new(conn)))
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habits (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            description TEXT,
            frequency TEXT NOT NULL DEFAULT 'daily',
            reminder_time TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS partners (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            partner_id TEXT NOT NULL REFERENCES users(id),
            status TEXT NOT NULL DEFAULT 'pending',
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS challenges (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            created_by TEXT NOT NULL REFERENCES users(id),
            starts_at INTEGER NOT NULL,
            ends_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS coach_notes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            habit_id TEXT REFERENCES habits(id),
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chats (
            id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chat_participants (
            chat_id TEXT NOT NULL REFERENCES chats(id),
            user_id TEXT NOT NULL,
            joined_at INTEGER NOT NULL,
            PRIMARY KEY (chat_id, user_id)
        );

        -- Transient typing set; the primary key rules out duplicate entries.
        CREATE TABLE IF NOT EXISTS chat_typing (
            chat_id TEXT NOT NULL REFERENCES chats(id),
            user_id TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            PRIMARY KEY (chat_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            chat_id TEXT NOT NULL REFERENCES chats(id),
            sender_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS message_reads (
            message_id TEXT NOT NULL REFERENCES messages(id),
            user_id TEXT NOT NULL,
            read_at INTEGER NOT NULL,
            PRIMARY KEY (message_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_habits_user_id ON habits(user_id);
        CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id);
        CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);
        CREATE INDEX IF NOT EXISTS idx_chat_participants_user_id ON chat_participants(user_id);
        ",
    )
}

pub fn chat_exists(conn: &Connection, chat_id: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row("SELECT id FROM chats WHERE id = ?1", [chat_id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

/// Current typing set for a chat, in insertion order.
pub fn typing_users(conn: &Connection, chat_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM chat_typing WHERE chat_id = ?1 ORDER BY started_at, user_id",
    )?;
    let users = stmt
        .query_map([chat_id], |row| row.get(0))?
        .collect::<Result<Vec<String>>>()?;
    Ok(users)
}

/// Add a user to the typing set. Returns false when already present.
pub fn add_typing_user(conn: &Connection, chat_id: &str, user_id: &str) -> Result<bool> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT OR IGNORE INTO chat_typing (chat_id, user_id, started_at) VALUES (?1, ?2, ?3)",
        (chat_id, user_id, now),
    )?;
    Ok(conn.changes() > 0)
}

/// Remove a user from the typing set. No-op when absent.
pub fn remove_typing_user(conn: &Connection, chat_id: &str, user_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM chat_typing WHERE chat_id = ?1 AND user_id = ?2",
        (chat_id, user_id),
    )?;
    Ok(())
}

pub fn message_in_chat(conn: &Connection, chat_id: &str, message_id: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT id FROM messages WHERE id = ?1 AND chat_id = ?2",
            (message_id, chat_id),
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Add a user to a message's reader set. Returns false when already present.
pub fn add_message_reader(conn: &Connection, message_id: &str, user_id: &str) -> Result<bool> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at) VALUES (?1, ?2, ?3)",
        (message_id, user_id, now),
    )?;
    Ok(conn.changes() > 0)
}

/// Reader set for a message, in read order.
pub fn message_readers(conn: &Connection, message_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM message_reads WHERE message_id = ?1 ORDER BY read_at, user_id",
    )?;
    let readers = stmt
        .query_map([message_id], |row| row.get(0))?
        .collect::<Result<Vec<String>>>()?;
    Ok(readers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO chats (id, created_at, updated_at) VALUES ('c1', 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
             VALUES ('m1', 'c1', 'u1', 'hello', 0)",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_chat_exists() {
        let conn = test_conn();
        assert!(chat_exists(&conn, "c1").unwrap());
        assert!(!chat_exists(&conn, "missing").unwrap());
    }

    #[test]
    fn test_add_typing_user_is_idempotent() {
        let conn = test_conn();
        assert!(add_typing_user(&conn, "c1", "u1").unwrap());
        assert!(!add_typing_user(&conn, "c1", "u1").unwrap());
        assert_eq!(typing_users(&conn, "c1").unwrap(), vec!["u1"]);
    }

    #[test]
    fn test_typing_set_preserves_insertion_order() {
        let conn = test_conn();
        add_typing_user(&conn, "c1", "u1").unwrap();
        add_typing_user(&conn, "c1", "u2").unwrap();
        assert_eq!(typing_users(&conn, "c1").unwrap(), vec!["u1", "u2"]);
    }

    #[test]
    fn test_remove_typing_user_absent_is_noop() {
        let conn = test_conn();
        add_typing_user(&conn, "c1", "u1").unwrap();
        remove_typing_user(&conn, "c1", "u9").unwrap();
        assert_eq!(typing_users(&conn, "c1").unwrap(), vec!["u1"]);
    }

    #[test]
    fn test_remove_typing_user() {
        let conn = test_conn();
        add_typing_user(&conn, "c1", "u1").unwrap();
        remove_typing_user(&conn, "c1", "u1").unwrap();
        assert!(typing_users(&conn, "c1").unwrap().is_empty());
    }

    #[test]
    fn test_message_reader_set_deduplicates() {
        let conn = test_conn();
        assert!(add_message_reader(&conn, "m1", "u2").unwrap());
        assert!(!add_message_reader(&conn, "m1", "u2").unwrap());
        assert_eq!(message_readers(&conn, "m1").unwrap(), vec!["u2"]);
    }

    #[test]
    fn test_message_in_chat_checks_both_ids() {
        let conn = test_conn();
        assert!(message_in_chat(&conn, "c1", "m1").unwrap());
        assert!(!message_in_chat(&conn, "c1", "m9").unwrap());
        assert!(!message_in_chat(&conn, "other", "m1").unwrap());
    }
}
