use crate::types::{AppError, ChatHistoryItem, ChatMessage, Result};
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection};
use std::path::Path;

/// Default number of exchanges returned by [`ChatHistoryStore::chat_history`].
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Default number of exchanges used as conversational context.
pub const DEFAULT_CONTEXT_LIMIT: u32 = 10;

/// Persistent chat history in a libsql database.
///
/// Each row is one exchange: the user's message and the twin's reply, tagged
/// with the session (the authenticated username).
pub struct ChatHistoryStore {
    conn: Connection,
}

impl ChatHistoryStore {
    /// Opens the store for `url`.
    ///
    /// `libsql://`, `http://` and `https://` URLs connect to a remote Turso
    /// database and need an auth token. Anything else is a local file path,
    /// or `:memory:`.
    pub async fn connect(url: &str, auth_token: Option<String>) -> Result<Self> {
        let is_remote = ["libsql://", "http://", "https://"]
            .iter()
            .any(|scheme| url.starts_with(scheme));

        if is_remote {
            let token = auth_token.ok_or_else(|| {
                AppError::Database("TURSO_AUTH_TOKEN is required for remote databases".to_string())
            })?;
            Self::new_remote(url.to_string(), token).await
        } else {
            Self::new_local(url).await
        }
    }

    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        Self::with_connection(conn).await
    }

    pub async fn new_local(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        // In-memory databases live only as long as their connection, so the
        // store keeps a single one.
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        Self::with_connection(conn).await
    }

    /// Convenience constructor for tests.
    pub async fn new_memory() -> Result<Self> {
        Self::new_local(":memory:").await
    }

    async fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS chat_messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_message TEXT NOT NULL,
                    assistant_response TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    session_id TEXT NOT NULL DEFAULT 'default'
                )",
                (),
            )
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to create chat_messages table: {}", e))
            })?;

        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_chat_messages_session
                 ON chat_messages (session_id, id)",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create session index: {}", e)))?;

        Ok(())
    }

    /// Records one exchange and returns its row id.
    pub async fn save_message(
        &self,
        user_message: &str,
        assistant_response: &str,
        session_id: &str,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO chat_messages (user_message, assistant_response, timestamp, session_id)
                 VALUES (?, ?, ?, ?)",
                (user_message, assistant_response, now, session_id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to save message: {}", e)))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// The newest `limit` exchanges of a session, oldest first.
    pub async fn chat_history(&self, session_id: &str, limit: u32) -> Result<Vec<ChatHistoryItem>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_message, assistant_response, timestamp, session_id
                 FROM chat_messages WHERE session_id = ?
                 ORDER BY id DESC LIMIT ?",
                (session_id, limit as i64),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query chat history: {}", e)))?;

        let mut items = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            let timestamp: String = row.get(3).map_err(|e| AppError::Database(e.to_string()))?;

            items.push(ChatHistoryItem {
                id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
                user_message: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
                assistant_response: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
                timestamp: parse_timestamp(&timestamp)?,
                session_id: row.get(4).map_err(|e| AppError::Database(e.to_string()))?,
            });
        }

        items.reverse();
        Ok(items)
    }

    /// Deletes every exchange of a session and returns how many were removed.
    pub async fn clear_history(&self, session_id: &str) -> Result<u64> {
        self.conn
            .execute(
                "DELETE FROM chat_messages WHERE session_id = ?",
                [session_id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to clear chat history: {}", e)))
    }

    /// The last `limit` exchanges flattened into alternating user and
    /// assistant messages, oldest first.
    pub async fn recent_context(&self, session_id: &str, limit: u32) -> Result<Vec<ChatMessage>> {
        let items = self.chat_history(session_id, limit).await?;

        Ok(items
            .into_iter()
            .flat_map(|item| {
                [
                    ChatMessage::user(item.user_message),
                    ChatMessage::assistant(item.assistant_response),
                ]
            })
            .collect())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("Invalid timestamp '{}': {}", value, e)))
}
