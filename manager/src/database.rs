use crate::error::{AppError, AppResult};
use crate::models::{
    HelpRequest, HistoryEntry, KnowledgeBaseEntry, RequestStatus, SupervisorResponse,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub type DbConnection = Arc<Mutex<Connection>>;

pub struct Database {
    connection: DbConnection,
}

impl Database {
    pub fn new(db_path: &PathBuf) -> AppResult<Self> {
        // Ensure the database directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        // Enable foreign key constraints (SQLite3 has them disabled by default)
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let database = Database {
            connection: Arc::new(Mutex::new(conn)),
        };

        database.run_migrations()?;

        Ok(database)
    }

    #[allow(dead_code)]
    pub fn connection(&self) -> DbConnection {
        Arc::clone(&self.connection)
    }

    fn run_migrations(&self) -> AppResult<()> {
        let conn = self.lock_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS help_requests (
                id TEXT PRIMARY KEY,
                customer_name TEXT NOT NULL,
                customer_contact TEXT,
                channel TEXT NOT NULL,
                question TEXT NOT NULL,
                status TEXT NOT NULL,
                answer TEXT,
                notes TEXT,
                created_at INTEGER NOT NULL,
                escalated_at INTEGER NOT NULL,
                resolved_at INTEGER,
                history TEXT NOT NULL,
                follow_up_at INTEGER,
                follow_up_reminder_sent INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS supervisor_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id TEXT NOT NULL,
                answer TEXT NOT NULL,
                topic TEXT NOT NULL,
                unresolved INTEGER NOT NULL DEFAULT 0,
                notes TEXT,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (request_id) REFERENCES help_requests (id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS knowledge_base (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_request_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_help_requests_status
             ON help_requests (status)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_help_requests_follow_up
             ON help_requests (status, follow_up_reminder_sent, follow_up_at)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_supervisor_responses_request_id
             ON supervisor_responses (request_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_knowledge_base_updated_at
             ON knowledge_base (updated_at)",
            [],
        )?;

        Ok(())
    }

    fn lock_connection(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|e| AppError::Internal(format!("Failed to acquire database lock: {e}")))
    }

    // Help request operations

    pub fn create_request(&self, request: &HelpRequest) -> AppResult<()> {
        let conn = self.lock_connection()?;
        let history = serde_json::to_string(&request.history)
            .map_err(|e| AppError::Internal(format!("Failed to serialize request history: {e}")))?;

        conn.execute(
            "INSERT INTO help_requests (
                id, customer_name, customer_contact, channel, question, status,
                answer, notes, created_at, escalated_at, resolved_at, history,
                follow_up_at, follow_up_reminder_sent
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                request.id,
                request.customer_name,
                request.customer_contact,
                request.channel,
                request.question,
                request.status,
                request.answer,
                request.notes,
                request.created_at,
                request.escalated_at,
                request.resolved_at,
                history,
                request.follow_up_at,
                request.follow_up_reminder_sent,
            ],
        )?;

        Ok(())
    }

    pub fn get_request(&self, request_id: &str) -> AppResult<HelpRequest> {
        let conn = self.lock_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, customer_name, customer_contact, channel, question, status,
                    answer, notes, created_at, escalated_at, resolved_at, history,
                    follow_up_at, follow_up_reminder_sent
             FROM help_requests WHERE id = ?1",
        )?;

        stmt.query_row(params![request_id], Self::row_to_request)
            .optional()?
            .ok_or_else(|| AppError::RequestNotFound(request_id.to_string()))
    }

    pub fn list_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<HelpRequest>> {
        let conn = self.lock_connection()?;

        let requests = match status {
            Some(status) => {
                let mut stmt = conn.prepare(
                    "SELECT id, customer_name, customer_contact, channel, question, status,
                            answer, notes, created_at, escalated_at, resolved_at, history,
                            follow_up_at, follow_up_reminder_sent
                     FROM help_requests WHERE status = ?1
                     ORDER BY created_at DESC, rowid DESC",
                )?;
                let rows = stmt.query_map(params![status], Self::row_to_request)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, customer_name, customer_contact, channel, question, status,
                            answer, notes, created_at, escalated_at, resolved_at, history,
                            follow_up_at, follow_up_reminder_sent
                     FROM help_requests
                     ORDER BY created_at DESC, rowid DESC",
                )?;
                let rows = stmt.query_map([], Self::row_to_request)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(requests)
    }

    pub fn append_history(&self, request_id: &str, message: &str) -> AppResult<()> {
        let conn = self.lock_connection()?;
        Self::append_history_entry(&conn, request_id, message)
    }

    /// Records the supervisor's answer and flips the request out of pending.
    ///
    /// The request keeps its first `resolved_at` if a supervisor already
    /// responded (or a timeout already stamped it); only the initial
    /// transition sets it.
    pub fn attach_response(
        &self,
        request_id: &str,
        answer: &str,
        topic: &str,
        unresolved: bool,
        notes: Option<&str>,
    ) -> AppResult<SupervisorResponse> {
        let conn = self.lock_connection()?;
        let now = Utc::now().timestamp();
        let status = if unresolved {
            RequestStatus::Unresolved
        } else {
            RequestStatus::Resolved
        };

        let rows = conn.execute(
            "UPDATE help_requests
             SET status = ?1, answer = ?2, notes = ?3,
                 resolved_at = COALESCE(resolved_at, ?4)
             WHERE id = ?5",
            params![status, answer, notes, now, request_id],
        )?;
        if rows == 0 {
            return Err(AppError::RequestNotFound(request_id.to_string()));
        }

        conn.execute(
            "INSERT INTO supervisor_responses (request_id, answer, topic, unresolved, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![request_id, answer, topic, unresolved, notes, now],
        )?;
        let response_id = conn.last_insert_rowid();

        Self::append_history_entry(&conn, request_id, &format!("Supervisor responded: {answer}"))?;

        Ok(SupervisorResponse {
            id: response_id,
            request_id: request_id.to_string(),
            answer: answer.to_string(),
            topic: topic.to_string(),
            unresolved,
            notes: notes.map(|n| n.to_string()),
            created_at: now,
        })
    }

    /// Timeout transition: unlike `attach_response`, this overwrites
    /// `resolved_at` with the timeout instant even if one was set before.
    pub fn mark_timeout(&self, request_id: &str) -> AppResult<()> {
        let conn = self.lock_connection()?;
        let now = Utc::now().timestamp();

        let rows = conn.execute(
            "UPDATE help_requests SET status = ?1, resolved_at = ?2 WHERE id = ?3",
            params![RequestStatus::Unresolved, now, request_id],
        )?;
        if rows == 0 {
            return Err(AppError::RequestNotFound(request_id.to_string()));
        }

        Self::append_history_entry(&conn, request_id, "Marked unresolved after timeout.")
    }

    /// Arms (or re-arms) the follow-up reminder. Rescheduling resets the
    /// sent flag so the new deadline fires again.
    pub fn schedule_follow_up(&self, request_id: &str, follow_up_at: i64) -> AppResult<()> {
        let conn = self.lock_connection()?;

        let rows = conn.execute(
            "UPDATE help_requests SET follow_up_at = ?1, follow_up_reminder_sent = 0 WHERE id = ?2",
            params![follow_up_at, request_id],
        )?;
        if rows == 0 {
            return Err(AppError::RequestNotFound(request_id.to_string()));
        }

        let stamp = DateTime::from_timestamp(follow_up_at, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| follow_up_at.to_string());
        Self::append_history_entry(
            &conn,
            request_id,
            &format!("Follow-up reminder scheduled for {stamp}."),
        )
    }

    pub fn clear_follow_up(&self, request_id: &str) -> AppResult<()> {
        let conn = self.lock_connection()?;

        let rows = conn.execute(
            "UPDATE help_requests SET follow_up_at = NULL, follow_up_reminder_sent = 0 WHERE id = ?1",
            params![request_id],
        )?;
        if rows == 0 {
            return Err(AppError::RequestNotFound(request_id.to_string()));
        }

        Ok(())
    }

    /// Unresolved requests whose reminder deadline has passed and whose
    /// reminder has not been claimed yet, oldest deadline first.
    pub fn list_due_follow_ups(&self, current_time: i64) -> AppResult<Vec<HelpRequest>> {
        let conn = self.lock_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, customer_name, customer_contact, channel, question, status,
                    answer, notes, created_at, escalated_at, resolved_at, history,
                    follow_up_at, follow_up_reminder_sent
             FROM help_requests
             WHERE status = ?1
               AND follow_up_at IS NOT NULL
               AND follow_up_reminder_sent = 0
               AND follow_up_at <= ?2
             ORDER BY follow_up_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(
            params![RequestStatus::Unresolved, current_time],
            Self::row_to_request,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Atomically claims the reminder for one request. Returns false when
    /// another worker already claimed it, or the request stopped being
    /// eligible (resolved, rescheduled into the future, reminder cleared).
    pub fn claim_follow_up_reminder(&self, request_id: &str, current_time: i64) -> AppResult<bool> {
        let conn = self.lock_connection()?;

        let rows = conn.execute(
            "UPDATE help_requests
             SET follow_up_reminder_sent = 1
             WHERE id = ?1
               AND status = ?2
               AND follow_up_at IS NOT NULL
               AND follow_up_reminder_sent = 0
               AND follow_up_at <= ?3",
            params![request_id, RequestStatus::Unresolved, current_time],
        )?;

        Ok(rows == 1)
    }

    // Knowledge base operations

    pub fn list_knowledge_base(&self) -> AppResult<Vec<KnowledgeBaseEntry>> {
        let conn = self.lock_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, source_request_id, topic, question, answer, updated_at
             FROM knowledge_base
             ORDER BY updated_at DESC, id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(KnowledgeBaseEntry {
                id: row.get(0)?,
                source_request_id: row.get(1)?,
                topic: row.get(2)?,
                question: row.get(3)?,
                answer: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn create_kb_entry(
        &self,
        request: &HelpRequest,
        response: &SupervisorResponse,
    ) -> AppResult<KnowledgeBaseEntry> {
        let conn = self.lock_connection()?;
        let now = Utc::now().timestamp();

        conn.execute(
            "INSERT INTO knowledge_base (source_request_id, topic, question, answer, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![request.id, response.topic, request.question, response.answer, now],
        )?;

        Ok(KnowledgeBaseEntry {
            id: conn.last_insert_rowid(),
            source_request_id: request.id.clone(),
            topic: response.topic.clone(),
            question: request.question.clone(),
            answer: response.answer.clone(),
            updated_at: now,
        })
    }

    // Internal helpers

    fn append_history_entry(conn: &Connection, request_id: &str, message: &str) -> AppResult<()> {
        let history_json: String = conn
            .query_row(
                "SELECT history FROM help_requests WHERE id = ?1",
                params![request_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| AppError::RequestNotFound(request_id.to_string()))?;

        let mut history: Vec<HistoryEntry> = serde_json::from_str(&history_json)
            .map_err(|e| AppError::Internal(format!("Failed to parse request history: {e}")))?;
        history.push(HistoryEntry::new(message));

        let serialized = serde_json::to_string(&history)
            .map_err(|e| AppError::Internal(format!("Failed to serialize request history: {e}")))?;

        conn.execute(
            "UPDATE help_requests SET history = ?1 WHERE id = ?2",
            params![serialized, request_id],
        )?;

        Ok(())
    }

    fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<HelpRequest> {
        let history_json: String = row.get(11)?;
        let history: Vec<HistoryEntry> = serde_json::from_str(&history_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(HelpRequest {
            id: row.get(0)?,
            customer_name: row.get(1)?,
            customer_contact: row.get(2)?,
            channel: row.get(3)?,
            question: row.get(4)?,
            status: row.get(5)?,
            answer: row.get(6)?,
            notes: row.get(7)?,
            created_at: row.get(8)?,
            escalated_at: row.get(9)?,
            resolved_at: row.get(10)?,
            history,
            follow_up_at: row.get(12)?,
            follow_up_reminder_sent: row.get(13)?,
        })
    }
}
