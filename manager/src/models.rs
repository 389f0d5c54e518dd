use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a help request.
///
/// Requests start out `pending` and leave that state exactly once, through a
/// supervisor response or a timeout. `unresolved` requests keep cycling
/// through follow-up reminders until a later response settles them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Resolved,
    Unresolved,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Resolved => "resolved",
            RequestStatus::Unresolved => "unresolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RequestStatus::Pending),
            "resolved" => Some(RequestStatus::Resolved),
            "unresolved" => Some(RequestStatus::Unresolved),
            _ => None,
        }
    }
}

impl FromSql for RequestStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        RequestStatus::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown request status: {text}").into()))
    }
}

impl ToSql for RequestStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// One entry in a request's append-only activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: i64,
    pub message: String,
}

impl HistoryEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            message: message.into(),
        }
    }
}

/// A customer inquiry under human-in-the-loop handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpRequest {
    pub id: String,
    pub customer_name: String,
    pub customer_contact: Option<String>,
    pub channel: String,
    pub question: String,
    pub status: RequestStatus,
    pub answer: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub escalated_at: i64,
    /// Terminal-transition time: stamped on first resolution, overwritten on
    /// timeout. Both meanings share this field deliberately.
    pub resolved_at: Option<i64>,
    pub history: Vec<HistoryEntry>,
    pub follow_up_at: Option<i64>,
    pub follow_up_reminder_sent: bool,
}

impl HelpRequest {
    pub fn new(
        customer_name: String,
        channel: String,
        question: String,
        customer_contact: Option<String>,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            customer_name,
            customer_contact,
            channel,
            question,
            status: RequestStatus::Pending,
            answer: None,
            notes: None,
            created_at: now,
            escalated_at: now,
            resolved_at: None,
            history: Vec::new(),
            follow_up_at: None,
            follow_up_reminder_sent: false,
        }
    }
}

/// A supervisor's answer event tied to a help request. Immutable once stored;
/// only the latest response drives request state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorResponse {
    pub id: i64,
    pub request_id: String,
    pub answer: String,
    pub topic: String,
    pub unresolved: bool,
    pub notes: Option<String>,
    pub created_at: i64,
}

/// A reusable Q/A pair promoted from a resolved request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    pub id: i64,
    pub source_request_id: String,
    pub topic: String,
    pub question: String,
    pub answer: String,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateHelpRequestRequest {
    pub customer_name: String,
    pub channel: String,
    pub question: String,
    pub customer_contact: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupervisorResponseRequest {
    pub answer: String,
    pub topic: Option<String>,
    #[serde(default)]
    pub unresolved: bool,
    pub notes: Option<String>,
    pub follow_up_minutes: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InboundQuestionRequest {
    pub customer_name: String,
    pub channel: String,
    pub question: String,
    pub customer_contact: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimeoutQuery {
    pub follow_up_minutes: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HelpRequestResponse {
    pub request: HelpRequest,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HelpRequestListResponse {
    pub requests: Vec<HelpRequest>,
}

/// Result of recording a supervisor response: the updated request plus the
/// knowledge base entry when the response resolved it.
#[derive(Debug, Serialize, Deserialize)]
pub struct SupervisorResponseOutcome {
    pub request: HelpRequest,
    pub knowledge_base_entry: Option<KnowledgeBaseEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeBaseListResponse {
    pub entries: Vec<KnowledgeBaseEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchFollowUpsResponse {
    pub sent: usize,
}

/// What happened to an inbound customer question: answered straight from the
/// knowledge base, or escalated to a supervisor as a new help request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum InboundOutcome {
    Answered { answer: String },
    Escalated { request: HelpRequest },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: String,
    pub version: String,
    pub uptime: u64,
}
