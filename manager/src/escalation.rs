use crate::config::EscalationConfig;
use crate::database::Database;
use crate::error::AppResult;
use crate::matcher::AnswerMatcher;
use crate::models::{
    HelpRequest, HistoryEntry, InboundOutcome, KnowledgeBaseEntry, RequestStatus,
};
use crate::notifications::{NotificationPayload, NotificationSink};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Longest follow-up delay the service accepts, in minutes (one year).
/// Larger values are clamped before any deadline arithmetic.
const MAX_FOLLOW_UP_MINUTES: i64 = 365 * 24 * 60;

/// Lifecycle manager for escalated help requests.
///
/// Owns the pending -> resolved/unresolved transitions, the follow-up
/// reminder schedule, and the knowledge base that grows out of supervisor
/// answers. Notifications and answer matching are injected so callers (and
/// tests) choose the delivery and lookup strategy.
pub struct EscalationService {
    db: Arc<Database>,
    notifier: Arc<dyn NotificationSink>,
    matcher: Arc<dyn AnswerMatcher>,
    settings: EscalationConfig,
}

impl EscalationService {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn NotificationSink>,
        matcher: Arc<dyn AnswerMatcher>,
        settings: EscalationConfig,
    ) -> Self {
        Self {
            db,
            notifier,
            matcher,
            settings,
        }
    }

    pub fn list_requests(&self, status: Option<RequestStatus>) -> AppResult<Vec<HelpRequest>> {
        self.db.list_requests(status)
    }

    pub fn get_request(&self, request_id: &str) -> AppResult<HelpRequest> {
        self.db.get_request(request_id)
    }

    pub fn list_knowledge_base(&self) -> AppResult<Vec<KnowledgeBaseEntry>> {
        self.db.list_knowledge_base()
    }

    /// Opens a pending request, acknowledges the customer, and pages the
    /// supervisor.
    pub fn create_escalation(
        &self,
        customer_name: &str,
        channel: &str,
        question: &str,
        customer_contact: Option<&str>,
    ) -> AppResult<HelpRequest> {
        let mut request = HelpRequest::new(
            customer_name.to_string(),
            channel.to_string(),
            question.to_string(),
            customer_contact.map(|c| c.to_string()),
        );
        request
            .history
            .push(HistoryEntry::new("AI escalated to supervisor"));
        self.db.create_request(&request)?;

        let acknowledgement = "Hi there! I've got your question and I'm looping in my supervisor so we can get you the right answer.";
        self.db.append_history(&request.id, acknowledgement)?;

        self.notifier.notify_customer(NotificationPayload::new(
            customer_name,
            channel,
            acknowledgement,
        ));
        self.notifier.notify_supervisor(NotificationPayload::new(
            "Supervisor On-call",
            "console",
            format!("Hey, I need help answering '{question}'."),
        ));

        info!(request_id = %request.id, customer = %customer_name, "escalated help request");
        self.db.get_request(&request.id)
    }

    /// Applies a supervisor's answer to a request.
    ///
    /// Resolved answers are archived in the knowledge base and cancel any
    /// scheduled reminder. Unresolved answers keep the conversation open and
    /// promise the customer an update within `follow_up_minutes` (the
    /// configured default when absent or non-positive, capped at a year).
    /// Either way the customer is told the outcome.
    pub fn record_response(
        &self,
        request_id: &str,
        answer: &str,
        topic: Option<&str>,
        unresolved: bool,
        notes: Option<&str>,
        follow_up_minutes: Option<i64>,
    ) -> AppResult<(HelpRequest, Option<KnowledgeBaseEntry>)> {
        let request = self.db.get_request(request_id)?;

        // The auto tag steps in only for a missing or empty topic; anything
        // else, whitespace included, is stored verbatim.
        let topic = match topic {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => self.settings.knowledge_base_auto_tag.clone(),
        };

        let response = self
            .db
            .attach_response(request_id, answer, &topic, unresolved, notes)?;

        let kb_entry;
        let message;
        if unresolved {
            let minutes = self.normalize_follow_up_minutes(follow_up_minutes);
            let follow_up_at = Utc::now().timestamp() + minutes * 60;
            self.db.schedule_follow_up(request_id, follow_up_at)?;

            let base_answer = if answer.is_empty() {
                "Thanks for staying with me while I gather more info."
            } else {
                answer
            };
            message = format!("{base_answer} I'll check back in about {minutes} minutes. Please feel free to reply with any updates in the meantime.");
            self.db.append_history(
                request_id,
                &format!("Asked customer for an update within {minutes} minutes."),
            )?;
            kb_entry = None;
        } else {
            let entry = self.db.create_kb_entry(&request, &response)?;
            self.db.clear_follow_up(request_id)?;

            let closing = self
                .settings
                .post_resolution_followup
                .as_deref()
                .map(str::trim)
                .unwrap_or("");
            if closing.is_empty() {
                message = answer.to_string();
            } else {
                let base = if answer.trim().is_empty() {
                    "I wanted to follow up on your request."
                } else {
                    answer.trim()
                };
                message = format!("{base}\n\n{closing}");
                self.db.append_history(
                    request_id,
                    "Auto follow-up: sent reassurance message after resolution.",
                )?;
            }
            kb_entry = Some(entry);
        }

        self.notifier.notify_customer(NotificationPayload::new(
            request.customer_name.clone(),
            request.channel.clone(),
            message,
        ));

        info!(
            request_id = %request_id,
            unresolved = unresolved,
            "recorded supervisor response"
        );
        Ok((self.db.get_request(request_id)?, kb_entry))
    }

    /// Gives up waiting on the supervisor: flips the request to unresolved,
    /// promises the customer an update, and schedules the reminder that
    /// backs the promise.
    pub fn mark_timeout(
        &self,
        request_id: &str,
        follow_up_minutes: Option<i64>,
    ) -> AppResult<HelpRequest> {
        let request = self.db.get_request(request_id)?;
        self.db.mark_timeout(request_id)?;

        let minutes = self.normalize_follow_up_minutes(follow_up_minutes);
        let follow_up_at = Utc::now().timestamp() + minutes * 60;
        self.db.schedule_follow_up(request_id, follow_up_at)?;
        self.db.append_history(
            request_id,
            &format!("Timeout occurred. Promised update in {minutes} minutes."),
        )?;

        self.notifier.notify_customer(NotificationPayload::new(
            request.customer_name.clone(),
            request.channel.clone(),
            format!("Thanks for your patience. I'm still coordinating with my supervisor and will follow up in about {minutes} minutes."),
        ));

        info!(request_id = %request_id, minutes = minutes, "marked request timed out");
        self.db.get_request(request_id)
    }

    /// Sends the reminder for every due follow-up and returns how many went
    /// out. Each reminder is claimed in the store before it is sent, so
    /// overlapping dispatchers (ticker plus endpoint, or two daemons on one
    /// database) never double-send.
    pub fn send_due_follow_up_reminders(&self, now: Option<i64>) -> AppResult<usize> {
        let current_time = now.unwrap_or_else(|| Utc::now().timestamp());
        let due_requests = self.db.list_due_follow_ups(current_time)?;

        let mut sent = 0;
        for request in due_requests {
            if !self.db.claim_follow_up_reminder(&request.id, current_time)? {
                continue;
            }

            self.notifier.notify_customer(NotificationPayload::new(
                request.customer_name.clone(),
                request.channel.clone(),
                "Thanks for your patience — I'm still working on this and will update you as soon as I have news.",
            ));
            self.db.append_history(
                &request.id,
                "Automated reminder sent: still working, will follow up shortly.",
            )?;
            sent += 1;
        }

        Ok(sent)
    }

    /// Front door for customer questions: answer from the knowledge base
    /// when a stored entry matches, escalate to a human otherwise.
    pub fn handle_inbound_question(
        &self,
        customer_name: &str,
        channel: &str,
        question: &str,
        customer_contact: Option<&str>,
    ) -> AppResult<InboundOutcome> {
        let entries = self.db.list_knowledge_base()?;
        if let Some(answer) = self.matcher.find_answer(&entries, question) {
            self.notifier.notify_customer(NotificationPayload::new(
                customer_name,
                channel,
                answer.clone(),
            ));
            info!(customer = %customer_name, "answered inbound question from knowledge base");
            return Ok(InboundOutcome::Answered { answer });
        }

        let request = self.create_escalation(customer_name, channel, question, customer_contact)?;
        Ok(InboundOutcome::Escalated { request })
    }

    fn normalize_follow_up_minutes(&self, value: Option<i64>) -> i64 {
        let minutes = match value {
            Some(minutes) if minutes > 0 => minutes,
            _ => self.settings.default_follow_up_minutes,
        };
        minutes.min(MAX_FOLLOW_UP_MINUTES)
    }
}
