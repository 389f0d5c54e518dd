//! Shared fixtures for lifecycle and API tests.
//!
//! Every test gets its own temporary database and a recording notification
//! sink, so assertions can inspect exactly what would have been sent without
//! touching real channels.

use frontdesk_manager::config::EscalationConfig;
use frontdesk_manager::database::Database;
use frontdesk_manager::escalation::EscalationService;
use frontdesk_manager::matcher::SubstringMatcher;
use frontdesk_manager::notifications::{NotificationPayload, NotificationSink};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Captures notifications instead of delivering them.
#[derive(Default)]
pub struct RecordingNotifier {
    customer: Mutex<Vec<NotificationPayload>>,
    supervisor: Mutex<Vec<NotificationPayload>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn customer_messages(&self) -> Vec<NotificationPayload> {
        self.customer.lock().unwrap().clone()
    }

    pub fn supervisor_messages(&self) -> Vec<NotificationPayload> {
        self.supervisor.lock().unwrap().clone()
    }

    pub fn last_customer_message(&self) -> Option<NotificationPayload> {
        self.customer.lock().unwrap().last().cloned()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify_customer(&self, payload: NotificationPayload) {
        self.customer.lock().unwrap().push(payload);
    }

    fn notify_supervisor(&self, payload: NotificationPayload) {
        self.supervisor.lock().unwrap().push(payload);
    }
}

/// An escalation service wired to a throwaway database and recording sinks.
pub struct TestApp {
    pub database: Arc<Database>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: Arc<EscalationService>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: EscalationConfig) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let database = Arc::new(Database::new(&db_path).unwrap());
        let notifier = Arc::new(RecordingNotifier::default());

        let service = Arc::new(EscalationService::new(
            Arc::clone(&database),
            Arc::clone(&notifier) as Arc<dyn NotificationSink>,
            Arc::new(SubstringMatcher),
            settings,
        ));

        Self {
            database,
            notifier,
            service,
            _temp_dir: temp_dir,
        }
    }
}

#[allow(dead_code)]
pub fn test_settings() -> EscalationConfig {
    EscalationConfig {
        default_follow_up_minutes: 30,
        knowledge_base_auto_tag: "General".to_string(),
        post_resolution_followup: None,
        reminder_poll_seconds: 0,
    }
}
