mod common;

use actix_web::{test, web, App};
use chrono::Utc;
use common::TestApp;
use frontdesk_manager::handlers::AppState;
use frontdesk_manager::routes::configure_routes;
use std::sync::Arc;
use std::time::SystemTime;

fn app_state(test_app: &TestApp) -> web::Data<AppState> {
    web::Data::new(AppState {
        escalation: Arc::clone(&test_app.service),
        start_time: SystemTime::now(),
    })
}

#[actix_rt::test]
async fn test_help_request_lifecycle_over_http() {
    let test_app = TestApp::new();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&test_app))
            .configure(configure_routes),
    )
    .await;

    // Escalate a question
    let create_req = test::TestRequest::post()
        .uri("/api/help-requests")
        .set_json(serde_json::json!({
            "customer_name": "Dana",
            "channel": "webchat",
            "question": "Do you offer balayage for short hair?",
            "customer_contact": "dana@example.com"
        }))
        .to_request();
    let create_resp = test::call_service(&app, create_req).await;
    assert_eq!(create_resp.status(), 201);

    let created: serde_json::Value = test::read_body_json(create_resp).await;
    let request_id = created["request"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["request"]["status"], "pending");
    assert!(created["request"]["resolved_at"].is_null());

    // Fetch it back
    let get_req = test::TestRequest::get()
        .uri(&format!("/api/help-requests/{request_id}"))
        .to_request();
    let get_resp = test::call_service(&app, get_req).await;
    assert!(get_resp.status().is_success());
    let fetched: serde_json::Value = test::read_body_json(get_resp).await;
    assert_eq!(
        fetched["request"]["question"],
        "Do you offer balayage for short hair?"
    );

    // Supervisor resolves it
    let respond_req = test::TestRequest::post()
        .uri(&format!("/api/help-requests/{request_id}/response"))
        .set_json(serde_json::json!({
            "answer": "Yes! Short-hair balayage is $180.",
            "topic": "Services"
        }))
        .to_request();
    let respond_resp = test::call_service(&app, respond_req).await;
    assert!(respond_resp.status().is_success());

    let outcome: serde_json::Value = test::read_body_json(respond_resp).await;
    assert_eq!(outcome["request"]["status"], "resolved");
    assert_eq!(outcome["knowledge_base_entry"]["topic"], "Services");
    assert!(outcome["request"]["follow_up_at"].is_null());

    // The answer is now in the knowledge base
    let kb_req = test::TestRequest::get()
        .uri("/api/knowledge-base")
        .to_request();
    let kb_resp = test::call_service(&app, kb_req).await;
    assert!(kb_resp.status().is_success());
    let kb: serde_json::Value = test::read_body_json(kb_resp).await;
    assert_eq!(kb["entries"].as_array().unwrap().len(), 1);
    assert_eq!(kb["entries"][0]["answer"], "Yes! Short-hair balayage is $180.");

    // Status filters see the transition
    let resolved_req = test::TestRequest::get()
        .uri("/api/help-requests?status=resolved")
        .to_request();
    let resolved: serde_json::Value =
        test::read_body_json(test::call_service(&app, resolved_req).await).await;
    assert_eq!(resolved["requests"].as_array().unwrap().len(), 1);

    let pending_req = test::TestRequest::get()
        .uri("/api/help-requests?status=pending")
        .to_request();
    let pending: serde_json::Value =
        test::read_body_json(test::call_service(&app, pending_req).await).await;
    assert!(pending["requests"].as_array().unwrap().is_empty());
}

#[actix_rt::test]
async fn test_status_filter_rejects_unknown_values() {
    let test_app = TestApp::new();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&test_app))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/help-requests?status=bogus")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_request");
}

#[actix_rt::test]
async fn test_unknown_request_id_returns_404() {
    let test_app = TestApp::new();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&test_app))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/help-requests/does-not-exist")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "request_not_found");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("does-not-exist"));
}

#[actix_rt::test]
async fn test_timeout_endpoint_marks_unresolved_and_schedules_follow_up() {
    let test_app = TestApp::new();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&test_app))
            .configure(configure_routes),
    )
    .await;

    let create_req = test::TestRequest::post()
        .uri("/api/help-requests")
        .set_json(serde_json::json!({
            "customer_name": "Dana",
            "channel": "webchat",
            "question": "Is the colorist in on Saturday?"
        }))
        .to_request();
    let created: serde_json::Value =
        test::read_body_json(test::call_service(&app, create_req).await).await;
    let request_id = created["request"]["id"].as_str().unwrap().to_string();

    let timeout_req = test::TestRequest::post()
        .uri(&format!(
            "/api/help-requests/{request_id}/timeout?follow_up_minutes=15"
        ))
        .to_request();
    let timeout_resp = test::call_service(&app, timeout_req).await;
    assert!(timeout_resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(timeout_resp).await;
    assert_eq!(body["request"]["status"], "unresolved");
    assert!(body["request"]["resolved_at"].is_number());
    assert!(body["request"]["follow_up_at"].is_number());
    assert_eq!(body["request"]["follow_up_reminder_sent"], false);
}

#[actix_rt::test]
async fn test_dispatch_endpoint_reports_sent_count() {
    let test_app = TestApp::new();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&test_app))
            .configure(configure_routes),
    )
    .await;

    let request = test_app
        .service
        .create_escalation("Dana", "webchat", "Any cancellations today?", None)
        .unwrap();
    test_app
        .service
        .record_response(&request.id, "Waitlisting you now.", None, true, None, Some(45))
        .unwrap();

    // Nothing due yet
    let dispatch_req = test::TestRequest::post()
        .uri("/api/help-requests/follow-ups/dispatch")
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, dispatch_req).await).await;
    assert_eq!(body["sent"], 0);

    // Pull the deadline into the past, then dispatch for real
    test_app
        .database
        .schedule_follow_up(&request.id, Utc::now().timestamp() - 60)
        .unwrap();

    let dispatch_req = test::TestRequest::post()
        .uri("/api/help-requests/follow-ups/dispatch")
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, dispatch_req).await).await;
    assert_eq!(body["sent"], 1);

    let dispatch_req = test::TestRequest::post()
        .uri("/api/help-requests/follow-ups/dispatch")
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, dispatch_req).await).await;
    assert_eq!(body["sent"], 0);
}

#[actix_rt::test]
async fn test_inbound_question_endpoint_answers_or_escalates() {
    let test_app = TestApp::new();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&test_app))
            .configure(configure_routes),
    )
    .await;

    // Empty knowledge base: the question escalates
    let inbound_req = test::TestRequest::post()
        .uri("/api/inbound-questions")
        .set_json(serde_json::json!({
            "customer_name": "Rae",
            "channel": "sms",
            "question": "Do you have evening slots available?"
        }))
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, inbound_req).await).await;
    assert_eq!(body["outcome"], "escalated");
    assert_eq!(body["request"]["status"], "pending");
    let request_id = body["request"]["id"].as_str().unwrap().to_string();

    // Supervisor answers, seeding the knowledge base
    let respond_req = test::TestRequest::post()
        .uri(&format!("/api/help-requests/{request_id}/response"))
        .set_json(serde_json::json!({
            "answer": "We stay open until 8pm on Thursdays.",
            "topic": "Hours"
        }))
        .to_request();
    assert!(test::call_service(&app, respond_req).await.status().is_success());

    // The same question now gets answered directly
    let inbound_req = test::TestRequest::post()
        .uri("/api/inbound-questions")
        .set_json(serde_json::json!({
            "customer_name": "Kim",
            "channel": "sms",
            "question": "evening slots"
        }))
        .to_request();
    let body: serde_json::Value =
        test::read_body_json(test::call_service(&app, inbound_req).await).await;
    assert_eq!(body["outcome"], "answered");
    assert_eq!(body["answer"], "We stay open until 8pm on Thursdays.");
}

#[actix_rt::test]
async fn test_health_endpoint_reports_version() {
    let test_app = TestApp::new();
    let app = test::init_service(
        App::new()
            .app_data(app_state(&test_app))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
