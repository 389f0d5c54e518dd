use crate::error::AppError;
use crate::escalation::EscalationService;
use crate::models::{
    CreateHelpRequestRequest, DispatchFollowUpsResponse, HelpRequestListResponse,
    HelpRequestResponse, InboundQuestionRequest, KnowledgeBaseListResponse, ListRequestsQuery,
    RequestStatus, ServerStatus, SupervisorResponseOutcome, SupervisorResponseRequest,
    TimeoutQuery,
};
use actix_web::{web, HttpResponse, Result};
use std::sync::Arc;
use std::time::SystemTime;

pub struct AppState {
    pub escalation: Arc<EscalationService>,
    pub start_time: SystemTime,
}

pub async fn health_check(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let uptime = data
        .start_time
        .elapsed()
        .map_err(|e| AppError::Internal(format!("Failed to calculate uptime: {e}")))?
        .as_secs();

    let status = ServerStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime,
    };

    Ok(HttpResponse::Ok().json(status))
}

pub async fn create_help_request(
    data: web::Data<AppState>,
    request: web::Json<CreateHelpRequestRequest>,
) -> Result<HttpResponse, AppError> {
    let created = data.escalation.create_escalation(
        &request.customer_name,
        &request.channel,
        &request.question,
        request.customer_contact.as_deref(),
    )?;

    Ok(HttpResponse::Created().json(HelpRequestResponse { request: created }))
}

pub async fn list_help_requests(
    data: web::Data<AppState>,
    query: web::Query<ListRequestsQuery>,
) -> Result<HttpResponse, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(RequestStatus::parse(raw).ok_or_else(|| {
            AppError::InvalidRequest(format!("Unknown status filter: {raw}"))
        })?),
        None => None,
    };

    let requests = data.escalation.list_requests(status)?;
    Ok(HttpResponse::Ok().json(HelpRequestListResponse { requests }))
}

pub async fn get_help_request(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    let request = data.escalation.get_request(&request_id)?;
    Ok(HttpResponse::Ok().json(HelpRequestResponse { request }))
}

pub async fn submit_response(
    data: web::Data<AppState>,
    path: web::Path<String>,
    response: web::Json<SupervisorResponseRequest>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    let (request, knowledge_base_entry) = data.escalation.record_response(
        &request_id,
        &response.answer,
        response.topic.as_deref(),
        response.unresolved,
        response.notes.as_deref(),
        response.follow_up_minutes,
    )?;

    Ok(HttpResponse::Ok().json(SupervisorResponseOutcome {
        request,
        knowledge_base_entry,
    }))
}

pub async fn timeout_request(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<TimeoutQuery>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    let request = data
        .escalation
        .mark_timeout(&request_id, query.follow_up_minutes)?;

    Ok(HttpResponse::Ok().json(HelpRequestResponse { request }))
}

pub async fn list_knowledge_base(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let entries = data.escalation.list_knowledge_base()?;
    Ok(HttpResponse::Ok().json(KnowledgeBaseListResponse { entries }))
}

pub async fn dispatch_follow_ups(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let sent = data.escalation.send_due_follow_up_reminders(None)?;
    Ok(HttpResponse::Ok().json(DispatchFollowUpsResponse { sent }))
}

pub async fn inbound_question(
    data: web::Data<AppState>,
    request: web::Json<InboundQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    let outcome = data.escalation.handle_inbound_question(
        &request.customer_name,
        &request.channel,
        &request.question,
        request.customer_contact.as_deref(),
    )?;

    Ok(HttpResponse::Ok().json(outcome))
}
