//! Centralized route configuration for the frontdesk manager API.
//!
//! This module provides a shared function to configure all application routes,
//! allowing both the main server and test servers to use the same routing setup.

use crate::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health_check))
            .route("/help-requests", web::get().to(handlers::list_help_requests))
            .route(
                "/help-requests",
                web::post().to(handlers::create_help_request),
            )
            // Registered before the {id} routes so "follow-ups" is not
            // captured as a request id.
            .route(
                "/help-requests/follow-ups/dispatch",
                web::post().to(handlers::dispatch_follow_ups),
            )
            .route(
                "/help-requests/{id}",
                web::get().to(handlers::get_help_request),
            )
            .route(
                "/help-requests/{id}/response",
                web::post().to(handlers::submit_response),
            )
            .route(
                "/help-requests/{id}/timeout",
                web::post().to(handlers::timeout_request),
            )
            .route(
                "/knowledge-base",
                web::get().to(handlers::list_knowledge_base),
            )
            .route(
                "/inbound-questions",
                web::post().to(handlers::inbound_question),
            ),
    );
}
