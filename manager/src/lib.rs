pub mod config;
pub mod database;
pub mod error;
pub mod escalation;
pub mod handlers;
pub mod matcher;
pub mod models;
pub mod notifications;
pub mod routes;
