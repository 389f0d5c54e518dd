use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::{Arg, Command};
use frontdesk_manager::config::AppConfig;
use frontdesk_manager::database::Database;
use frontdesk_manager::error::AppResult;
use frontdesk_manager::escalation::EscalationService;
use frontdesk_manager::handlers::AppState;
use frontdesk_manager::matcher::SubstringMatcher;
use frontdesk_manager::notifications::ConsoleNotifier;
use frontdesk_manager::routes;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[actix_web::main]
async fn main() -> AppResult<()> {
    // Parse command line arguments
    let matches = Command::new("frontdesk-manager")
        .version(env!("CARGO_PKG_VERSION"))
        .about("frontdesk Manager - human-in-the-loop help request daemon")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to configuration file")
                .value_name("FILE"),
        )
        .get_matches();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env().add_directive("frontdesk_manager=info".parse().unwrap()),
        )
        .init();

    tracing::info!("Starting frontdesk Manager daemon");

    // Load configuration
    let config = match matches.get_one::<String>("config") {
        Some(path) => {
            let config = AppConfig::load_from_file(Path::new(path))?;
            tracing::info!("Loaded configuration from {path}");
            config
        }
        None => {
            let config = AppConfig::load()?;
            tracing::info!("Loaded configuration from ~/.config/frontdesk/manager.toml");
            config
        }
    };

    // Initialize database
    let database = Arc::new(Database::new(&config.database.path)?);
    tracing::info!("Database initialized at {:?}", config.database.path);

    let escalation = Arc::new(EscalationService::new(
        Arc::clone(&database),
        Arc::new(ConsoleNotifier),
        Arc::new(SubstringMatcher),
        config.escalation.clone(),
    ));

    // Background ticker for due follow-up reminders. The dispatch endpoint
    // covers deployments that disable this and drive dispatch externally.
    let poll_seconds = config.escalation.reminder_poll_seconds;
    if poll_seconds > 0 {
        let ticker_service = Arc::clone(&escalation);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(poll_seconds));
            loop {
                interval.tick().await;
                match ticker_service.send_due_follow_up_reminders(None) {
                    Ok(sent) if sent > 0 => {
                        tracing::info!(sent = sent, "Dispatched due follow-up reminders")
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!("Follow-up reminder dispatch failed: {e}"),
                }
            }
        });
        tracing::info!("Follow-up reminder ticker running every {poll_seconds}s");
    }

    let app_state = web::Data::new(AppState {
        escalation,
        start_time: SystemTime::now(),
    });

    // Start HTTP server
    let server_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting HTTP server on {}", server_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .configure(routes::configure_routes)
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
