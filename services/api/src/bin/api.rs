//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        memory::MEMORY_DATABASE_URL, Argon2Credentials, DbAdapter, InMemoryDb,
        OpenAiConversationAdapter,
    },
    config::{Config, LlmProvider},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use axum::Router;
use chat_assistant_core::ports::DatabaseService;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Store & Run Migrations ---
    let (db, pool): (Arc<dyn DatabaseService>, Option<PgPool>) =
        if config.database_url == MEMORY_DATABASE_URL {
            warn!("Using the in-memory store; data is lost on shutdown.");
            (Arc::new(InMemoryDb::new()), None)
        } else {
            info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(&config.database_url)
                .await?;
            let db_adapter = DbAdapter::new(pool.clone());
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            (Arc::new(db_adapter), Some(pool))
        };

    // --- 3. Initialize Service Adapters ---
    let conversation = Arc::new(match config.llm_provider {
        LlmProvider::Gemini => {
            OpenAiConversationAdapter::gemini(&config.llm_api_key, &config.chat_model)
        }
        LlmProvider::OpenAi => {
            OpenAiConversationAdapter::openai(&config.llm_api_key, &config.chat_model)
        }
    });
    info!(provider = ?config.llm_provider, model = %config.chat_model, "Conversation provider ready");

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db,
        credentials: Arc::new(Argon2Credentials::new()),
        conversation,
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    // --- 7. Release the Store ---
    if let Some(pool) = pool {
        pool.close().await;
        info!("Database pool closed.");
    }
    info!("Server stopped");
    Ok(())
}

/// Cancels `token` when SIGINT (Ctrl-C) or SIGTERM is received.
async fn watch_signals(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received; draining connections");
    token.cancel();
}
