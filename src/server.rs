use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get_service, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::dispatcher::{Dispatcher, QueryResult};

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    question: Option<String>,
}

/// `GET /` serves the static page, `POST /api/generate` answers questions.
pub fn create_app(dispatcher: Arc<Dispatcher>, index_page: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get_service(ServeFile::new(index_page.as_ref())))
        .route("/api/generate", post(generate))
        .with_state(dispatcher)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `0.0.0.0:{port}` and serves until Ctrl+C.
pub async fn start(port: u16, app: Router) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Always answers 200. A body that is not a JSON object with a string
/// `question` is handled like a missing question.
async fn generate(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Json<QueryResult> {
    let started = Instant::now();
    let question = match serde_json::from_slice::<GenerateRequest>(&body) {
        Ok(req) => req.question,
        Err(err) => {
            debug!(error = %err, "unreadable request body");
            None
        }
    };

    let answer = dispatcher.answer(question.as_deref()).await;
    info!(
        outcome = ?answer.outcome,
        elapsed_ms = started.elapsed().as_millis(),
        "POST /api/generate"
    );
    Json(answer.result)
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => {
            // Without a signal handler, keep serving until the process is killed
            error!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
