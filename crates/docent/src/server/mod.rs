//! HTTP server
//!
//! Exposes the upload/list/delete management endpoints and the two SSE
//! streaming flows. Every streaming request spawns its own producer task
//! wired to its own channel and filter; the SSE layer aborts the producer
//! when the client disconnects.

mod sse;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::sse::{KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Mutex as TokioMutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::UserId;
use crate::config::Config;
use crate::embedding::TextEmbedder;
use crate::error::{DocentError, Result};
use crate::files::FileStore;
use crate::generation::{ChatClient, prompts};
use crate::index::{IndexPipeline, LanceIndex};
use crate::qa;
use crate::streaming::{DelimiterFilter, PassthroughHandler, run_generation};

pub use sse::publish;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Full service configuration
    pub config: Config,
    /// Upstream generation client
    pub chat: Arc<ChatClient>,
    /// Embedding model for queries and ingestion
    pub embedder: Arc<dyn TextEmbedder>,
    /// Chunk index
    pub index: Arc<TokioMutex<LanceIndex>>,
    /// Raw upload store
    pub files: FileStore,
}

impl AppState {
    fn pipeline(&self) -> IndexPipeline {
        IndexPipeline::new(
            self.index.clone(),
            self.embedder.clone(),
            self.config.retrieval.clone(),
        )
    }
}

/// The main HTTP server
pub struct DocentServer {
    state: Arc<AppState>,
}

impl DocentServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Start the server and listen for requests until shutdown.
    pub async fn serve(&self) -> Result<()> {
        let addr: SocketAddr = self
            .state
            .config
            .server
            .listen_addr
            .parse()
            .map_err(|e| DocentError::Config(format!("Invalid listen address: {e}")))?;

        let app = create_router(self.state.clone());

        tracing::info!("Starting server on {addr}");

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DocentError::Server(format!("Failed to bind to {addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DocentError::Server(format!("Server error: {e}")))?;

        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(upload_handler))
        .route("/files", get(list_files_handler))
        .route("/delete-files", post(delete_files_handler))
        .route("/question-doc", post(question_doc_handler))
        .route("/completion", post(completion_handler))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Health check endpoint - returns JSON status
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Accept a multipart upload, store it, and index its text.
///
/// On extraction or indexing failure the stored file is deleted again and
/// the request fails with 400.
async fn upload_handler(
    State(state): State<Arc<AppState>>,
    user: UserId,
    mut multipart: Multipart,
) -> Response<Body> {
    let mut upload = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let filename = match field.file_name() {
                    Some(name) => name.to_string(),
                    None => {
                        return create_error_response(
                            StatusCode::BAD_REQUEST,
                            "missing_filename",
                            "The file field has no filename",
                        );
                    }
                };
                match field.bytes().await {
                    Ok(data) => {
                        upload = Some((filename, data));
                        break;
                    }
                    Err(e) => {
                        return create_error_response(
                            StatusCode::BAD_REQUEST,
                            "invalid_multipart",
                            &format!("Failed to read file field: {e}"),
                        );
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return create_error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_multipart",
                    &format!("Invalid multipart body: {e}"),
                );
            }
        }
    }

    let Some((filename, data)) = upload else {
        return create_error_response(
            StatusCode::BAD_REQUEST,
            "missing_file",
            "Request has no 'file' field",
        );
    };

    let document_id = match state.files.save(&user, &filename, &data).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "failed to store upload");
            return create_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_failed",
                &e.to_string(),
            );
        }
    };

    let path = match state.files.path(&user, &document_id) {
        Ok(path) => path,
        Err(e) => {
            return create_error_response(
                StatusCode::BAD_REQUEST,
                "invalid_document_id",
                &e.to_string(),
            );
        }
    };

    if let Err(e) = state.pipeline().ingest_document(&user, &document_id, &path).await {
        tracing::warn!(error = %e, document_id, "indexing failed; removing upload");
        if let Err(delete_err) = state.files.delete(&user, &document_id).await {
            tracing::error!(error = %delete_err, "failed to remove rejected upload");
        }
        return create_error_response(
            StatusCode::BAD_REQUEST,
            "upload_failed",
            &format!("File failed to upload: {e}"),
        );
    }

    Json(serde_json::json!({
        "message": "File uploaded successfully",
        "document_id": document_id,
    }))
    .into_response()
}

/// List the user's uploads
async fn list_files_handler(State(state): State<Arc<AppState>>, user: UserId) -> Response<Body> {
    match state.files.list(&user).await {
        Ok(files) => Json(files).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to list files");
            create_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "list_failed",
                &e.to_string(),
            )
        }
    }
}

/// Delete every upload and index row belonging to the user
async fn delete_files_handler(State(state): State<Arc<AppState>>, user: UserId) -> Response<Body> {
    if let Err(e) = state.files.delete_user(&user).await {
        tracing::error!(error = %e, "failed to delete uploads");
        return create_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "delete_failed",
            &e.to_string(),
        );
    }

    if let Err(e) = state.pipeline().clear_user(&user).await {
        tracing::error!(error = %e, "failed to clear index namespace");
        return create_error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "delete_failed",
            &e.to_string(),
        );
    }

    Json(serde_json::json!({"message": "Files deleted successfully"})).into_response()
}

#[derive(Debug, Deserialize)]
struct QuestionDocBody {
    document_id: String,
}

/// Mine the questions out of a stored document, streamed over SSE through
/// the delimiter filter.
async fn question_doc_handler(
    State(state): State<Arc<AppState>>,
    user: UserId,
    Json(body): Json<QuestionDocBody>,
) -> Response<Body> {
    if !state.files.exists(&user, &body.document_id).await {
        return create_error_response(StatusCode::BAD_REQUEST, "file_not_found", "File not found");
    }

    let path = match state.files.path(&user, &body.document_id) {
        Ok(path) => path,
        Err(e) => {
            return create_error_response(
                StatusCode::BAD_REQUEST,
                "invalid_document_id",
                &e.to_string(),
            );
        }
    };

    let (tx, rx) = crate::streaming::channel();
    let filter = DelimiterFilter::new(tx, prompts::QUESTION_DELIMITER);
    let chat = state.chat.clone();

    let producer = tokio::spawn(async move {
        let _ = run_generation(filter, async |handler: &mut DelimiterFilter| {
            qa::mine_questions(handler, &chat, &path).await
        })
        .await;
    });

    Sse::new(publish(rx, producer.abort_handle()))
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[derive(Debug, Deserialize, Default)]
struct PromptDoc {
    #[serde(default)]
    page_content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionBody {
    #[serde(default)]
    prompt: PromptDoc,
    #[serde(default)]
    chat_history: Vec<String>,
}

/// Answer a free-form prompt with retrieved document context, streamed
/// over SSE unfiltered.
async fn completion_handler(
    State(state): State<Arc<AppState>>,
    user: UserId,
    Json(body): Json<CompletionBody>,
) -> Response<Body> {
    let prompt = body.prompt.page_content;
    if prompt.trim().is_empty() {
        return create_error_response(
            StatusCode::BAD_REQUEST,
            "missing_prompt",
            "Missing prompt in the request",
        );
    }

    let (tx, rx) = crate::streaming::channel();
    let handler = PassthroughHandler::new(tx);

    let chat = state.chat.clone();
    let index = state.index.clone();
    let embedder = state.embedder.clone();
    let retrieval = state.config.retrieval.clone();
    let chat_history = body.chat_history;

    let producer = tokio::spawn(async move {
        let _ = run_generation(handler, async |handler: &mut PassthroughHandler| {
            let outcome = qa::ask_documents(
                handler,
                &chat,
                &index,
                &embedder,
                &retrieval,
                &user,
                &prompt,
                &chat_history,
            )
            .await?;
            tracing::debug!(sources = ?outcome.sources, "answer complete");
            Ok(())
        })
        .await;
    });

    Sse::new(publish(rx, producer.abort_handle()))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Create a JSON error response
fn create_error_response(status: StatusCode, error_type: &str, message: &str) -> Response<Body> {
    let body = serde_json::json!({
        "error": {
            "type": error_type,
            "message": message,
        }
    });

    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::empty())
                .unwrap()
        })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
