//! Request handlers for the classification service.
//!
//! Every pipeline failure maps to an explicit error response; the service
//! never answers a prediction request with a guessed class.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use macula_core::{ModelInfo, PipelineError};
use serde_json::json;

use super::AppState;

/// Health check endpoint for orchestrators.
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Metadata about the loaded model.
pub async fn model_info_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ModelInfo::new(state.pipeline.model_loaded()))
}

/// Main prediction endpoint: multipart upload with an `image` field.
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    // Pull the image field out of the multipart payload.
    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("image") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((filename, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read upload: {e}"),
                        );
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid multipart payload: {e}"),
                );
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No image file provided");
    };
    if filename.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No file selected");
    }
    if !allowed_file(&filename, &state.config.server.allowed_extensions) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Invalid file type. Allowed: {}",
                state.config.server.allowed_extensions.join(", ")
            ),
        );
    }

    match state.pipeline.classify_upload(bytes, &filename).await {
        Ok(prediction) => (StatusCode::OK, Json(prediction)).into_response(),
        Err(e) => {
            tracing::error!("Prediction failed for {}: {e}", filename);
            error_response(error_status(&e), format!("Prediction failed: {e}"))
        }
    }
}

/// Filetype check against the configured extension allowlist.
fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_lowercase();
            allowed.iter().any(|a| a == &ext)
        })
        .unwrap_or(false)
}

/// Map a pipeline error to an HTTP status.
///
/// Bad uploads are the caller's fault; a missing model means the service
/// is up but cannot classify; everything else is an internal failure.
fn error_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Decode { .. }
        | PipelineError::UnsupportedFormat { .. }
        | PipelineError::FileTooLarge { .. }
        | PipelineError::ImageTooLarge { .. }
        | PipelineError::Timeout { .. } => StatusCode::BAD_REQUEST,
        PipelineError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Preprocess { .. }
        | PipelineError::Inference { .. }
        | PipelineError::Format { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()]
    }

    #[test]
    fn test_allowed_file_accepts_known_extensions() {
        assert!(allowed_file("fundus.png", &allowed()));
        assert!(allowed_file("scan.JPG", &allowed()));
        assert!(allowed_file("a.b.jpeg", &allowed()));
    }

    #[test]
    fn test_allowed_file_rejects_others() {
        assert!(!allowed_file("fundus.gif", &allowed()));
        assert!(!allowed_file("noextension", &allowed()));
        assert!(!allowed_file("", &allowed()));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&PipelineError::Decode {
                name: "x".into(),
                message: "bad".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&PipelineError::ModelUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            error_status(&PipelineError::Inference {
                message: "boom".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_status(&PipelineError::Format {
                message: "bad vector".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
