use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chemviz_core::error::IngestError;
use chemviz_core::history::{HistoryError, HistoryItem, HISTORY_LIMIT};
use chemviz_core::ingestion::{IngestReport, UploadedFile};
use serde_json::json;

use crate::AppState;

const FILE_FIELD: &str = "file";

/// JSON error body `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        if err.is_client_error() {
            ApiError::new(StatusCode::BAD_REQUEST, err.to_string())
        } else {
            tracing::error!(stage = %err.stage(), "ingestion failed: {err}");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("Server Error: {err}"))
        }
    }
}

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        tracing::error!("history lookup failed: {err}");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("Server Error: {err}"))
    }
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<IngestReport>), ApiError> {
    let mut file = None;

    match multipart {
        Ok(mut multipart) => {
            while let Some(field) = multipart.next_field().await.map_err(|err| {
                ApiError::new(err.status(), format!("Multipart error: {}", err.body_text()))
            })? {
                if field.name() != Some(FILE_FIELD) {
                    continue;
                }
                let filename = field.file_name().unwrap_or("upload.csv").to_string();
                let contents = field.bytes().await.map_err(|err| {
                    ApiError::new(err.status(), format!("Failed to read file: {}", err.body_text()))
                })?;
                file = Some((filename, contents));
                break;
            }
        }
        Err(rejection) => {
            tracing::debug!("request carried no multipart body: {rejection}");
        }
    }

    let upload = file.as_ref().map(|(filename, contents)| UploadedFile {
        filename: filename.as_str(),
        contents: contents.as_ref(),
    });

    let report = state.pipeline.ingest_upload(upload).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let records = state.pipeline.history().list_recent(HISTORY_LIMIT).await?;
    let items = records
        .iter()
        .map(|record| HistoryItem::from_record(record, state.timezone))
        .collect();
    Ok(Json(items))
}
