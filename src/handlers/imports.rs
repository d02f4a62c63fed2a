use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Json,
};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    errors::{ApiError, ServiceError},
    models::TeslaModel,
    services::{
        catalog_import::preview::PreviewResponse,
        product_import::{CommitReport, CommitRequest},
    },
    AppState,
};

const FILE_FIELD: &str = "file";
const MODEL_FIELD: &str = "model";

/// Multipart form accepted by the preview endpoint.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PreviewUpload {
    /// The spreadsheet: `.csv`, `.xlsx` or `.xls`
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// Model override; skips detection when present
    #[schema(example = "MODEL_Y")]
    model: Option<TeslaModel>,
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::bad_request(format!("Malformed upload: {}", err.body_text()))
    }
}

/// Parse a supplier spreadsheet into a reviewable preview
#[utoipa::path(
    post,
    path = "/api/v1/imports/products/preview",
    request_body(content = PreviewUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Spreadsheet parsed", body = PreviewResponse),
        (status = 400, description = "No file, empty file or bad model override", body = crate::errors::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::errors::ErrorResponse),
        (status = 415, description = "Unsupported file type", body = crate::errors::ErrorResponse),
        (status = 422, description = "Unreadable spreadsheet", body = crate::errors::ErrorResponse)
    ),
    tag = "imports"
)]
pub async fn preview_import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PreviewResponse>, ApiError> {
    let mut upload: Option<Upload> = None;
    let mut model_override: Option<TeslaModel> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some(Upload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some(MODEL_FIELD) => {
                let raw = field.text().await.map_err(multipart_error)?;
                if raw.trim().is_empty() {
                    continue;
                }
                model_override = Some(TeslaModel::parse_override(&raw).ok_or_else(|| {
                    ApiError::bad_request(format!(
                        "Unknown model '{}'; expected one of MODEL_3, MODEL_Y, MODEL_S, MODEL_X",
                        raw.trim()
                    ))
                })?);
            }
            other => {
                warn!(field = ?other, "Ignoring unexpected multipart field");
            }
        }
    }

    let Upload { filename, bytes } =
        upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    info!(%filename, size = bytes.len(), "Received import upload");

    let service = state.services.import_preview.clone();
    let response = tokio::task::spawn_blocking(move || {
        service.preview(&filename, &bytes, model_override)
    })
    .await
    .map_err(|e| ServiceError::InternalError(format!("Preview task failed: {e}")))??;

    Ok(Json(response))
}

/// Write approved preview rows to the catalog
#[utoipa::path(
    post,
    path = "/api/v1/imports/products/commit",
    request_body = CommitRequest,
    responses(
        (status = 200, description = "Rows committed; per-row failures are listed in the report", body = CommitReport),
        (status = 400, description = "Malformed request", body = crate::errors::ErrorResponse)
    ),
    tag = "imports"
)]
pub async fn commit_import(
    State(state): State<AppState>,
    Json(payload): Json<CommitRequest>,
) -> Result<Json<CommitReport>, ServiceError> {
    let report = state.services.product_import.commit(payload.rows).await?;
    Ok(Json(report))
}
