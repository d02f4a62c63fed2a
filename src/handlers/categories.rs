use axum::{body::Bytes, extract::State, response::Json};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    entities::category,
    errors::ApiError,
    models::TeslaModel,
    services::{
        categories::CategoryNode,
        category_setup::{hierarchy::HierarchyDefinition, SetupReport},
    },
    ApiResponse, ApiResult, AppState,
};

/// Body of the auto-setup endpoint. Both fields are optional and so is the
/// body itself.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AutoSetupRequest {
    /// Model whose hierarchy to create; MODEL_3 when omitted
    #[schema(example = "MODEL_Y")]
    pub model: Option<TeslaModel>,
    /// Replaces the built-in hierarchy
    pub hierarchy: Option<HierarchyDefinition>,
}

impl AutoSetupRequest {
    fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid auto-setup request: {e}")))
    }
}

/// Create the category hierarchy for a model
#[utoipa::path(
    post,
    path = "/api/v1/categories/auto-setup",
    request_body(
        content = AutoSetupRequest,
        description = "Optional; an empty body creates the MODEL_3 built-in hierarchy",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Setup ran; per-category failures are listed in the report", body = SetupReport),
        (status = 400, description = "Malformed request or no built-in hierarchy for the model", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn auto_setup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SetupReport>, ApiError> {
    let request = AutoSetupRequest::from_body(&body)?;
    let model = request.model.unwrap_or(TeslaModel::Model3);
    info!(%model, custom = request.hierarchy.is_some(), "Category auto-setup requested");

    let report = state
        .services
        .category_setup
        .setup(model, request.hierarchy)
        .await?;
    Ok(Json(report))
}

/// List all categories in sort order
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Categories listed", body = ApiResponse<Vec<category::Model>>)
    ),
    tag = "categories"
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<category::Model>> {
    let categories = state.services.categories.list().await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// The category forest
#[utoipa::path(
    get,
    path = "/api/v1/categories/tree",
    responses(
        (status = 200, description = "Nested categories", body = ApiResponse<Vec<CategoryNode>>)
    ),
    tag = "categories"
)]
pub async fn category_tree(State(state): State<AppState>) -> ApiResult<Vec<CategoryNode>> {
    let tree = state.services.categories.tree().await?;
    Ok(Json(ApiResponse::success(tree)))
}
