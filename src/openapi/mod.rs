use axum::response::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tesla Parts Catalog API",
        version = "0.3.0",
        description = r#"
# Tesla Parts Catalog API

Back-office API for loading supplier price lists into the parts storefront.

## Import workflow

1. `POST /api/v1/categories/auto-setup` creates the category tree for a model.
   Running it again creates nothing new.
2. `POST /api/v1/imports/products/preview` uploads a `.csv`, `.xlsx` or `.xls`
   file. Nothing is written; every row comes back with its validation errors
   and the detected Tesla model.
3. `POST /api/v1/imports/products/commit` writes the approved rows, upserting
   by SKU.

## Error Handling

Request-level failures share one body shape:

```json
{
  "error": "Unsupported file type: .pdf. Accepted: .csv, .xlsx, .xls",
  "status": "Unsupported Media Type",
  "requestId": "req-abc123xyz",
  "timestamp": "2026-03-09T10:30:00Z"
}
```

Row-level problems never fail the request; they are listed per row.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "imports", description = "Spreadsheet preview and commit"),
        (name = "categories", description = "Category hierarchy setup and browsing")
    ),
    paths(
        // Imports
        crate::handlers::imports::preview_import,
        crate::handlers::imports::commit_import,

        // Categories
        crate::handlers::categories::auto_setup,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::category_tree,
    ),
    components(
        schemas(
            crate::models::TeslaModel,
            crate::handlers::imports::PreviewUpload,
            crate::services::catalog_import::preview::PreviewResponse,
            crate::services::catalog_import::preview::PreviewRow,
            crate::services::catalog_import::preview::ImportRow,
            crate::services::catalog_import::model_detection::DetectionResult,
            crate::services::catalog_import::pricing::PriceParsingStats,
            crate::services::product_import::CommitRequest,
            crate::services::product_import::CommitReport,
            crate::handlers::categories::AutoSetupRequest,
            crate::services::category_setup::SetupReport,
            crate::services::category_setup::hierarchy::HierarchyDefinition,
            crate::services::category_setup::hierarchy::CategoryDefinition,
            crate::services::categories::CategoryNode,
            crate::entities::category::Model,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}
