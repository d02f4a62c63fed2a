pub mod categories;
pub mod health;
pub mod imports;

use std::sync::Arc;

use crate::{
    config::ImportSettings,
    db::DbPool,
    services::{
        catalog_import::ImportPreviewService, categories::CategoryService,
        category_setup::CategorySetupService, product_import::ProductImportService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub import_preview: Arc<ImportPreviewService>,
    pub categories: Arc<CategoryService>,
    pub category_setup: Arc<CategorySetupService>,
    pub product_import: Arc<ProductImportService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, import: &ImportSettings) -> Self {
        let categories = CategoryService::new(db_pool.clone());

        Self {
            import_preview: Arc::new(ImportPreviewService::new(import.clone())),
            category_setup: Arc::new(CategorySetupService::new(categories.clone())),
            product_import: Arc::new(ProductImportService::new(
                db_pool,
                categories.clone(),
                import.clone(),
            )),
            categories: Arc::new(categories),
        }
    }
}
