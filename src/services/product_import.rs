use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::ImportSettings,
    entities::product::{self, join_models, Entity as ProductEntity},
    errors::ServiceError,
    services::{
        catalog_import::{slugify, ImportRow},
        categories::CategoryService,
    },
};

/// Body of a confirmed import.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommitRequest {
    pub rows: Vec<ImportRow>,
}

/// Outcome of writing approved rows to the catalog.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub success: bool,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    /// Rows written without a category because theirs does not exist yet.
    pub uncategorized: usize,
    pub errors: Vec<String>,
}

enum Written {
    Created,
    Updated,
}

/// Writes previewed rows to the products table, upserting by SKU.
#[derive(Clone)]
pub struct ProductImportService {
    db: Arc<DatabaseConnection>,
    categories: CategoryService,
    settings: ImportSettings,
}

impl ProductImportService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        categories: CategoryService,
        settings: ImportSettings,
    ) -> Self {
        Self {
            db,
            categories,
            settings,
        }
    }

    /// Commits rows one at a time. Invalid rows and rows the store rejects
    /// are reported and skipped; the others are still written.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn commit(&self, rows: Vec<ImportRow>) -> Result<CommitReport, ServiceError> {
        let mut report = CommitReport::default();
        let mut category_ids: HashMap<String, Option<Uuid>> = HashMap::new();

        for row in rows {
            let label = if row.sku.trim().is_empty() {
                row.name.clone()
            } else {
                row.sku.clone()
            };

            let problems = row.validation_errors(&self.settings);
            if !problems.is_empty() {
                report.failed += 1;
                report.errors.push(format!("{label}: {}", problems.join("; ")));
                continue;
            }

            let category_id = match category_ids.get(&row.category) {
                Some(cached) => *cached,
                None => {
                    let found = self
                        .categories
                        .find_by_name_or_slug(&row.category, &slugify(&row.category))
                        .await?
                        .map(|c| c.id);
                    if found.is_none() {
                        warn!(category = %row.category, "Imported category does not exist");
                    }
                    category_ids.insert(row.category.clone(), found);
                    found
                }
            };

            match self.upsert(&row, category_id).await {
                Ok(Written::Created) => report.created += 1,
                Ok(Written::Updated) => report.updated += 1,
                Err(err) => {
                    warn!(sku = %row.sku, error = %err, "Failed to write product");
                    report.failed += 1;
                    report.errors.push(format!("{label}: {}", err.response_message()));
                    continue;
                }
            }
            if category_id.is_none() {
                report.uncategorized += 1;
            }
        }

        report.success = report.failed == 0;
        counter!("catalog_import.committed", (report.created + report.updated) as u64);
        info!(
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            uncategorized = report.uncategorized,
            "Committed import"
        );
        Ok(report)
    }

    async fn upsert(&self, row: &ImportRow, category_id: Option<Uuid>) -> Result<Written, ServiceError> {
        let sku = row.sku.trim();
        let existing = ProductEntity::find()
            .filter(product::Column::Sku.eq(sku))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let slug = self
            .available_slug(row, existing.as_ref().map(|p| p.id))
            .await?;

        let written = match existing {
            Some(current) => {
                let mut model = current.into_active_model();
                apply_row(&mut model, row, slug, category_id);
                model.update(&*self.db).await.map_err(ServiceError::db_error)?;
                Written::Updated
            }
            None => {
                let mut model = product::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    sku: Set(sku.to_string()),
                    ..Default::default()
                };
                apply_row(&mut model, row, slug, category_id);
                model.insert(&*self.db).await.map_err(ServiceError::db_error)?;
                Written::Created
            }
        };
        debug!(%sku, "Wrote product");
        Ok(written)
    }

    /// The row's slug, suffixed with the SKU when another product owns it.
    async fn available_slug(&self, row: &ImportRow, own_id: Option<Uuid>) -> Result<String, ServiceError> {
        let base = if row.slug.is_empty() {
            slugify(&row.name)
        } else {
            row.slug.clone()
        };

        let owner = ProductEntity::find()
            .filter(product::Column::Slug.eq(base.as_str()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(match owner {
            Some(other) if Some(other.id) != own_id => format!("{base}-{}", slugify(&row.sku)),
            _ => base,
        })
    }
}

fn apply_row(model: &mut product::ActiveModel, row: &ImportRow, slug: String, category_id: Option<Uuid>) {
    model.name = Set(row.name.trim().to_string());
    model.slug = Set(slug);
    model.description = Set(row.description.clone());
    model.price = Set(row.price);
    model.price_10 = Set(row.price_10);
    model.price_50 = Set(row.price_50);
    model.price_100 = Set(row.price_100);
    model.category_id = Set(category_id);
    model.compatible_models = Set(join_models(&row.compatible_models));
    model.oe_number = Set(row.oe_number.clone());
    model.weight = Set(row.weight.clone());
    model.dimensions = Set(row.dimensions.clone());
    model.unit_packing = Set(row.unit_packing.clone());
    model.full_packing = Set(row.full_packing.clone());
    model.stock_quantity = Set(row.stock_quantity);
    model.is_active = Set(row.is_active);
    model.track_quantity = Set(row.track_quantity);
    model.low_stock_threshold = Set(row.low_stock_threshold);
}
