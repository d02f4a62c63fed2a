use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue::Set, ConnectionTrait, TryIntoModel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::TeslaModel;

/// Catalog product created or updated by a confirmed import.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Product name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    #[sea_orm(unique)]
    pub slug: String,

    /// SKU (Stock Keeping Unit)
    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "SKU must be between 1 and 100 characters"
    ))]
    pub sku: String,

    /// Generated from OE number, weight, dimensions and packing
    pub description: Option<String>,

    /// Single-unit price
    pub price: Decimal,

    /// Tier prices for 10, 50 and 100 units
    pub price_10: Option<Decimal>,
    pub price_50: Option<Decimal>,
    pub price_100: Option<Decimal>,

    /// Resolved category; `None` when the imported category did not exist
    pub category_id: Option<Uuid>,

    /// Comma-separated model tokens, e.g. "MODEL_Y"
    pub compatible_models: String,

    pub oe_number: Option<String>,
    pub weight: Option<String>,
    pub dimensions: Option<String>,
    pub unit_packing: Option<String>,
    pub full_packing: Option<String>,

    pub stock_quantity: i32,
    pub is_active: bool,
    pub track_quantity: bool,
    pub low_stock_threshold: i32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Parsed `compatible_models`; unknown tokens are dropped.
    pub fn models(&self) -> Vec<TeslaModel> {
        self.compatible_models
            .split(',')
            .filter_map(|token| token.trim().parse().ok())
            .collect()
    }
}

/// Joins model tokens for the `compatible_models` column.
pub fn join_models(models: &[TeslaModel]) -> String {
    models
        .iter()
        .map(TeslaModel::as_token)
        .collect::<Vec<_>>()
        .join(",")
}

/// Product entity relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            active_model.created_at = Set(Utc::now());
        }
        active_model.updated_at = Set(Some(Utc::now()));

        let model = active_model.clone().try_into_model()?;
        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}
