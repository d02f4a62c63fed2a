use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::category_mapping::reconcile_category;
use super::columns::{ColumnMap, Field};
use super::model_detection::DetectionResult;
use super::pricing::{normalize_price, parse_price_text, PriceParse, PriceParsingStats};
use super::spreadsheet::CellValue;
use crate::config::ImportSettings;
use crate::models::TeslaModel;

/// A parsed spreadsheet row in the shape the catalog stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub name: String,
    pub sku: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub price_10: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub price_50: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub price_100: Option<Decimal>,
    pub category: String,
    pub compatible_models: Vec<TeslaModel>,
    #[serde(default)]
    pub oe_number: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub unit_packing: Option<String>,
    #[serde(default)]
    pub full_packing: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub track_quantity: bool,
    pub low_stock_threshold: i32,
}

impl ImportRow {
    /// Field-level rule violations, in display order.
    ///
    /// Unparseable price text is only detectable at preview time; here a
    /// negative amount is the only price failure.
    pub fn validation_errors(&self, settings: &ImportSettings) -> Vec<String> {
        let mut errors = identity_errors(&self.name, &self.sku, settings);
        if self.price.is_sign_negative() && !self.price.is_zero() {
            errors.push(NEGATIVE_PRICE.to_string());
        }
        errors
    }
}

/// One row as shown before the user confirms the import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    #[serde(flatten)]
    pub row: ImportRow,
    pub has_errors: bool,
    pub errors: Vec<String>,
    /// 1-based spreadsheet row; the header is row 1.
    pub row_number: usize,
}

/// Response body of a preview upload.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub success: bool,
    /// Error-free rows, ready to commit.
    pub data: Vec<ImportRow>,
    pub preview: Vec<PreviewRow>,
    pub detected_model: TeslaModel,
    pub detection: DetectionResult,
    pub filename: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub price_parsing_stats: PriceParsingStats,
}

const NEGATIVE_PRICE: &str = "Price cannot be negative";

/// Everything a row needs that is fixed for the whole upload.
pub struct RowContext<'a> {
    pub columns: &'a ColumnMap,
    pub model: TeslaModel,
    pub settings: &'a ImportSettings,
}

/// True when every cell of the row is empty or whitespace.
pub fn is_blank_row(cells: &[CellValue]) -> bool {
    cells.iter().all(CellValue::is_blank)
}

/// Builds one preview row. The price parse is returned alongside so the
/// caller can keep upload-wide statistics.
pub fn build_preview_row(
    row_number: usize,
    cells: &[CellValue],
    ctx: &RowContext<'_>,
) -> (PreviewRow, PriceParse) {
    let columns = ctx.columns;
    let text = |field| columns.text(cells, field);

    let name = text(Field::Name).unwrap_or_default();
    let sku = text(Field::Sku).unwrap_or_default();
    let price = normalize_price(columns.cell(cells, Field::Price));
    let tier = |field| text(field).as_deref().and_then(parse_price_text);

    let category = reconcile_category(
        text(Field::Category).as_deref(),
        text(Field::Subcategory).as_deref(),
        ctx.model,
    );

    let oe_number = text(Field::OeNumber);
    let weight = text(Field::Weight);
    let dimensions = text(Field::Dimensions).or_else(|| {
        compose_dimensions(&[text(Field::Length), text(Field::Width), text(Field::Height)])
    });
    let unit_packing = text(Field::UnitPacking);
    let description = describe(
        oe_number.as_deref(),
        weight.as_deref(),
        dimensions.as_deref(),
        unit_packing.as_deref(),
    );

    let mut errors = identity_errors(&name, &sku, ctx.settings);
    if !price.parsed {
        errors.push(format!("Invalid price format: \"{}\"", price.original));
    } else if price.is_negative() {
        errors.push(NEGATIVE_PRICE.to_string());
    }

    let row = ImportRow {
        slug: slugify(&name),
        name,
        sku,
        description,
        price: price.amount,
        price_10: tier(Field::Price10),
        price_50: tier(Field::Price50),
        price_100: tier(Field::Price100),
        category,
        compatible_models: vec![ctx.model],
        oe_number,
        weight,
        dimensions,
        unit_packing,
        full_packing: text(Field::FullPacking),
        stock_quantity: ctx.settings.default_stock_quantity,
        is_active: true,
        track_quantity: true,
        low_stock_threshold: ctx.settings.low_stock_threshold,
    };

    let preview = PreviewRow {
        row,
        has_errors: !errors.is_empty(),
        errors,
        row_number,
    };
    (preview, price)
}

/// Running totals for one upload.
#[derive(Debug, Default)]
pub struct PreviewAccumulator {
    rows: Vec<PreviewRow>,
    stats: PriceParsingStats,
}

impl PreviewAccumulator {
    pub fn push(&mut self, row: PreviewRow, price: &PriceParse) {
        self.stats.record(price);
        self.rows.push(row);
    }

    pub fn finish(self, filename: &str, detection: DetectionResult) -> PreviewResponse {
        let data: Vec<ImportRow> = self
            .rows
            .iter()
            .filter(|row| !row.has_errors)
            .map(|row| row.row.clone())
            .collect();
        let total_rows = self.rows.len();
        let valid_rows = data.len();

        PreviewResponse {
            success: true,
            data,
            preview: self.rows,
            detected_model: detection.model,
            detection,
            filename: filename.to_string(),
            total_rows,
            valid_rows,
            error_rows: total_rows - valid_rows,
            price_parsing_stats: self.stats,
        }
    }
}

/// URL slug: lower-case ASCII alphanumerics separated by single hyphens.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_hyphen = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

fn identity_errors(name: &str, sku: &str, settings: &ImportSettings) -> Vec<String> {
    let mut errors = Vec::new();
    let name = name.trim();
    if name.is_empty() {
        errors.push("Name is required".to_string());
    } else if name.chars().count() < settings.min_name_length {
        errors.push(format!(
            "Name must be at least {} characters",
            settings.min_name_length
        ));
    }

    let sku = sku.trim();
    if sku.is_empty() {
        errors.push("SKU is required".to_string());
    } else if sku.chars().count() < settings.min_sku_length {
        errors.push(format!(
            "SKU must be at least {} characters",
            settings.min_sku_length
        ));
    }
    errors
}

fn compose_dimensions(parts: &[Option<String>]) -> Option<String> {
    let present: Vec<&str> = parts.iter().flatten().map(String::as_str).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join("x"))
    }
}

fn describe(
    oe_number: Option<&str>,
    weight: Option<&str>,
    dimensions: Option<&str>,
    unit_packing: Option<&str>,
) -> Option<String> {
    let parts: Vec<String> = [
        ("OE", oe_number),
        ("Weight", weight),
        ("Dimensions", dimensions),
        ("Packing", unit_packing),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| format!("{label}: {v}")))
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cells(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::from(*v)).collect()
    }

    fn build(header: &[&str], row: &[&str], model: TeslaModel) -> PreviewRow {
        let columns = ColumnMap::from_header(&cells(header));
        let settings = ImportSettings::default();
        let ctx = RowContext {
            columns: &columns,
            model,
            settings: &settings,
        };
        build_preview_row(2, &cells(row), &ctx).0
    }

    const HEADER: &[&str] = &["title", "sku", "price_1pc", "main_category"];

    #[test]
    fn valid_row_gets_defaults_and_slug() {
        let row = build(
            HEADER,
            &["Door Handle", "DH-001", "29.99", "10 - BODY"],
            TeslaModel::ModelY,
        );
        assert!(!row.has_errors);
        assert_eq!(row.row_number, 2);
        assert_eq!(row.row.slug, "door-handle");
        assert_eq!(row.row.price, dec!(29.99));
        assert_eq!(row.row.category, "Model Y - 10 - BODY");
        assert_eq!(row.row.compatible_models, vec![TeslaModel::ModelY]);
        assert_eq!(row.row.stock_quantity, 10);
        assert_eq!(row.row.low_stock_threshold, 5);
        assert!(row.row.is_active && row.row.track_quantity);
    }

    #[test]
    fn short_name_and_sku_are_rejected() {
        let row = build(HEADER, &["ab", "xy", "5", ""], TeslaModel::Model3);
        assert_eq!(
            row.errors,
            vec![
                "Name must be at least 3 characters".to_string(),
                "SKU must be at least 3 characters".to_string(),
            ]
        );

        let row = build(HEADER, &["abc", "xyz", "5", ""], TeslaModel::Model3);
        assert!(!row.has_errors);
    }

    #[test]
    fn missing_identity_fields_are_required() {
        let row = build(HEADER, &["", "", "1", ""], TeslaModel::Model3);
        assert_eq!(row.errors, vec!["Name is required", "SKU is required"]);
    }

    #[test]
    fn garbage_price_error_quotes_original_text() {
        let row = build(HEADER, &["Mirror", "MR-1", "N/A", ""], TeslaModel::Model3);
        assert!(row.has_errors);
        assert_eq!(row.row.price, Decimal::ZERO);
        assert!(row.errors.iter().any(|e| e.contains("N/A")));
    }

    #[test]
    fn negative_price_is_an_error_not_a_zero() {
        let row = build(HEADER, &["Mirror", "MR-1", "-4.50", ""], TeslaModel::Model3);
        assert_eq!(row.errors, vec![NEGATIVE_PRICE]);
        assert_eq!(row.row.price, dec!(-4.50));
    }

    #[test]
    fn empty_price_defaults_to_zero_without_error() {
        let row = build(HEADER, &["Bumper", "BN-002", "", "12 - EXTERIOR"], TeslaModel::ModelY);
        assert!(!row.has_errors);
        assert_eq!(row.row.price, Decimal::ZERO);
    }

    #[test]
    fn description_joins_present_details() {
        let row = build(
            &["title", "sku", "oe_number", "weight", "length", "width", "height", "unit_packing"],
            &["Strut", "ST-100", "1044331-00", "1.2kg", "30", "", "10", "1 pc"],
            TeslaModel::Model3,
        );
        assert_eq!(row.row.dimensions.as_deref(), Some("30x10"));
        assert_eq!(
            row.row.description.as_deref(),
            Some("OE: 1044331-00 | Weight: 1.2kg | Dimensions: 30x10 | Packing: 1 pc")
        );
    }

    #[test]
    fn tier_prices_are_best_effort() {
        let row = build(
            &["title", "sku", "price", "price_10pc", "price_50pc"],
            &["Clip", "CL-1", "2", "$1.80", "n/a"],
            TeslaModel::Model3,
        );
        assert_eq!(row.row.price_10, Some(dec!(1.80)));
        assert_eq!(row.row.price_50, None);
        assert!(!row.has_errors);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Front Bumper -- Lower (Grille) "), "front-bumper-lower-grille");
        assert_eq!(slugify("Model Y - 10 - BODY"), "model-y-10-body");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn import_row_serializes_prices_as_numbers() {
        let row = build(HEADER, &["Door Handle", "DH-001", "29.99", ""], TeslaModel::Model3);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["price"], serde_json::json!(29.99));
        assert_eq!(json["rowNumber"], 2);
        assert_eq!(json["compatibleModels"], serde_json::json!(["MODEL_3"]));
    }
}
