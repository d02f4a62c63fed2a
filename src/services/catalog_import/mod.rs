//! Spreadsheet product import: decode, map columns, detect the model,
//! then validate and reconcile every row into a preview.

pub mod category_mapping;
pub mod columns;
pub mod model_detection;
pub mod preview;
pub mod pricing;
pub mod spreadsheet;

use metrics::{counter, histogram};
use tracing::{debug, info, instrument};

use crate::{config::ImportSettings, errors::ServiceError, models::TeslaModel};

use self::{
    columns::ColumnMap,
    model_detection::{detect_model, DetectionResult},
    preview::{build_preview_row, is_blank_row, PreviewAccumulator, PreviewResponse, RowContext},
    spreadsheet::read_spreadsheet,
};

pub use self::category_mapping::{naming_convention, reconcile_category, NamingConvention};
pub use self::preview::{slugify, ImportRow, PreviewRow};

/// Builds import previews from uploaded spreadsheets. Holds no database
/// handle; nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct ImportPreviewService {
    settings: ImportSettings,
}

impl ImportPreviewService {
    pub fn new(settings: ImportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Parses an upload and returns the per-row preview.
    ///
    /// `model_override` replaces detection for the whole file.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn preview(
        &self,
        filename: &str,
        bytes: &[u8],
        model_override: Option<TeslaModel>,
    ) -> Result<PreviewResponse, ServiceError> {
        let grid = read_spreadsheet(filename, bytes)?;
        let columns = ColumnMap::from_header(grid.header());

        let detection = match model_override {
            Some(model) => DetectionResult::overridden(model),
            None => detect_model(filename, &grid),
        };
        info!(
            model = %detection.model,
            source = ?detection.source,
            confidence = ?detection.confidence,
            "Resolved model for upload"
        );

        let ctx = RowContext {
            columns: &columns,
            model: detection.model,
            settings: &self.settings,
        };

        let mut accumulator = PreviewAccumulator::default();
        for (row_number, cells) in grid.data_rows() {
            if is_blank_row(cells) {
                continue;
            }
            let (row, price) = build_preview_row(row_number, cells, &ctx);
            if !price.parsed {
                debug!(row_number, original = %price.original, "Unparseable price");
            }
            accumulator.push(row, &price);
        }

        let response = accumulator.finish(filename, detection);
        counter!("catalog_import.rows", response.total_rows as u64);
        counter!("catalog_import.row_errors", response.error_rows as u64);
        histogram!("catalog_import.upload_rows", response.total_rows as f64);

        info!(
            filename,
            total = response.total_rows,
            valid = response.valid_rows,
            errors = response.error_rows,
            "Built import preview"
        );
        Ok(response)
    }
}
