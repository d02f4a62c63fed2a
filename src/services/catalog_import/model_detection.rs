use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::spreadsheet::SpreadsheetGrid;
use crate::models::TeslaModel;

/// Where a detection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Filename,
    Content,
    Default,
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DetectionConfidence {
    Low,
    Medium,
    High,
}

/// The file-wide model decision plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub model: TeslaModel,
    pub source: DetectionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_token: Option<String>,
    /// Content token counts per model; empty when the filename decided.
    pub counts: BTreeMap<TeslaModel, usize>,
    pub confidence: DetectionConfidence,
}

impl DetectionResult {
    pub fn overridden(model: TeslaModel) -> Self {
        Self {
            model,
            source: DetectionSource::Override,
            matched_token: None,
            counts: BTreeMap::new(),
            confidence: DetectionConfidence::High,
        }
    }

    /// True when the guess is weak enough that a human should confirm it.
    pub fn needs_confirmation(&self) -> bool {
        self.confidence == DetectionConfidence::Low
    }
}

struct ModelTokens {
    model: TeslaModel,
    /// Matched anywhere in the lower-cased filename.
    long: &'static [&'static str],
    /// Matched only as a whole token between non-alphanumerics.
    short: &'static [&'static str],
    content: Lazy<Regex>,
}

static MODEL_TOKENS: [ModelTokens; 4] = [
    ModelTokens {
        model: TeslaModel::Model3,
        long: &["model3", "model_3", "model-3", "model 3"],
        short: &["m3"],
        content: Lazy::new(|| Regex::new(r"\bmodel[\s_-]?3\b|\bm3\b").expect("valid regex")),
    },
    ModelTokens {
        model: TeslaModel::ModelY,
        long: &["modely", "model_y", "model-y", "model y"],
        short: &["my"],
        content: Lazy::new(|| Regex::new(r"\bmodel[\s_-]?y\b|\bmy\b").expect("valid regex")),
    },
    ModelTokens {
        model: TeslaModel::ModelS,
        long: &["model_s", "model-s", "model s"],
        short: &["ms"],
        content: Lazy::new(|| Regex::new(r"\bmodel[\s_-]s\b|\bms\b").expect("valid regex")),
    },
    ModelTokens {
        model: TeslaModel::ModelX,
        long: &["modelx", "model_x", "model-x", "model x"],
        short: &["mx"],
        content: Lazy::new(|| Regex::new(r"\bmodel[\s_-]?x\b|\bmx\b").expect("valid regex")),
    },
];

/// Infers the Tesla model an uploaded file describes.
///
/// Filename tokens win outright, checked in priority order. Otherwise the
/// data rows are scanned and the model with the most token hits wins, ties
/// going to the higher-priority model. With no evidence at all the result is
/// MODEL_3 at low confidence.
#[instrument(skip(grid), fields(rows = grid.len()))]
pub fn detect_model(filename: &str, grid: &SpreadsheetGrid) -> DetectionResult {
    if let Some(result) = detect_from_filename(filename) {
        debug!(model = %result.model, token = ?result.matched_token, "Model detected from filename");
        return result;
    }

    let content = grid.content_text().to_lowercase();
    let counts: BTreeMap<TeslaModel, usize> = MODEL_TOKENS
        .iter()
        .map(|tokens| (tokens.model, tokens.content.find_iter(&content).count()))
        .collect();

    let mut best: Option<(TeslaModel, usize)> = None;
    for model in TeslaModel::in_priority_order() {
        let count = counts.get(&model).copied().unwrap_or(0);
        if count > 0 && best.map_or(true, |(_, top)| count > top) {
            best = Some((model, count));
        }
    }

    let result = match best {
        Some((model, top)) => {
            let tied = counts.values().filter(|c| **c == top).count() > 1;
            DetectionResult {
                model,
                source: DetectionSource::Content,
                matched_token: None,
                counts,
                confidence: if tied {
                    DetectionConfidence::Low
                } else {
                    DetectionConfidence::Medium
                },
            }
        }
        None => DetectionResult {
            model: TeslaModel::default(),
            source: DetectionSource::Default,
            matched_token: None,
            counts,
            confidence: DetectionConfidence::Low,
        },
    };

    debug!(model = %result.model, source = ?result.source, "Model detected from content");
    result
}

fn detect_from_filename(filename: &str) -> Option<DetectionResult> {
    let lower = filename.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    MODEL_TOKENS.iter().find_map(|tokens| {
        let hit = tokens
            .long
            .iter()
            .find(|token| lower.contains(**token))
            .or_else(|| tokens.short.iter().find(|token| words.contains(*token)))?;

        Some(DetectionResult {
            model: tokens.model,
            source: DetectionSource::Filename,
            matched_token: Some((*hit).to_string()),
            counts: BTreeMap::new(),
            confidence: DetectionConfidence::High,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: Vec<Vec<&str>>) -> SpreadsheetGrid {
        SpreadsheetGrid::from_strings(rows)
    }

    #[test]
    fn filename_wins_regardless_of_content() {
        let content = grid(vec![
            vec!["title", "category"],
            vec!["Frunk strut", "Model Y - 10 - BODY"],
            vec!["Trunk strut", "Model Y - 10 - BODY"],
        ]);
        let result = detect_model("model3_parts.xlsx", &content);

        assert_eq!(result.model, TeslaModel::Model3);
        assert_eq!(result.source, DetectionSource::Filename);
        assert_eq!(result.matched_token.as_deref(), Some("model3"));
        assert_eq!(result.confidence, DetectionConfidence::High);
        assert!(!result.needs_confirmation());
    }

    #[test]
    fn short_tokens_need_word_boundaries() {
        let empty = SpreadsheetGrid::default();
        assert_eq!(detect_model("MY_2024_import.csv", &empty).model, TeslaModel::ModelY);
        assert_eq!(detect_model("m3-bumpers.csv", &empty).model, TeslaModel::Model3);
        // "items" contains "ms" but not as a token
        assert_eq!(detect_model("items.csv", &empty).source, DetectionSource::Default);
    }

    #[test]
    fn content_counts_pick_the_most_frequent_model() {
        let content = grid(vec![
            vec!["title", "category"],
            vec!["Mirror", "Model Y - 12 - EXTERIOR"],
            vec!["Handle", "Model Y - 10 - BODY"],
            vec!["Seal", "Model 3 - BODY"],
        ]);
        let result = detect_model("supplier_export.csv", &content);

        assert_eq!(result.model, TeslaModel::ModelY);
        assert_eq!(result.source, DetectionSource::Content);
        assert_eq!(result.counts[&TeslaModel::ModelY], 2);
        assert_eq!(result.counts[&TeslaModel::Model3], 1);
        assert_eq!(result.confidence, DetectionConfidence::Medium);
    }

    #[test]
    fn content_ties_follow_priority_and_flag_low_confidence() {
        let content = grid(vec![
            vec!["title", "fits"],
            vec!["Wiper", "Model X"],
            vec!["Wiper", "Model S"],
        ]);
        let result = detect_model("wipers.csv", &content);

        assert_eq!(result.model, TeslaModel::ModelS);
        assert!(result.needs_confirmation());
    }

    #[test]
    fn header_row_is_not_evidence() {
        let content = grid(vec![vec!["model 3 title"], vec!["Plain part"]]);
        let result = detect_model("export.csv", &content);
        assert_eq!(result.source, DetectionSource::Default);
        assert_eq!(result.model, TeslaModel::Model3);
    }

    #[test]
    fn detection_is_deterministic() {
        let content = grid(vec![
            vec!["title"],
            vec!["model y trim"],
            vec!["model 3 trim"],
        ]);
        let first = detect_model("a.csv", &content);
        let second = detect_model("a.csv", &content);
        assert_eq!(first, second);
        assert_eq!(first.model, TeslaModel::Model3);
    }
}
