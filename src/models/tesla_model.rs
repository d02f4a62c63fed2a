use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

/// Tesla vehicle line a part belongs to.
///
/// The declaration order doubles as the detection priority: when two models
/// score equally, the one declared first wins.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
pub enum TeslaModel {
    #[serde(rename = "MODEL_3")]
    #[strum(serialize = "MODEL_3")]
    Model3,
    #[serde(rename = "MODEL_Y")]
    #[strum(serialize = "MODEL_Y")]
    ModelY,
    #[serde(rename = "MODEL_S")]
    #[strum(serialize = "MODEL_S")]
    ModelS,
    #[serde(rename = "MODEL_X")]
    #[strum(serialize = "MODEL_X")]
    ModelX,
}

impl Default for TeslaModel {
    fn default() -> Self {
        TeslaModel::Model3
    }
}

impl TeslaModel {
    /// All models in priority order.
    pub fn in_priority_order() -> impl Iterator<Item = TeslaModel> {
        TeslaModel::iter()
    }

    /// Human-readable name, e.g. "Model Y".
    pub fn display_name(&self) -> &'static str {
        match self {
            TeslaModel::Model3 => "Model 3",
            TeslaModel::ModelY => "Model Y",
            TeslaModel::ModelS => "Model S",
            TeslaModel::ModelX => "Model X",
        }
    }

    /// Wire token, e.g. "MODEL_Y".
    pub fn as_token(&self) -> &'static str {
        match self {
            TeslaModel::Model3 => "MODEL_3",
            TeslaModel::ModelY => "MODEL_Y",
            TeslaModel::ModelS => "MODEL_S",
            TeslaModel::ModelX => "MODEL_X",
        }
    }

    /// Lenient parse used for user-supplied override tokens.
    ///
    /// Accepts the wire token in any case as well as the display name
    /// ("model y", "Model_Y", "MODEL_Y").
    pub fn parse_override(raw: &str) -> Option<TeslaModel> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();

        TeslaModel::iter().find(|model| model.as_token().replace('_', "") == normalized)
    }
}
