//! Maps a spreadsheet's category text onto the storefront's canonical
//! category names.
//!
//! The same [`NamingConvention`] is used when the category tree is built, so
//! a name produced here always matches a name the auto-setup creates.

use crate::models::TeslaModel;
use crate::services::category_setup::hierarchy::coded_group_name;

/// How category names are written for one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingConvention {
    pub model: TeslaModel,
    /// Prefixes found in supplier sheets that the canonical tree omits.
    pub strip_prefixes: &'static [&'static str],
    /// Prefix every canonical name carries, unless it already mentions the model.
    pub canonical_prefix: Option<&'static str>,
    /// A main-group label left after stripping a prefix, such as `BODY`,
    /// gains its numeric code. Names that carried no prefix are kept as written.
    pub resolve_group_codes: bool,
}

const MODEL_3_CONVENTION: NamingConvention = NamingConvention {
    model: TeslaModel::Model3,
    strip_prefixes: &["Model 3 - ", "M3 "],
    canonical_prefix: None,
    resolve_group_codes: true,
};

const MODEL_Y_CONVENTION: NamingConvention = NamingConvention {
    model: TeslaModel::ModelY,
    strip_prefixes: &[],
    canonical_prefix: Some("Model Y - "),
    resolve_group_codes: false,
};

const MODEL_S_CONVENTION: NamingConvention = NamingConvention {
    model: TeslaModel::ModelS,
    strip_prefixes: &[],
    canonical_prefix: None,
    resolve_group_codes: false,
};

const MODEL_X_CONVENTION: NamingConvention = NamingConvention {
    model: TeslaModel::ModelX,
    strip_prefixes: &[],
    canonical_prefix: None,
    resolve_group_codes: false,
};

pub fn naming_convention(model: TeslaModel) -> &'static NamingConvention {
    match model {
        TeslaModel::Model3 => &MODEL_3_CONVENTION,
        TeslaModel::ModelY => &MODEL_Y_CONVENTION,
        TeslaModel::ModelS => &MODEL_S_CONVENTION,
        TeslaModel::ModelX => &MODEL_X_CONVENTION,
    }
}

impl NamingConvention {
    /// Rewrites one category name into its canonical form.
    ///
    /// Idempotent: canonicalizing a canonical name returns it unchanged.
    pub fn canonicalize(&self, raw: &str) -> String {
        let name = raw.trim();
        let stripped = self
            .strip_prefixes
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix))
            .map(str::trim);

        let mut canonical = match stripped {
            Some(stripped) if self.resolve_group_codes => {
                coded_group_name(stripped).unwrap_or_else(|| stripped.to_string())
            }
            Some(stripped) => stripped.to_string(),
            None => name.to_string(),
        };

        if let Some(prefix) = self.canonical_prefix {
            let display = self.model.display_name().to_lowercase();
            if !canonical.to_lowercase().contains(&display) {
                canonical = format!("{prefix}{canonical}");
            }
        }
        canonical
    }

    /// Category used when a row names neither a category nor a subcategory.
    pub fn placeholder(&self) -> String {
        format!("{} Parts", self.model.display_name())
    }
}

/// Picks the most specific category a row names and canonicalizes it.
///
/// A non-blank subcategory wins over the main category. Rows with neither
/// get the model's placeholder category.
pub fn reconcile_category(
    category: Option<&str>,
    subcategory: Option<&str>,
    model: TeslaModel,
) -> String {
    let convention = naming_convention(model);
    let chosen = [subcategory, category]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty());

    match chosen {
        Some(raw) => convention.canonicalize(raw),
        None => convention.placeholder(),
    }
}
