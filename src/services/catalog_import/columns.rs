use std::collections::HashMap;

use super::spreadsheet::CellValue;

/// Semantic fields the importer knows how to pull out of a spreadsheet row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Sku,
    OeNumber,
    UnitPacking,
    FullPacking,
    Price,
    Price10,
    Price50,
    Price100,
    Category,
    Subcategory,
    Weight,
    Dimensions,
    Height,
    Width,
    Length,
}

/// Fields in claim order with their header aliases.
///
/// Specific headers claim their column before generic ones so that
/// `price_10pc` never lands on `price` and `subcategory` never lands on
/// `category` through substring matching.
const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Price10, &["price_10pc"]),
    (Field::Price50, &["price_50pc"]),
    (Field::Price100, &["price_100pc"]),
    (Field::Price, &["price_1pc", "price"]),
    (Field::Subcategory, &["subcategory", "sub_category"]),
    (Field::Category, &["main_category", "category"]),
    (Field::OeNumber, &["oe_number", "oem_number"]),
    (Field::UnitPacking, &["unit_packing"]),
    (Field::FullPacking, &["full_packing"]),
    (Field::Sku, &["sku", "part_number"]),
    (Field::Name, &["title", "product_name", "name"]),
    (Field::Weight, &["weight"]),
    (Field::Dimensions, &["dimensions"]),
    (Field::Height, &["height"]),
    (Field::Width, &["width"]),
    (Field::Length, &["length"]),
];

/// Maps semantic fields to column indices, resolved once from the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn from_header(header: &[CellValue]) -> Self {
        let normalized: Vec<String> = header
            .iter()
            .map(|cell| normalize_header(&cell.to_string()))
            .collect();
        let mut claimed = vec![false; normalized.len()];
        let mut columns = HashMap::new();

        for (field, aliases) in FIELD_ALIASES {
            let exact = normalized
                .iter()
                .enumerate()
                .find(|(i, h)| !claimed[*i] && aliases.contains(&h.as_str()))
                .map(|(i, _)| i);
            let found = exact.or_else(|| {
                normalized
                    .iter()
                    .enumerate()
                    .find(|(i, h)| {
                        !claimed[*i] && !h.is_empty() && aliases.iter().any(|a| h.contains(a))
                    })
                    .map(|(i, _)| i)
            });

            if let Some(index) = found {
                claimed[index] = true;
                columns.insert(*field, index);
            }
        }

        Self { columns }
    }

    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Raw cell for a field, `None` when the column is unmapped or the row is short.
    pub fn cell<'a>(&self, row: &'a [CellValue], field: Field) -> Option<&'a CellValue> {
        self.index_of(field).and_then(|index| row.get(index))
    }

    /// Trimmed text for a field, `None` when missing or blank.
    pub fn text(&self, row: &[CellValue], field: Field) -> Option<String> {
        self.cell(row, field).and_then(CellValue::as_trimmed_text)
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<CellValue> {
        names.iter().map(|n| CellValue::from(*n)).collect()
    }

    #[test]
    fn maps_aliases_case_insensitively() {
        let map = ColumnMap::from_header(&header(&[
            "Title",
            "SKU",
            "OEM Number",
            "Price_1pc",
            "Main_Category",
        ]));

        assert_eq!(map.index_of(Field::Name), Some(0));
        assert_eq!(map.index_of(Field::Sku), Some(1));
        assert_eq!(map.index_of(Field::OeNumber), Some(2));
        assert_eq!(map.index_of(Field::Price), Some(3));
        assert_eq!(map.index_of(Field::Category), Some(4));
        assert!(!map.contains(Field::Subcategory));
    }

    #[test]
    fn tiered_prices_do_not_steal_the_base_price() {
        let map = ColumnMap::from_header(&header(&[
            "price_10pc",
            "price_50pc",
            "price",
            "price_100pc",
        ]));

        assert_eq!(map.index_of(Field::Price10), Some(0));
        assert_eq!(map.index_of(Field::Price50), Some(1));
        assert_eq!(map.index_of(Field::Price), Some(2));
        assert_eq!(map.index_of(Field::Price100), Some(3));
    }

    #[test]
    fn subcategory_and_category_resolve_separately() {
        let map = ColumnMap::from_header(&header(&["sub_category", "category"]));
        assert_eq!(map.index_of(Field::Subcategory), Some(0));
        assert_eq!(map.index_of(Field::Category), Some(1));
    }

    #[test]
    fn substring_matches_apply_when_no_exact_header() {
        let map = ColumnMap::from_header(&header(&["Product Name (EN)", "Part Number", "Weight kg"]));
        assert_eq!(map.index_of(Field::Name), Some(0));
        assert_eq!(map.index_of(Field::Sku), Some(1));
        assert_eq!(map.index_of(Field::Weight), Some(2));
    }

    #[test]
    fn text_ignores_blank_and_missing_cells() {
        let map = ColumnMap::from_header(&header(&["title", "sku"]));
        let row = vec![CellValue::Text("  Mirror ".into())];
        assert_eq!(map.text(&row, Field::Name).as_deref(), Some("Mirror"));
        assert_eq!(map.text(&row, Field::Sku), None);
        assert_eq!(map.text(&row, Field::Weight), None);
    }
}
