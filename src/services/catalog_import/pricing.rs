use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use super::spreadsheet::CellValue;

/// Outcome of normalizing one price cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceParse {
    /// Parsed amount; zero when the cell was blank or unparseable.
    pub amount: Decimal,
    /// False only for non-empty text that is not a number.
    pub parsed: bool,
    /// Original cell text, kept for error messages.
    pub original: String,
}

impl PriceParse {
    fn blank() -> Self {
        Self {
            amount: Decimal::ZERO,
            parsed: true,
            original: String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.original.trim().is_empty()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

/// Per-upload parse counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct PriceParsingStats {
    pub successes: usize,
    pub errors: usize,
}

impl PriceParsingStats {
    pub fn record(&mut self, parse: &PriceParse) {
        if parse.parsed {
            self.successes += 1;
        } else {
            self.errors += 1;
        }
    }
}

/// Normalizes a raw price cell.
///
/// Blank cells are zero and count as parsed. Currency symbols, thousands
/// separators, whitespace and a leading or trailing `CAD` marker are
/// stripped before parsing. Negative amounts are returned as-is so the caller
/// can reject them.
pub fn normalize_price(cell: Option<&CellValue>) -> PriceParse {
    let Some(cell) = cell else {
        return PriceParse::blank();
    };
    if cell.is_blank() {
        return PriceParse::blank();
    }

    let original = cell.to_string().trim().to_string();
    let amount = match cell {
        CellValue::Int(value) => Some(Decimal::from(*value)),
        _ => parse_price_text(&original),
    };

    match amount {
        Some(amount) => PriceParse {
            amount,
            parsed: true,
            original,
        },
        None => PriceParse {
            amount: Decimal::ZERO,
            parsed: false,
            original,
        },
    }
}

/// Parses price text such as `"$1,234.56 CAD"`.
pub fn parse_price_text(raw: &str) -> Option<Decimal> {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.len() >= 3 && cleaned.is_char_boundary(3) && cleaned[..3].eq_ignore_ascii_case("cad")
    {
        cleaned.drain(..3);
    }
    let len = cleaned.len();
    if len >= 3 && cleaned.is_char_boundary(len - 3) && cleaned[len - 3..].eq_ignore_ascii_case("cad")
    {
        cleaned.truncate(len - 3);
    }

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}
