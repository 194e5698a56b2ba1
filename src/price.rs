use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Result of normalizing a price display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOutcome {
    Amount(Decimal),
    /// Promotional placeholder; the product is skipped.
    Zero,
    /// No numeric amount could be found.
    Unparsed,
}

impl PriceOutcome {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            PriceOutcome::Amount(value) => Some(*value),
            PriceOutcome::Zero => Some(Decimal::ZERO),
            PriceOutcome::Unparsed => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, PriceOutcome::Zero)
    }
}

pub fn default_zero_patterns() -> Vec<String> {
    ["0", "0,-", "0.-", "€0", "€0,-", "€0.-", "gratis", "free"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub struct PriceNormalizer {
    number_regex: Regex,
    zero_patterns: Vec<String>,
}

impl PriceNormalizer {
    pub fn new() -> Self {
        Self::with_zero_patterns(&default_zero_patterns())
    }

    pub fn with_zero_patterns(patterns: &[String]) -> Self {
        PriceNormalizer {
            number_regex: Regex::new(r"\d[\d.,]*").expect("static price regex"),
            zero_patterns: patterns.iter().map(|p| compact(p)).collect(),
        }
    }

    pub fn normalize(&self, raw: &str) -> PriceOutcome {
        let text = raw.trim();
        if text.is_empty() {
            return PriceOutcome::Unparsed;
        }

        let compacted = compact(text);
        if self.zero_patterns.iter().any(|p| *p == compacted) {
            return PriceOutcome::Zero;
        }

        match self.parse_amount(text) {
            Some(amount) if amount.is_zero() => PriceOutcome::Zero,
            Some(amount) => PriceOutcome::Amount(amount),
            None => PriceOutcome::Unparsed,
        }
    }

    /// Parse the first numeric fragment, inferring the decimal separator
    /// from the last `,` or `.` it contains.
    fn parse_amount(&self, text: &str) -> Option<Decimal> {
        let fragment = self.number_regex.find(text)?.as_str();
        let fragment = fragment.trim_end_matches([',', '.']);

        let normalized = match fragment.rfind([',', '.']) {
            None => fragment.to_string(),
            Some(index) => {
                let digits_after = fragment.len() - index - 1;
                if digits_after == 3 {
                    // 1.299 / 1,299: grouping, not decimals
                    fragment.replace([',', '.'], "")
                } else {
                    let (whole, fraction) = fragment.split_at(index);
                    format!("{}.{}", whole.replace([',', '.'], ""), &fraction[1..])
                }
            }
        };

        Decimal::from_str(&normalized).ok()
    }
}

impl Default for PriceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
