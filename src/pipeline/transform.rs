//! Cleaning rules applied to a raw demo record.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::domain::{Amount, Record, RecordStatus};
use crate::error::AcademyError;

/// Leading decimal literal, the way a lenient float parser reads it.
static DECIMAL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("decimal prefix pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    StandardizeName,
    FormatDate,
    CleanCurrency,
}

impl Rule {
    pub const ALL: [Rule; 3] = [Rule::StandardizeName, Rule::FormatDate, Rule::CleanCurrency];

    pub fn label(self) -> &'static str {
        match self {
            Rule::StandardizeName => "Standardize Names",
            Rule::FormatDate => "ISO Date Format",
            Rule::CleanCurrency => "Currency to Float",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rule::StandardizeName => "standardize_name",
            Rule::FormatDate => "format_date",
            Rule::CleanCurrency => "clean_currency",
        };
        f.write_str(s)
    }
}

impl FromStr for Rule {
    type Err = AcademyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "standardize_name" | "standardizename" | "name" => Ok(Rule::StandardizeName),
            "format_date" | "formatdate" | "date" => Ok(Rule::FormatDate),
            "clean_currency" | "cleancurrency" | "currency" | "amount" => Ok(Rule::CleanCurrency),
            other => Err(AcademyError::UnknownRule(other.to_string())),
        }
    }
}

/// Independently toggleable cleaning rules. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformRules {
    pub standardize_name: bool,
    pub format_date: bool,
    pub clean_currency: bool,
}

impl TransformRules {
    pub fn all() -> Self {
        Self {
            standardize_name: true,
            format_date: true,
            clean_currency: true,
        }
    }

    pub fn from_rules<I: IntoIterator<Item = Rule>>(rules: I) -> Self {
        let mut out = Self::default();
        for rule in rules {
            out.set(rule, true);
        }
        out
    }

    pub fn is_enabled(&self, rule: Rule) -> bool {
        match rule {
            Rule::StandardizeName => self.standardize_name,
            Rule::FormatDate => self.format_date,
            Rule::CleanCurrency => self.clean_currency,
        }
    }

    pub fn set(&mut self, rule: Rule, enabled: bool) {
        match rule {
            Rule::StandardizeName => self.standardize_name = enabled,
            Rule::FormatDate => self.format_date = enabled,
            Rule::CleanCurrency => self.clean_currency = enabled,
        }
    }

    pub fn toggle(&mut self, rule: Rule) {
        let current = self.is_enabled(rule);
        self.set(rule, !current);
    }

    pub fn enabled(&self) -> Vec<Rule> {
        Rule::ALL.into_iter().filter(|r| self.is_enabled(*r)).collect()
    }
}

/// Trim, then title-case: lower-case everything and upper-case each letter
/// that follows a non-letter (or starts the string).
pub fn standardize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_is_letter = false;
    for c in name.trim().to_lowercase().chars() {
        if c.is_alphabetic() && !prev_is_letter {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_is_letter = c.is_alphabetic();
    }
    out
}

/// `YYYY/MM/DD` to `YYYY-MM-DD`. Calendar validity is not checked.
pub fn format_date(date: &str) -> String {
    date.replace('/', "-")
}

/// Drop the first `$` and read the rest as a decimal number, skipping
/// leading whitespace.
/// Unparseable text becomes `NaN`; numbers pass through untouched.
pub fn clean_currency(amount: &Amount) -> Amount {
    match amount {
        Amount::Number(n) => Amount::Number(*n),
        Amount::Text(text) => {
            let body = text.replacen('$', "", 1);
            Amount::Number(parse_decimal_prefix(&body))
        }
    }
}

fn parse_decimal_prefix(text: &str) -> f64 {
    let text = text.trim_start();
    DECIMAL_PREFIX
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Produce the cleaned copy of `raw`. Disabled rules leave their field as-is;
/// the output is always tagged `processed`.
pub fn transform(raw: &Record, rules: &TransformRules) -> Record {
    let mut processed = raw.clone();
    processed.status = RecordStatus::Processed;

    if rules.standardize_name {
        processed.name = standardize_name(&raw.name);
    }
    if rules.format_date {
        processed.signup_date = format_date(&raw.signup_date);
    }
    if rules.clean_currency {
        processed.amount = clean_currency(&raw.amount);
    }

    debug!(id = %raw.id, rules = ?rules.enabled(), "Transformed record");
    processed
}

/// Names of the data fields whose value differs between `raw` and `cleaned`.
pub fn changed_fields(raw: &Record, cleaned: &Record) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if raw.name != cleaned.name {
        fields.push("name");
    }
    if raw.signup_date != cleaned.signup_date {
        fields.push("signup_date");
    }
    if !same_amount(&raw.amount, &cleaned.amount) {
        fields.push("amount");
    }
    fields
}

fn same_amount(a: &Amount, b: &Amount) -> bool {
    match (a, b) {
        (Amount::Number(x), Amount::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::demo_data::raw_transform_record;

    #[test]
    fn test_standardize_name() {
        assert_eq!(standardize_name(" john DOE "), "John Doe");
        assert_eq!(standardize_name("mary-jane o'neil"), "Mary-Jane O'Neil");
        assert_eq!(standardize_name("r2d2 unit"), "R2D2 Unit");
        assert_eq!(standardize_name("   "), "");
    }

    #[test]
    fn test_standardize_name_is_idempotent() {
        let once = standardize_name("  aLiCe   smith ");
        assert_eq!(standardize_name(&once), once);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2023/01/15"), "2023-01-15");
        assert_eq!(format_date("2023-01-15"), "2023-01-15");
        assert_eq!(format_date("2023/13/45"), "2023-13-45");
    }

    #[test]
    fn test_clean_currency() {
        assert_eq!(clean_currency(&Amount::from("$100.50")), Amount::Number(100.5));
        assert_eq!(clean_currency(&Amount::from("42")), Amount::Number(42.0));
        assert_eq!(clean_currency(&Amount::from("$12abc")), Amount::Number(12.0));
        assert_eq!(clean_currency(&Amount::Number(7.25)), Amount::Number(7.25));
    }

    #[test]
    fn test_clean_currency_tolerates_padding_around_symbol() {
        assert_eq!(clean_currency(&Amount::from(" $5")), Amount::Number(5.0));
        assert_eq!(clean_currency(&Amount::from("$ 7")), Amount::Number(7.0));
        assert_eq!(clean_currency(&Amount::from("  $1.25 ")), Amount::Number(1.25));
    }

    #[test]
    fn test_clean_currency_unparseable_is_nan() {
        for text in ["$abc", "", "$", "$$5", "USD 5"] {
            let cleaned = clean_currency(&Amount::from(text));
            assert!(cleaned.as_number().unwrap().is_nan(), "{text:?} should be NaN");
        }
    }

    #[test]
    fn test_transform_marks_processed_and_keeps_untouched_fields() {
        let raw = raw_transform_record();
        for mask in 0..8u8 {
            let rules = TransformRules {
                standardize_name: mask & 1 != 0,
                format_date: mask & 2 != 0,
                clean_currency: mask & 4 != 0,
            };
            let out = transform(&raw, &rules);
            assert_eq!(out.status, RecordStatus::Processed);
            assert_eq!(out.id, raw.id);
            if !rules.standardize_name {
                assert_eq!(out.name, raw.name);
            }
            if !rules.format_date {
                assert_eq!(out.signup_date, raw.signup_date);
            }
            if !rules.clean_currency {
                assert_eq!(out.amount, raw.amount);
            }
        }
    }

    #[test]
    fn test_transform_all_rules() {
        let out = transform(&raw_transform_record(), &TransformRules::all());
        assert_eq!(out.name, "John Doe");
        assert_eq!(out.signup_date, "2023-01-15");
        assert_eq!(out.amount, Amount::Number(100.5));
        assert_eq!(changed_fields(&raw_transform_record(), &out), vec!["name", "signup_date", "amount"]);
    }

    #[test]
    fn test_rule_parsing_and_toggle() {
        assert_eq!("format-date".parse::<Rule>().unwrap(), Rule::FormatDate);
        assert_eq!("CLEAN_CURRENCY".parse::<Rule>().unwrap(), Rule::CleanCurrency);
        assert!(matches!("uppercase".parse::<Rule>(), Err(AcademyError::UnknownRule(_))));

        let mut rules = TransformRules::default();
        rules.toggle(Rule::StandardizeName);
        assert_eq!(rules.enabled(), vec![Rule::StandardizeName]);
        rules.toggle(Rule::StandardizeName);
        assert!(rules.enabled().is_empty());
    }
}
