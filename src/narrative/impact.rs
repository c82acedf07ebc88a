//! Pollution impact sentences, scaled from the reference table to a single tree.

use super::template::{format_number, render_template, TemplateParams};
use crate::analysis::convert;
use crate::models::{PollutantRecord, Quantity};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

/// A number (dot or comma decimals) optionally followed by a unit token.
static VALUE_WITH_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+(?:[.,]\d+)?)\s*([^\d\s].*?)?\s*$").expect("valid value regex")
});

/// The first number appearing anywhere in a string.
static FIRST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("valid number regex"));

/// Smallest dependency value ever rendered.
const MIN_DEPENDENCY: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactSentence {
    pub pollutant_code: String,
    /// Ratio between the tree's abatement and the reference row value.
    pub factor: f64,
    pub text: String,
}

/// Canonical form of a pollutant code: subscript digits folded, uppercased, spaces removed.
pub fn normalize_pollutant_code(code: &str) -> String {
    code.chars()
        .filter_map(|c| match c {
            '₀'..='₉' => char::from_digit(c as u32 - '₀' as u32, 10),
            c if c.is_whitespace() => None,
            c => Some(c),
        })
        .collect::<String>()
        .to_uppercase()
}

/// Renders one impact sentence for `code`, trying the matching rows in random order.
///
/// `None` when no row matches the code or when every matching row is malformed.
pub fn generate_impact_sentence<R>(
    code: &str,
    tree_value: &Quantity,
    rows: &[PollutantRecord],
    rng: &mut R,
) -> Option<ImpactSentence>
where
    R: Rng + ?Sized,
{
    let wanted = normalize_pollutant_code(code);
    let mut candidates: Vec<&PollutantRecord> = rows
        .iter()
        .filter(|row| normalize_pollutant_code(&row.pollutant_code) == wanted)
        .collect();

    if candidates.is_empty() {
        debug!("No impact rows for pollutant {}", wanted);
        return None;
    }
    candidates.shuffle(rng);

    let sentence = candidates
        .into_iter()
        .find_map(|row| render_row(&wanted, tree_value, row));
    if sentence.is_none() {
        warn!("Every impact row for pollutant {} was malformed", wanted);
    }
    sentence
}

fn render_row(code: &str, tree_value: &Quantity, row: &PollutantRecord) -> Option<ImpactSentence> {
    let Some((reference, unit)) = parse_value_with_unit(&row.reference_value, &row.unit) else {
        debug!("Skipping row with unparsable reference value '{}'", row.reference_value);
        return None;
    };

    let factor = convert(tree_value.value, &tree_value.unit, &unit) / reference;
    if !factor.is_finite() || factor <= 0.0 {
        debug!("Skipping row with unusable factor {} for {}", factor, code);
        return None;
    }

    let dependency = scale_dependency(&row.dependency_quantity, &row.dependency_unit, factor)?;
    let params = TemplateParams {
        valore: format!("{} {}", format_number(tree_value.value, 2), tree_value.unit)
            .trim_end()
            .to_string(),
        dipendenza: dependency,
        tempo: row.time_span.trim().to_string(),
    };

    match render_template(&row.description_template, &params) {
        Ok(text) => Some(ImpactSentence {
            pollutant_code: code.to_string(),
            factor,
            text,
        }),
        Err(e) => {
            debug!("Skipping row with malformed template: {}", e);
            None
        },
    }
}

/// Parses `"10 kg"` or `"2,5 t"`; a bare number takes `fallback_unit`.
fn parse_value_with_unit(text: &str, fallback_unit: &str) -> Option<(f64, String)> {
    let captures = VALUE_WITH_UNIT.captures(text)?;
    let value = parse_number(captures.get(1)?.as_str())?;
    let unit = captures
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| fallback_unit.trim());
    if unit.is_empty() {
        return None;
    }
    Some((value, unit.to_string()))
}

/// Multiplies the first number in `dependency` by `factor`, keeping the surrounding text.
fn scale_dependency(dependency: &str, fallback_unit: &str, factor: f64) -> Option<String> {
    let number = FIRST_NUMBER.find(dependency)?;
    let scaled = (parse_number(number.as_str())? * factor).max(MIN_DEPENDENCY);

    let mut rendered = String::with_capacity(dependency.len() + 8);
    rendered.push_str(&dependency[..number.start()]);
    rendered.push_str(&format_number(scaled, 2));
    rendered.push_str(&dependency[number.end()..]);

    let has_unit = dependency[number.end()..].chars().any(char::is_alphabetic);
    if !has_unit && !fallback_unit.trim().is_empty() {
        rendered.push(' ');
        rendered.push_str(fallback_unit.trim());
    }
    Some(rendered.trim().to_string())
}

fn parse_number(token: &str) -> Option<f64> {
    token.replace(',', ".").parse::<f64>().ok()
}
