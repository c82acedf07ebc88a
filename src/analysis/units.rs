//! Table-driven conversion between compatible units.
//!
//! Conversion never fails: when no factor is registered for a pair, the value is returned
//! unchanged so that a sentence can still be rendered with approximate units.

use tracing::debug;

/// `(from, to, factor)`: one `from` equals `factor` of `to`. Looked up in both directions.
const FACTORS: &[(&str, &str, f64)] = &[
    // mass
    ("kg", "g", 1_000.0),
    ("g", "mg", 1_000.0),
    ("kg", "mg", 1_000_000.0),
    // length
    ("km", "m", 1_000.0),
    // time
    ("h", "min", 60.0),
    ("min", "s", 60.0),
    ("h", "s", 3_600.0),
    // rate
    ("week", "day", 7.0),
];

/// Spellings found in the reference tables, mapped to the canonical token.
const ALIASES: &[(&str, &str)] = &[
    ("chilogrammo", "kg"),
    ("chilogrammi", "kg"),
    ("kilogrammi", "kg"),
    ("chili", "kg"),
    ("gr", "g"),
    ("grammo", "g"),
    ("grammi", "g"),
    ("milligrammo", "mg"),
    ("milligrammi", "mg"),
    ("chilometro", "km"),
    ("chilometri", "km"),
    ("metro", "m"),
    ("metri", "m"),
    ("ora", "h"),
    ("ore", "h"),
    ("minuto", "min"),
    ("minuti", "min"),
    ("sec", "s"),
    ("secondo", "s"),
    ("secondi", "s"),
    ("days", "day"),
    ("giorno", "day"),
    ("giorni", "day"),
    ("gg", "day"),
    ("weeks", "week"),
    ("settimana", "week"),
    ("settimane", "week"),
    ("sett", "week"),
];

/// Lowercases a unit token and maps known aliases to their canonical form.
pub fn normalize_unit(unit: &str) -> String {
    let lowered = unit.trim().to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lowered)
}

fn simple_factor(from: &str, to: &str) -> Option<f64> {
    if from == to {
        return Some(1.0);
    }
    FACTORS.iter().find_map(|(a, b, factor)| {
        if *a == from && *b == to {
            Some(*factor)
        } else if *a == to && *b == from {
            Some(1.0 / factor)
        } else {
            None
        }
    })
}

/// Multiplier turning a value in `from_unit` into `to_unit`, if a safe conversion exists.
///
/// Compound units (`kg/anno`, `g/giorno`) convert numerator and denominator independently.
pub fn conversion_factor(from_unit: &str, to_unit: &str) -> Option<f64> {
    let from = normalize_unit(from_unit);
    let to = normalize_unit(to_unit);

    match (from.split_once('/'), to.split_once('/')) {
        (None, None) => simple_factor(&from, &to),
        (Some((num_from, den_from)), Some((num_to, den_to))) => {
            let numerator = simple_factor(&normalize_unit(num_from), &normalize_unit(num_to))?;
            let denominator = simple_factor(&normalize_unit(den_from), &normalize_unit(den_to))?;
            Some(numerator / denominator)
        },
        _ => None,
    }
}

/// Converts `value` between units, returning it unchanged when no factor is registered.
pub fn convert(value: f64, from_unit: &str, to_unit: &str) -> f64 {
    if from_unit == to_unit {
        return value;
    }
    match conversion_factor(from_unit, to_unit) {
        Some(factor) => value * factor,
        None => {
            debug!(
                "No conversion registered from '{}' to '{}'; using value as is",
                from_unit, to_unit
            );
            value
        },
    }
}
