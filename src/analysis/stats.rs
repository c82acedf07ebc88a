//! Null-tolerant aggregates over sequences of optional samples.
//!
//! Missing and non-finite entries are filtered out first. Every aggregate of an empty
//! (or all-missing) sequence is `0.0`, so downstream renderers never see `NaN`.

fn present<I>(values: I) -> impl Iterator<Item = f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().filter(|v| v.is_finite())
}

pub fn count_present<I>(values: I) -> usize
where
    I: IntoIterator<Item = Option<f64>>,
{
    present(values).count()
}

pub fn sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    present(values).sum()
}

pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (total, count) = present(values).fold((0.0, 0usize), |(t, c), v| (t + v, c + 1));
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

pub fn max<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    present(values).reduce(f64::max).unwrap_or(0.0)
}

pub fn min<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    present(values).reduce(f64::min).unwrap_or(0.0)
}

/// Population standard deviation.
pub fn std_dev<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let samples: Vec<f64> = present(values).collect();
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let avg = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Mean that distinguishes "no data" from a real zero.
pub fn mean_opt<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let samples: Vec<Option<f64>> = present(values).map(Some).collect();
    if samples.is_empty() {
        None
    } else {
        Some(mean(samples))
    }
}
