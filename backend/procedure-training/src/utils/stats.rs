/// Arithmetic mean; an empty sample is defined as 0.
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Smallest value, or 0 for an empty sample.
pub fn min_or_zero<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().reduce(f64::min).unwrap_or(0.0)
}

/// Largest value, or 0 for an empty sample.
pub fn max_or_zero<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().reduce(f64::max).unwrap_or(0.0)
}

pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// `part / whole`, with an empty whole defined as 0.
pub fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
