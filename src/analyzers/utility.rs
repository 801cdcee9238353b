/// Arithmetic mean of the present values. `None` when nothing is present.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// Largest present value. `None` when nothing is present.
pub fn max(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::max)
}

/// Rounds to 3 decimal places, ties to even.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}

/// Integer count from a reduced value, truncating toward zero.
pub fn to_count(value: f64) -> i64 {
    value.trunc() as i64
}
