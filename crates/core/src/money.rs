//! Monetary rounding. Every amount crossing a write boundary goes through
//! [`round2`] so repeated edits never accumulate floating-point drift.

/// Round to 2 decimal places (half away from zero).
#[must_use]
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // Normalize -0.0 so stored documents never carry a negative zero.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Sum a sequence of amounts and round the result to 2 decimals.
#[must_use]
pub fn sum2<I>(amounts: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    round2(amounts.into_iter().sum())
}
