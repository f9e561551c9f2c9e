pub trait FloatExt {
    fn approximately_eq(self, other: Self) -> bool;
}

impl FloatExt for f32 {
    fn approximately_eq(self, other: Self) -> bool {
        (self - other).abs() < crate::EPSILON as f32
    }
}

impl FloatExt for f64 {
    fn approximately_eq(self, other: Self) -> bool {
        (self - other).abs() < crate::EPSILON
    }
}

/// Quantile of an ascending-sorted slice with linear interpolation
/// between ranks. `q` is clamped to `[0, 1]`.
pub fn quantile_sorted(sorted: &[f32], q: f32) -> f32 {
    assert!(!sorted.is_empty(), "quantile of an empty slice");

    let q = q.clamp(0.0, 1.0);
    let rank = q as f64 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }

    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
