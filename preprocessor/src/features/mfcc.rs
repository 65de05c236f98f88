//! Log compression and cepstral transform

use ndarray::Array2;
use std::f64::consts::PI;

/// Floor applied before taking the logarithm
pub const AMIN: f32 = 1e-10;
/// Dynamic range kept below the loudest value, in dB
pub const TOP_DB: f32 = 80.0;

/// Power to decibels (reference 1.0), clipped to `max - TOP_DB`
pub fn power_to_db(power: &Array2<f32>) -> Array2<f32> {
    let mut db = power.mapv(|p| 10.0 * p.max(AMIN).log10());

    let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if peak.is_finite() {
        let floor = peak - TOP_DB;
        db.mapv_inplace(|v| v.max(floor));
    }

    db
}

/// Orthonormal DCT-II basis keeping the first `n_keep` coefficients of an
/// `n`-point transform, shaped (`n_keep` × `n`)
pub fn dct_ii_basis(n_keep: usize, n: usize) -> Array2<f32> {
    let scale_first = (1.0 / n as f64).sqrt();
    let scale_rest = (2.0 / n as f64).sqrt();

    Array2::from_shape_fn((n_keep, n), |(k, i)| {
        let scale = if k == 0 { scale_first } else { scale_rest };
        (scale * (PI * k as f64 * (2 * i + 1) as f64 / (2 * n) as f64).cos()) as f32
    })
}
