//! Diagonal-favoring alignment prior.
//!
//! An alignment point `(i, j)` of an `m`-token target and `n`-token source
//! is scored by how far it lies from the proportional diagonal:
//!
//! ```text
//! h(i, j, m, n) = -| j/n - i/m |
//! p(j | i, m, n) ∝ exp(tension * h(i, j, m, n))
//! ```
//!
//! `h` is piecewise linear in `j` with a single break at `i*n/m`, so both the
//! partition function and its derivative with respect to the tension are sums
//! of two geometric (resp. arithmetico-geometric) runs and can be evaluated in
//! O(1) instead of summing over every source position.
//!
//! Indices follow the conventional 1-based form: `1 <= i <= m`, `1 <= j <= n`.

/// Below this value of `|ln r| * terms` the arithmetico-geometric run is
/// evaluated by its Taylor series around `r = 1`.
const SERIES_THRESHOLD: f64 = 1e-2;

/// Signed closeness of `(i, j)` to the diagonal, in `(-1, 0]`.
#[inline]
pub fn feature(i: usize, j: usize, m: usize, n: usize) -> f64 {
    -((j as f64) / (n as f64) - (i as f64) / (m as f64)).abs()
}

#[inline]
pub fn unnormalized_prob(i: usize, j: usize, m: usize, n: usize, tension: f64) -> f64 {
    debug_assert!(i > 0);
    debug_assert!(n > 0);
    debug_assert!(m >= i);
    debug_assert!(n >= j);
    (feature(i, j, m, n) * tension).exp()
}

/// Both runs of the split sum: `(first source position, number of terms)`.
/// The run below the diagonal walks downwards from `floor(i*n/m)` to 1, the run
/// above it walks upwards from `floor(i*n/m) + 1` to `n`. Either may be empty.
#[inline]
fn split_runs(i: usize, m: usize, n: usize) -> [(usize, usize); 2] {
    let floor = i * n / m;
    [(floor, floor), (floor + 1, n - floor)]
}

/// Partition function `Σ_{j=1..n} unnormalized_prob(i, j, m, n, tension)`.
pub fn compute_z(i: usize, m: usize, n: usize, tension: f64) -> f64 {
    debug_assert!(i > 0);
    debug_assert!(n > 0);
    debug_assert!(m >= i);
    let log_ratio = -tension / n as f64;
    let mut z = 0.0;
    for (start, terms) in split_runs(i, m, n) {
        if terms != 0 {
            z += unnormalized_prob(i, start, m, n, tension) * geometric_series(log_ratio, terms);
        }
    }
    z
}

/// `d log Z / d tension`, i.e. the expected feature under the prior.
pub fn compute_d_log_z(i: usize, m: usize, n: usize, tension: f64) -> f64 {
    let z = compute_z(i, m, n, tension);
    let log_ratio = -tension / n as f64;
    let d = -1.0 / n as f64;
    let mut weighted = 0.0;
    for (start, terms) in split_runs(i, m, n) {
        if terms != 0 {
            weighted += arithmetico_geometric_series(
                feature(i, start, m, n),
                unnormalized_prob(i, start, m, n, tension),
                log_ratio,
                d,
                terms,
            );
        }
    }
    weighted / z
}

/// `Σ_{k=0..terms-1} r^k` with `r = exp(log_ratio)`.
fn geometric_series(log_ratio: f64, terms: usize) -> f64 {
    if log_ratio == 0.0 {
        return terms as f64;
    }
    (log_ratio * terms as f64).exp_m1() / log_ratio.exp_m1()
}

/// `Σ_{k=0..terms-1} k r^k` with `r = exp(log_ratio)`.
fn weighted_geometric_series(log_ratio: f64, terms: usize) -> f64 {
    let n = terms as f64;
    let x = log_ratio;
    if (x * n).abs() < SERIES_THRESHOLD {
        // Σ k e^{kx} ≈ Σ k + x Σ k² + x²/2 Σ k³ + x³/6 Σ k⁴, k = 0..n-1
        let top = n - 1.0;
        let s1 = top * n / 2.0;
        let s2 = top * n * (2.0 * top + 1.0) / 6.0;
        let s3 = s1 * s1;
        let s4 = top * n * (2.0 * top + 1.0) * (3.0 * top * top + 3.0 * top - 1.0) / 30.0;
        return s1 + x * s2 + x * x * s3 / 2.0 + x * x * x * s4 / 6.0;
    }
    let r = x.exp();
    let rm1 = x.exp_m1();
    r * (1.0 - n * r.powf(n - 1.0) + (n - 1.0) * r.powf(n)) / (rm1 * rm1)
}

/// Sum of the first `terms` values of `(a_1 + d*k) * g_1 * r^k`, `k = 0..terms-1`.
fn arithmetico_geometric_series(a_1: f64, g_1: f64, log_ratio: f64, d: f64, terms: usize) -> f64 {
    g_1 * (a_1 * geometric_series(log_ratio, terms) + d * weighted_geometric_series(log_ratio, terms))
}
