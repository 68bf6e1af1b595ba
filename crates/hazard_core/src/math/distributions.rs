//! Standard normal distribution functions.
//!
//! - `norm_cdf`: Cumulative distribution function (CDF)
//! - `norm_sf`: Survival function, `1 - CDF`
//! - `norm_pdf`: Probability density function (PDF)

/// Square root of 2.
const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// 1 / sqrt(2 * pi)
const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Complementary error function approximation using Horner's method.
///
/// Abramowitz and Stegun formula 7.1.26, maximum error 1.5e-7.
#[inline]
fn erfc_approx(x: f64) -> f64 {
    let abs_x = x.abs();

    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let t = 1.0 / (1.0 + P * abs_x);
    let poly = A1 + t * (A2 + t * (A3 + t * (A4 + t * A5)));
    let erfc_abs = t * poly * (-abs_x * abs_x).exp();

    // erfc(-x) = 2 - erfc(x)
    if x < 0.0 {
        2.0 - erfc_abs
    } else {
        erfc_abs
    }
}

/// Standard normal cumulative distribution function.
///
/// Φ(x) = (1/2) * erfc(-x / sqrt(2)), accurate to about 1e-7.
///
/// # Examples
/// ```
/// use hazard_core::math::distributions::norm_cdf;
///
/// assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
/// assert!(norm_cdf(-3.0) < 0.01);
/// assert!(norm_cdf(3.0) > 0.99);
/// ```
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    (0.5 * erfc_approx(-x / SQRT_2)).clamp(0.0, 1.0)
}

/// Standard normal survival function, P(X > x).
///
/// Computed directly from erfc so the upper tail does not lose precision to
/// cancellation in `1 - Φ(x)`.
#[inline]
pub fn norm_sf(x: f64) -> f64 {
    (0.5 * erfc_approx(x / SQRT_2)).clamp(0.0, 1.0)
}

/// Standard normal probability density function.
///
/// # Examples
/// ```
/// use hazard_core::math::distributions::norm_pdf;
///
/// assert!((norm_pdf(0.0) - 0.3989422804).abs() < 1e-7);
/// ```
#[inline]
pub fn norm_pdf(x: f64) -> f64 {
    FRAC_1_SQRT_2PI * (-0.5 * x * x).exp()
}
