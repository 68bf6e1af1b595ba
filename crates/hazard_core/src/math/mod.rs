//! Numerical helpers.

pub mod distributions;

pub use distributions::{norm_cdf, norm_pdf, norm_sf};
