//! Statistics over realizations: weighted mean and quantile curves and
//! hazard maps.

use crate::aggregator::HazardCurves;
use crate::error::{EngineError, NumericError};
use crate::pmap::ProbabilityMap;
use hazard_core::types::SiteId;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// Weighted mean of `values`; weights need not be normalised.
///
/// ```
/// use hazard_engine::statistics::weighted_mean;
///
/// assert_eq!(weighted_mean(&[1.0, 3.0], &[1.0, 3.0]), 2.5);
/// ```
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total
}

/// Weighted quantile by linear interpolation of the empirical CDF.
///
/// Values are sorted, their normalised cumulative weights form the CDF, and
/// `q` is interpolated on it; below the first step the smallest value is
/// returned, above the last the largest.
///
/// ```
/// use hazard_engine::statistics::weighted_quantile;
///
/// let values = [4.0, 1.0, 3.0, 2.0];
/// let weights = [0.25; 4];
/// assert_eq!(weighted_quantile(&values, &weights, 0.5), 2.0);
/// assert_eq!(weighted_quantile(&values, &weights, 0.625), 2.5);
/// assert_eq!(weighted_quantile(&values, &weights, 0.1), 1.0);
/// ```
pub fn weighted_quantile(values: &[f64], weights: &[f64], q: f64) -> f64 {
    let mut pairs: Vec<(f64, f64)> = values.iter().copied().zip(weights.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let total: f64 = pairs.iter().map(|p| p.1).sum();

    let mut cum = 0.0;
    let mut prev: Option<(f64, f64)> = None;
    for (value, weight) in &pairs {
        cum += weight / total;
        if q <= cum {
            return match prev {
                None => *value,
                Some((c0, v0)) if cum > c0 => v0 + (value - v0) * (q - c0) / (cum - c0),
                Some(_) => *value,
            };
        }
        prev = Some((cum, *value));
    }
    pairs.last().map(|p| p.0).unwrap_or(f64::NAN)
}

/// Level at which a decreasing curve reaches probability `poe`.
///
/// Interpolates linearly in log-log space between the two levels bracketing
/// `poe`. Returns 0 when the curve never reaches `poe` and the last level
/// when it exceeds `poe` everywhere.
///
/// ```
/// use hazard_engine::statistics::hazard_map_value;
///
/// let levels = [0.1, 0.2, 0.4];
/// let poes = [0.5, 0.1, 0.01];
/// assert!((hazard_map_value(&levels, &poes, 0.1) - 0.2).abs() < 1e-12);
/// assert_eq!(hazard_map_value(&levels, &poes, 0.9), 0.0);
/// assert_eq!(hazard_map_value(&levels, &poes, 0.001), 0.4);
/// ```
pub fn hazard_map_value(levels: &[f64], poes: &[f64], poe: f64) -> f64 {
    let (Some(&first), Some(&last)) = (poes.first(), poes.last()) else {
        return 0.0;
    };
    if first < poe {
        return 0.0;
    }
    if last >= poe {
        return levels.last().copied().unwrap_or(0.0);
    }
    for i in 0..poes.len() - 1 {
        let (p0, p1) = (poes[i], poes[i + 1]);
        if p0 >= poe && poe > p1 {
            let x0 = p0.max(f64::MIN_POSITIVE).ln();
            let x1 = p1.max(f64::MIN_POSITIVE).ln();
            let (y0, y1) = (levels[i].ln(), levels[i + 1].ln());
            let t = (poe.ln() - x0) / (x1 - x0);
            return (y0 + t * (y1 - y0)).exp();
        }
    }
    0.0
}

/// One cell of a hazard map.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HazardMapRow {
    /// `mean` or `quantile-<q>`.
    pub statistic: String,
    /// Site id.
    pub site: SiteId,
    /// Intensity measure type.
    pub imt: String,
    /// Target probability of exceedance.
    pub poe: f64,
    /// Intensity level reaching it.
    pub iml: f64,
}

/// Mean and quantile curves over the realizations, with their hazard maps.
#[derive(Clone, Debug, PartialEq)]
pub struct HazardStatistics {
    /// Weighted mean curves.
    pub mean: ProbabilityMap,
    /// `(q, curves)` for each requested quantile.
    pub quantiles: Vec<(f64, ProbabilityMap)>,
    /// Hazard maps of every statistic.
    pub maps: Vec<HazardMapRow>,
}

/// Computes statistics of `curves` with realization `weights`.
///
/// Sites absent from a realization count as zero curves there.
///
/// # Errors
///
/// [`NumericError::InvalidWeight`] for NaN or negative weights or a
/// zero total, [`NumericError::LevelMismatch`] when the number of weights
/// differs from the number of realizations.
pub fn compute_statistics(
    curves: &HazardCurves,
    weights: &[f64],
    quantiles: &[f64],
    poes: &[f64],
) -> Result<HazardStatistics, EngineError> {
    if weights.len() != curves.num_rlzs() {
        return Err(NumericError::LevelMismatch {
            expected: curves.num_rlzs(),
            got: weights.len(),
        }
        .into());
    }
    if let Some(&w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(NumericError::InvalidWeight(w).into());
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(NumericError::InvalidWeight(total).into());
    }

    let num_levels = curves.imtls().num_levels();
    let sites: BTreeSet<SiteId> = curves.maps().iter().flat_map(ProbabilityMap::sites).collect();

    let per_site: Vec<(SiteId, Vec<f64>, Vec<Vec<f64>>)> = sites
        .par_iter()
        .map(|&site| {
            let site_curves: Vec<Vec<f64>> = curves.maps().iter().map(|m| m.curve_or_zero(site)).collect();
            let mut mean = vec![0.0; num_levels];
            let mut qs = vec![vec![0.0; num_levels]; quantiles.len()];
            let mut column = vec![0.0; site_curves.len()];
            for level in 0..num_levels {
                for (slot, curve) in column.iter_mut().zip(&site_curves) {
                    *slot = curve[level];
                }
                mean[level] = weighted_mean(&column, weights);
                for (k, q) in quantiles.iter().enumerate() {
                    qs[k][level] = weighted_quantile(&column, weights, *q);
                }
            }
            (site, mean, qs)
        })
        .collect();

    let mut mean = ProbabilityMap::new(num_levels);
    let mut quantile_maps: Vec<(f64, ProbabilityMap)> =
        quantiles.iter().map(|q| (*q, ProbabilityMap::new(num_levels))).collect();
    for (site, m, qs) in per_site {
        mean.insert(site, m)?;
        for ((_, map), curve) in quantile_maps.iter_mut().zip(qs) {
            map.insert(site, curve)?;
        }
    }

    let mut maps = hazard_maps("mean", &mean, curves, poes);
    for (q, map) in &quantile_maps {
        maps.extend(hazard_maps(&format!("quantile-{q}"), map, curves, poes));
    }

    Ok(HazardStatistics {
        mean,
        quantiles: quantile_maps,
        maps,
    })
}

fn hazard_maps(statistic: &str, pmap: &ProbabilityMap, curves: &HazardCurves, poes: &[f64]) -> Vec<HazardMapRow> {
    let mut rows = Vec::new();
    for (site, curve) in pmap.iter() {
        for (imt, levels) in curves.imtls().iter() {
            let Some(range) = curves.imtls().slice(imt) else {
                continue;
            };
            for &poe in poes {
                rows.push(HazardMapRow {
                    statistic: statistic.to_string(),
                    site,
                    imt: imt.to_string(),
                    poe,
                    iml: hazard_map_value(levels, &curve[range.clone()], poe),
                });
            }
        }
    }
    rows
}
