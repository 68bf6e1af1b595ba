//! Classical Poissonian hazard kernel.
//!
//! For each source location and magnitude bin, the bin rate (shared evenly
//! by the locations) times the probability that the ground motion exceeds
//! each level gives an exceedance rate; over the investigation time `T` the
//! probability of exceedance is `1 - exp(-T · Σ rate · p)`. Only sites within
//! the integration distance contribute.

use crate::error::{EngineError, NumericError};
use crate::pmap::ProbabilityMap;
use crate::wire::{SourceTiming, TaskInput, TaskOutput};
use hazard_core::math::{norm_cdf, norm_sf};
use hazard_core::types::Imtls;
use hazard_sources::gsim::{GroundMotion, RuptureContext};
use hazard_sources::{GsimRegistry, SiteCollection, Source, SourceFilter};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Parameters of the kernel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelParams {
    /// Investigation time in years.
    pub investigation_time: f64,
    /// Truncation of the ground-motion distribution in standard deviations.
    pub truncation_level: Option<f64>,
    /// Integration distance in km.
    pub maximum_distance: f64,
}

/// Read-only snapshot shared by every task.
#[derive(Clone, Debug)]
pub struct CalcContext {
    /// Sites.
    pub sites: Arc<SiteCollection>,
    /// Intensity measure types and levels.
    pub imtls: Imtls,
    /// Ground-motion models.
    pub registry: GsimRegistry,
    /// Kernel parameters.
    pub params: KernelParams,
}

/// Probability that ln(IM) exceeds `ln_level`.
///
/// With a truncation level `t` the normal distribution is truncated at
/// `±t` standard deviations and renormalised; `t = 0` or `sigma = 0` gives a
/// step at the mean.
///
/// ```
/// use hazard_engine::kernel::prob_exceedance;
/// use hazard_sources::gsim::GroundMotion;
///
/// let gm = GroundMotion { mean_ln: 0.0, sigma: 1.0 };
/// assert!((prob_exceedance(0.0, &gm, None) - 0.5).abs() < 1e-7);
/// assert_eq!(prob_exceedance(3.5, &gm, Some(3.0)), 0.0);
/// ```
pub fn prob_exceedance(ln_level: f64, gm: &GroundMotion, truncation: Option<f64>) -> f64 {
    if gm.sigma <= 0.0 || truncation == Some(0.0) {
        return if gm.mean_ln > ln_level { 1.0 } else { 0.0 };
    }
    let z = (ln_level - gm.mean_ln) / gm.sigma;
    match truncation {
        None => norm_sf(z),
        Some(t) => {
            if z >= t {
                0.0
            } else if z <= -t {
                1.0
            } else {
                let upper = norm_cdf(t);
                let lower = norm_cdf(-t);
                // round-off near z = t can leave the mass above z slightly negative
                let above = (upper - norm_cdf(z)).max(0.0);
                (above / (upper - lower)).min(1.0)
            }
        }
    }
}

/// Runs the kernel on one task.
///
/// # Errors
///
/// [`EngineError::Source`] for unknown models or unsupported IMTs,
/// [`EngineError::Numeric`] if a probability falls outside [0, 1].
pub fn compute(ctx: &CalcContext, input: &TaskInput) -> Result<TaskOutput, EngineError> {
    let num_levels = ctx.imtls.num_levels();
    let mut pmaps: BTreeMap<_, _> = input
        .gsims
        .iter()
        .map(|g| (g.clone(), ProbabilityMap::new(num_levels)))
        .collect();
    let models = input
        .gsims
        .iter()
        .map(|g| ctx.registry.get(g).map(|m| (g.clone(), m)))
        .collect::<Result<Vec<_>, _>>()?;
    let log_levels: Vec<(String, Vec<f64>)> = ctx
        .imtls
        .iter()
        .map(|(imt, lvls)| (imt.to_string(), lvls.iter().map(|l| l.ln()).collect()))
        .collect();

    let filter = SourceFilter::new(ctx.params.maximum_distance);
    let mut source_times = Vec::with_capacity(input.sources.len());

    for src in &input.sources {
        let start = Instant::now();
        let affected = filter.affected_sites(src, &ctx.sites);
        if !affected.is_empty() && !src.locations.is_empty() {
            for (name, model) in &models {
                let rates = exceedance_rates(ctx, src, &affected, model.as_ref(), &log_levels)?;
                let pmap = pmaps.entry(name.clone()).or_insert_with(|| ProbabilityMap::new(num_levels));
                for (site, rate) in affected.iter().zip(rates) {
                    let curve: Vec<f64> = rate
                        .iter()
                        .map(|r| -(-ctx.params.investigation_time * r).exp_m1())
                        .collect();
                    pmap.combine_curve(*site, &curve)?;
                }
            }
        }
        source_times.push(SourceTiming {
            id: src.id.clone(),
            kind: src.kind,
            num_ruptures: src.num_ruptures,
            num_sites: affected.len(),
            seconds: start.elapsed().as_secs_f64(),
        });
    }

    Ok(TaskOutput {
        grp_id: input.grp_id,
        pmaps,
        source_times,
    })
}

/// Annual exceedance rates of one source, one row per affected site.
fn exceedance_rates(
    ctx: &CalcContext,
    src: &Source,
    affected: &[u32],
    model: &dyn hazard_sources::GroundMotionModel,
    log_levels: &[(String, Vec<f64>)],
) -> Result<Vec<Vec<f64>>, EngineError> {
    let num_levels = ctx.imtls.num_levels();
    let share = 1.0 / src.locations.len() as f64;
    let mut rates = vec![vec![0.0; num_levels]; affected.len()];

    for loc in &src.locations {
        for (row, site_id) in rates.iter_mut().zip(affected) {
            let Some(site) = ctx.sites.get(*site_id) else {
                continue;
            };
            if loc.epicentral_distance(&site.location) > ctx.params.maximum_distance {
                continue;
            }
            let distance_km = loc.hypocentral_distance(&site.location);
            for bin in &src.mfd {
                let rate = bin.rate * share;
                if rate == 0.0 {
                    continue;
                }
                let rctx = RuptureContext {
                    mag: bin.mag,
                    distance_km,
                    vs30: site.vs30,
                };
                let mut offset = 0;
                for (imt, levels) in log_levels {
                    let gm = model.ground_motion(&rctx, imt)?;
                    for (i, ln_level) in levels.iter().enumerate() {
                        row[offset + i] +=
                            rate * prob_exceedance(*ln_level, &gm, ctx.params.truncation_level);
                    }
                    offset += levels.len();
                }
            }
        }
    }

    for row in &rates {
        if let Some(value) = row.iter().copied().find(|r| !r.is_finite() || *r < 0.0) {
            return Err(NumericError::InvalidWeight(value).into());
        }
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hazard_core::types::{GroupId, Location};
    use hazard_sources::gsim::{LinearLogCoeffs, LinearLogModel};
    use hazard_sources::source::split;
    use hazard_sources::{MagRate, SourceKind};

    fn context() -> CalcContext {
        let sites = SiteCollection::from_locations(vec![
            (Location::new(0.0, 0.0), 760.0),
            (Location::new(0.3, 0.0), 400.0),
            (Location::new(5.0, 5.0), 760.0),
        ])
        .unwrap();
        let model = LinearLogModel::new("LinearLog").with_imt("PGA", LinearLogCoeffs::default());
        CalcContext {
            sites: Arc::new(sites),
            imtls: Imtls::builder().imt("PGA", vec![0.01, 0.1, 0.5]).build().unwrap(),
            registry: GsimRegistry::builder().register(Arc::new(model)).build(),
            params: KernelParams {
                investigation_time: 50.0,
                truncation_level: Some(3.0),
                maximum_distance: 200.0,
            },
        }
    }

    fn fault() -> Source {
        Source::new("f", SourceKind::SimpleFault, "ASC", 60)
            .with_locations(vec![Location::with_depth(0.1, 0.0, 5.0), Location::with_depth(0.2, 0.0, 5.0)])
            .with_mfd(vec![MagRate::new(5.5, 0.02), MagRate::new(6.5, 0.004)])
    }

    fn input(sources: Vec<Source>) -> TaskInput {
        TaskInput {
            grp_id: GroupId(0),
            gsims: vec!["LinearLog".into()],
            sources,
        }
    }

    #[test]
    fn test_curves_decrease_with_level() {
        let out = compute(&context(), &input(vec![fault()])).unwrap();
        let pmap = &out.pmaps[&"LinearLog".into()];
        let curve = pmap.curve(0).unwrap();
        assert!(curve[0] > curve[1] && curve[1] > curve[2]);
        assert!(curve.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_far_site_untouched() {
        let out = compute(&context(), &input(vec![fault()])).unwrap();
        assert!(out.pmaps[&"LinearLog".into()].curve(2).is_none());
        assert_eq!(out.source_times[0].num_sites, 2);
    }

    #[test]
    fn test_split_pieces_give_parent_hazard() {
        let ctx = context();
        let parent = compute(&ctx, &input(vec![fault()])).unwrap();
        let pieces = split(&fault(), 7.0);
        assert!(pieces.len() > 1);
        let split_out = compute(&ctx, &input(pieces)).unwrap();
        let a = &parent.pmaps[&"LinearLog".into()];
        let b = &split_out.pmaps[&"LinearLog".into()];
        for site in [0, 1] {
            for (x, y) in a.curve(site).unwrap().iter().zip(b.curve(site).unwrap()) {
                assert_relative_eq!(*x, *y, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn test_unknown_gsim_fails() {
        let mut inp = input(vec![fault()]);
        inp.gsims = vec!["Missing".into()];
        assert!(matches!(compute(&context(), &inp), Err(EngineError::Source(_))));
    }

    #[test]
    fn test_truncation_behaviour() {
        let gm = GroundMotion {
            mean_ln: 0.0,
            sigma: 1.0,
        };
        assert_eq!(prob_exceedance(-3.5, &gm, Some(3.0)), 1.0);
        assert_eq!(prob_exceedance(0.1, &gm, Some(0.0)), 0.0);
        assert_eq!(prob_exceedance(-0.1, &gm, Some(0.0)), 1.0);
        let untruncated = prob_exceedance(1.0, &gm, None);
        let truncated = prob_exceedance(1.0, &gm, Some(3.0));
        assert!(truncated < untruncated);
        assert_relative_eq!(untruncated, 0.158655, epsilon = 1e-6);
    }

    /// Test: just inside the truncation bounds the probability stays in
    /// [0, 1] and moves monotonically towards the bound values
    #[test]
    fn test_truncation_edges() {
        let gm = GroundMotion {
            mean_ln: 0.0,
            sigma: 1.0,
        };
        let t = 3.0;
        let mut previous = 1.0;
        for eps in [1e-3, 1e-6, 1e-9, 1e-12, 1e-15] {
            let near_upper = prob_exceedance(t - eps, &gm, Some(t));
            let near_lower = prob_exceedance(-t + eps, &gm, Some(t));
            assert!((0.0..=1.0).contains(&near_upper), "{}", near_upper);
            assert!((0.0..=1.0).contains(&near_lower), "{}", near_lower);
            assert!(near_upper <= previous);
            assert!(near_upper < 1e-2);
            assert!(near_lower > 0.99);
            previous = near_upper;
        }
        // mean shifted so that z lands on ±t through floating-point arithmetic
        let shifted = GroundMotion {
            mean_ln: 0.1,
            sigma: 0.3,
        };
        for level in [0.1 + 0.3 * t, 0.1 - 0.3 * t] {
            let p = prob_exceedance(level, &shifted, Some(t));
            assert!((0.0..=1.0).contains(&p), "{}", p);
        }
    }
}
