//! Budget-driven source splitting.
//!
//! A source heavier than the budget is cut into pieces whose weights fit it.
//! Area and multi-point sources are first cut node by node; every other kind
//! (and any node still too heavy) is cut into contiguous, balanced rupture
//! ranges. Rates are scaled by each piece's share of the ruptures, so the
//! Poissonian hazard of the pieces equals that of the parent.

use super::{Source, SourceKind};
use rayon::prelude::*;

/// Counters returned by [`split_all`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SplitStats {
    /// Sources given as input.
    pub num_sources: usize,
    /// Sources that had to be split.
    pub num_split: usize,
    /// Sources produced, split or not.
    pub num_pieces: usize,
}

/// Splits `source` so that every piece weighs at most `max_weight`.
///
/// Returns the source unchanged when it already fits. A single rupture is
/// never divided, so when one rupture alone exceeds the budget the pieces
/// hold one rupture each. Piece ids are the parent id followed by `:<n>`.
///
/// # Examples
///
/// ```
/// use hazard_sources::source::{split, Source, SourceKind};
///
/// let src = Source::new("big", SourceKind::SimpleFault, "Active Shallow Crust", 93_219);
/// let pieces = split(&src, 252.0);
///
/// assert_eq!(pieces.len(), 370);
/// assert_eq!(pieces.iter().map(|p| p.num_ruptures).sum::<usize>(), 93_219);
/// assert!(pieces.iter().all(|p| p.weight() <= 252.0));
/// assert_eq!(pieces[0].id.as_str(), "big:0");
/// ```
pub fn split(source: &Source, max_weight: f64) -> Vec<Source> {
    if source.weight() <= max_weight || source.num_ruptures <= 1 {
        return vec![source.clone()];
    }
    let nodes = source.locations.len();
    if source.kind.splits_spatially() && nodes > 1 && source.num_ruptures >= nodes {
        split_nodes(source)
            .into_iter()
            .flat_map(|node| {
                if node.weight() <= max_weight {
                    vec![node]
                } else {
                    split_ruptures(&node, max_weight)
                }
            })
            .collect()
    } else {
        split_ruptures(source, max_weight)
    }
}

/// Splits every source in parallel, keeping input order.
pub fn split_all(sources: &[Source], max_weight: f64) -> (Vec<Source>, SplitStats) {
    let pieces: Vec<Vec<Source>> = sources.par_iter().map(|s| split(s, max_weight)).collect();
    let stats = SplitStats {
        num_sources: sources.len(),
        num_split: pieces.iter().filter(|p| p.len() > 1).count(),
        num_pieces: pieces.iter().map(Vec::len).sum(),
    };
    (pieces.into_iter().flatten().collect(), stats)
}

/// Sizes of `n` balanced parts of `total`; the first `total % n` parts get one more.
fn balanced(total: usize, n: usize) -> impl Iterator<Item = usize> {
    let base = total / n;
    let rem = total % n;
    (0..n).map(move |i| base + usize::from(i < rem))
}

/// One point source per node, ruptures balanced across nodes.
fn split_nodes(source: &Source) -> Vec<Source> {
    let nodes = source.locations.len();
    let share = 1.0 / nodes as f64;
    let mut offset = source.first_rupture;
    source
        .locations
        .iter()
        .zip(balanced(source.num_ruptures, nodes))
        .enumerate()
        .map(|(i, (loc, ruptures))| {
            let piece = Source {
                id: source.id.child(i),
                kind: SourceKind::Point,
                trt: source.trt.clone(),
                num_ruptures: ruptures,
                first_rupture: offset,
                locations: vec![*loc],
                mfd: source.scaled_mfd(share),
                nsites: source.nsites,
                grp_id: source.grp_id,
            };
            offset += ruptures;
            piece
        })
        .collect()
}

/// Contiguous balanced rupture ranges, each within budget.
fn split_ruptures(source: &Source, max_weight: f64) -> Vec<Source> {
    let total = source.num_ruptures;
    let per_piece = ((max_weight / source.unit_weight()).floor() as usize).max(1);
    let n = total.div_ceil(per_piece);
    if n <= 1 {
        return vec![source.clone()];
    }
    let mut offset = source.first_rupture;
    balanced(total, n)
        .enumerate()
        .map(|(i, ruptures)| {
            let piece = Source {
                id: source.id.child(i),
                num_ruptures: ruptures,
                first_rupture: offset,
                mfd: source.scaled_mfd(ruptures as f64 / total as f64),
                ..source.clone()
            };
            offset += ruptures;
            piece
        })
        .collect()
}
