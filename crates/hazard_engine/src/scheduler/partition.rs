//! Bin-packing of weighted sources into tasks.

use hazard_sources::Source;
use std::cmp::Ordering;

/// Sources packed together, with their total weight.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    /// Sources of the block.
    pub sources: Vec<Source>,
    /// Sum of the source weights.
    pub weight: f64,
}

/// Greedy first-fit decreasing packing.
///
/// Sources are taken heaviest first (ties by id) and placed in the first
/// block with room left; a source heavier than `max_weight` gets a block of
/// its own. Every block but those singletons weighs at most `max_weight`.
/// The result depends only on the multiset of sources.
///
/// # Examples
///
/// ```
/// use hazard_engine::scheduler::partition::first_fit_decreasing;
/// use hazard_sources::{Source, SourceKind};
///
/// let sources = vec![
///     Source::new("a", SourceKind::Point, "ASC", 6),
///     Source::new("b", SourceKind::Point, "ASC", 5),
///     Source::new("c", SourceKind::Point, "ASC", 4),
///     Source::new("d", SourceKind::Point, "ASC", 12),
/// ];
/// let blocks = first_fit_decreasing(sources, 10.0);
///
/// let ids: Vec<Vec<&str>> = blocks
///     .iter()
///     .map(|b| b.sources.iter().map(|s| s.id.as_str()).collect())
///     .collect();
/// assert_eq!(ids, vec![vec!["d"], vec!["a", "c"], vec!["b"]]);
/// ```
pub fn first_fit_decreasing(mut sources: Vec<Source>, max_weight: f64) -> Vec<Block> {
    sources.sort_by(|a, b| {
        b.weight()
            .partial_cmp(&a.weight())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut blocks: Vec<Block> = Vec::new();
    for source in sources {
        let w = source.weight();
        if w > max_weight {
            blocks.push(Block {
                sources: vec![source],
                weight: w,
            });
            continue;
        }
        match blocks.iter_mut().find(|b| b.weight + w <= max_weight) {
            Some(block) => {
                block.weight += w;
                block.sources.push(source);
            }
            None => blocks.push(Block {
                sources: vec![source],
                weight: w,
            }),
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_sources::SourceKind;
    use proptest::prelude::*;

    fn sources(sizes: &[usize]) -> Vec<Source> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, n)| Source::new(format!("s{i:03}"), SourceKind::Point, "ASC", *n))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(first_fit_decreasing(Vec::new(), 10.0).is_empty());
    }

    #[test]
    fn test_ties_broken_by_id() {
        let mut input = sources(&[3, 3, 3]);
        input.reverse();
        let blocks = first_fit_decreasing(input, 6.0);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].sources[0].id.as_str(), "s000");
        assert_eq!(blocks[0].sources[1].id.as_str(), "s001");
        assert_eq!(blocks[1].sources[0].id.as_str(), "s002");
    }

    proptest! {
        #[test]
        fn prop_blocks_respect_budget(sizes in prop::collection::vec(1usize..50, 0..60), budget in 10.0f64..80.0) {
            let input = sources(&sizes);
            let total: f64 = input.iter().map(Source::weight).sum();
            let blocks = first_fit_decreasing(input, budget);

            let packed: usize = blocks.iter().map(|b| b.sources.len()).sum();
            prop_assert_eq!(packed, sizes.len());
            let weight: f64 = blocks.iter().map(|b| b.weight).sum();
            prop_assert!((weight - total).abs() < 1e-9);
            for block in &blocks {
                prop_assert!(block.weight <= budget || block.sources.len() == 1);
            }
        }

        #[test]
        fn prop_order_independent(sizes in prop::collection::vec(1usize..30, 1..30)) {
            let forward = first_fit_decreasing(sources(&sizes), 40.0);
            let mut reversed_input = sources(&sizes);
            reversed_input.reverse();
            let backward = first_fit_decreasing(reversed_input, 40.0);
            prop_assert_eq!(forward, backward);
        }
    }
}
