//! Closed set of source typologies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source typology.
///
/// Each kind carries a relative cost factor used by the weigher and selects
/// the splitting strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Single point.
    Point,
    /// Point sources merged on a grid cell.
    CollapsedPoint,
    /// Area source discretised into a grid of nodes.
    Area,
    /// Set of point nodes sharing one MFD.
    MultiPoint,
    /// Planar fault.
    SimpleFault,
    /// Fault described by several edges.
    ComplexFault,
    /// Fixed-geometry characteristic rupture.
    Characteristic,
    /// Explicit list of ruptures with occurrence probabilities.
    NonParametric,
}

impl SourceKind {
    /// Relative computational cost of one rupture of this kind.
    ///
    /// Complex geometries cost about twice a planar rupture to process.
    pub fn weight_factor(self) -> f64 {
        match self {
            SourceKind::ComplexFault | SourceKind::Characteristic => 2.0,
            SourceKind::Point
            | SourceKind::CollapsedPoint
            | SourceKind::Area
            | SourceKind::MultiPoint
            | SourceKind::SimpleFault
            | SourceKind::NonParametric => 1.0,
        }
    }

    /// Whether the source is split node by node before splitting ruptures.
    pub fn splits_spatially(self) -> bool {
        matches!(self, SourceKind::Area | SourceKind::MultiPoint)
    }

    /// Short code used in diagnostics tables.
    pub fn code(self) -> &'static str {
        match self {
            SourceKind::Point => "P",
            SourceKind::CollapsedPoint => "p",
            SourceKind::Area => "A",
            SourceKind::MultiPoint => "M",
            SourceKind::SimpleFault => "S",
            SourceKind::ComplexFault => "C",
            SourceKind::Characteristic => "X",
            SourceKind::NonParametric => "N",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Point => "point",
            SourceKind::CollapsedPoint => "collapsed_point",
            SourceKind::Area => "area",
            SourceKind::MultiPoint => "multi_point",
            SourceKind::SimpleFault => "simple_fault",
            SourceKind::ComplexFault => "complex_fault",
            SourceKind::Characteristic => "characteristic",
            SourceKind::NonParametric => "non_parametric",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_factors() {
        assert_eq!(SourceKind::Point.weight_factor(), 1.0);
        assert_eq!(SourceKind::ComplexFault.weight_factor(), 2.0);
        assert_eq!(SourceKind::Characteristic.weight_factor(), 2.0);
    }

    #[test]
    fn test_spatial_split_kinds() {
        assert!(SourceKind::Area.splits_spatially());
        assert!(SourceKind::MultiPoint.splits_spatially());
        assert!(!SourceKind::SimpleFault.splits_spatially());
    }

    #[test]
    fn test_display_matches_serde_name() {
        assert_eq!(SourceKind::MultiPoint.to_string(), "multi_point");
        assert_eq!(SourceKind::CollapsedPoint.code(), "p");
    }
}
