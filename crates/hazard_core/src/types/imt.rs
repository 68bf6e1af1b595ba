//! Intensity measure types and their levels.

use super::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Intensity measure types with their ordered intensity levels.
///
/// Curves store the levels of all IMTs contiguously, in the iteration
/// order of the map (alphabetical by IMT name), so a curve of length
/// [`Imtls::num_levels`] can be sliced per IMT with [`Imtls::slice`].
///
/// # Examples
///
/// ```
/// use hazard_core::types::Imtls;
///
/// let imtls = Imtls::builder()
///     .imt("PGA", vec![0.1, 0.2, 0.4])
///     .imt("SA(1.0)", vec![0.05, 0.1])
///     .build()
///     .unwrap();
///
/// assert_eq!(imtls.num_levels(), 5);
/// assert_eq!(imtls.slice("SA(1.0)"), Some(3..5));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<f64>>", into = "BTreeMap<String, Vec<f64>>")]
pub struct Imtls {
    levels: BTreeMap<String, Vec<f64>>,
}

impl Imtls {
    /// Creates a builder.
    pub fn builder() -> ImtlsBuilder {
        ImtlsBuilder::default()
    }

    /// Total number of levels across all IMTs.
    pub fn num_levels(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    /// Number of intensity measure types.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns true when no IMT is defined.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterates over `(imt, levels)` in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.levels.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Levels of a single IMT.
    pub fn levels(&self, imt: &str) -> Option<&[f64]> {
        self.levels.get(imt).map(Vec::as_slice)
    }

    /// Index range of an IMT inside a flattened curve.
    pub fn slice(&self, imt: &str) -> Option<std::ops::Range<usize>> {
        let mut start = 0;
        for (name, levels) in &self.levels {
            if name == imt {
                return Some(start..start + levels.len());
            }
            start += levels.len();
        }
        None
    }
}

impl TryFrom<BTreeMap<String, Vec<f64>>> for Imtls {
    type Error = ValidationError;

    fn try_from(levels: BTreeMap<String, Vec<f64>>) -> Result<Self, Self::Error> {
        for (imt, lvls) in &levels {
            validate_levels(imt, lvls)?;
        }
        Ok(Self { levels })
    }
}

impl From<Imtls> for BTreeMap<String, Vec<f64>> {
    fn from(imtls: Imtls) -> Self {
        imtls.levels
    }
}

fn validate_levels(imt: &str, levels: &[f64]) -> Result<(), ValidationError> {
    if levels.is_empty() {
        return Err(ValidationError::InvalidLevels {
            imt: imt.to_string(),
            reason: "no levels given".to_string(),
        });
    }
    if levels.iter().any(|l| !l.is_finite() || *l <= 0.0) {
        return Err(ValidationError::InvalidLevels {
            imt: imt.to_string(),
            reason: "levels must be finite and positive".to_string(),
        });
    }
    if levels.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ValidationError::InvalidLevels {
            imt: imt.to_string(),
            reason: "levels must be strictly increasing".to_string(),
        });
    }
    Ok(())
}

/// Builder for [`Imtls`].
#[derive(Clone, Debug, Default)]
pub struct ImtlsBuilder {
    levels: BTreeMap<String, Vec<f64>>,
}

impl ImtlsBuilder {
    /// Adds an IMT with its levels.
    pub fn imt(mut self, name: impl Into<String>, levels: Vec<f64>) -> Self {
        self.levels.insert(name.into(), levels);
        self
    }

    /// Builds and validates the level set.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLevels`] when an IMT has no levels,
    /// non-positive levels or levels that are not strictly increasing.
    pub fn build(self) -> Result<Imtls, ValidationError> {
        Imtls::try_from(self.levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slices_are_contiguous() {
        let imtls = Imtls::builder()
            .imt("SA(0.5)", vec![0.1, 0.2])
            .imt("PGA", vec![0.1, 0.2, 0.3])
            .build()
            .unwrap();
        // alphabetical storage order: PGA first
        assert_eq!(imtls.slice("PGA"), Some(0..3));
        assert_eq!(imtls.slice("SA(0.5)"), Some(3..5));
        assert_eq!(imtls.slice("PGV"), None);
    }

    #[test]
    fn test_rejects_unsorted_levels() {
        let result = Imtls::builder().imt("PGA", vec![0.2, 0.1]).build();
        assert!(matches!(result, Err(ValidationError::InvalidLevels { .. })));
    }

    #[test]
    fn test_rejects_empty_levels() {
        let result = Imtls::builder().imt("PGA", vec![]).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_positive_levels() {
        let result = Imtls::builder().imt("PGA", vec![0.0, 0.1]).build();
        assert!(result.is_err());
    }
}
