//! Sites and the integration-distance filter.

use crate::source::Source;
use hazard_core::types::{Location, SiteId, ValidationError};
use serde::{Deserialize, Serialize};

/// A site where hazard is computed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Site id, its position in the collection.
    pub id: SiteId,
    /// Site location.
    pub location: Location,
    /// Average shear-wave velocity in the upper 30 m, m/s.
    #[serde(default = "default_vs30")]
    pub vs30: f64,
}

fn default_vs30() -> f64 {
    760.0
}

/// Ordered sites with ids `0..n`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteCollection {
    sites: Vec<Site>,
}

impl SiteCollection {
    /// Builds a collection from locations, numbering sites in order.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidInput`] on non-finite coordinates or
    /// latitudes outside [-90, 90].
    pub fn from_locations(
        locations: impl IntoIterator<Item = (Location, f64)>,
    ) -> Result<Self, ValidationError> {
        let mut sites = Vec::new();
        for (i, (location, vs30)) in locations.into_iter().enumerate() {
            if !location.lon.is_finite()
                || !location.lat.is_finite()
                || location.lat.abs() > 90.0
            {
                return Err(ValidationError::InvalidInput(format!(
                    "site {} has invalid coordinates ({}, {})",
                    i, location.lon, location.lat
                )));
            }
            sites.push(Site {
                id: i as SiteId,
                location,
                vs30,
            });
        }
        Ok(Self { sites })
    }

    /// All sites in id order.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns true when there are no sites.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Site by id.
    pub fn get(&self, id: SiteId) -> Option<&Site> {
        self.sites.get(id as usize)
    }
}

/// Selects the sites a source can affect.
///
/// A site is affected when its epicentral distance to the nearest source
/// location is within the integration distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceFilter {
    integration_distance: f64,
}

impl SourceFilter {
    /// Creates a filter with the given integration distance in km.
    pub fn new(integration_distance: f64) -> Self {
        Self {
            integration_distance,
        }
    }

    /// Integration distance in km.
    pub fn integration_distance(&self) -> f64 {
        self.integration_distance
    }

    /// Distance in km from `site` to the closest location of `source`.
    pub fn min_distance(source: &Source, site: &Location) -> Option<f64> {
        source
            .locations
            .iter()
            .map(|loc| loc.epicentral_distance(site))
            .min_by(f64::total_cmp)
    }

    /// Ids of the sites within the integration distance of `source`.
    pub fn affected_sites(&self, source: &Source, sites: &SiteCollection) -> Vec<SiteId> {
        sites
            .sites()
            .iter()
            .filter(|site| {
                Self::min_distance(source, &site.location)
                    .is_some_and(|d| d <= self.integration_distance)
            })
            .map(|site| site.id)
            .collect()
    }

    /// Returns `source` with `nsites` set to its number of affected sites.
    pub fn annotate(&self, mut source: Source, sites: &SiteCollection) -> Source {
        source.nsites = self.affected_sites(&source, sites).len();
        source
    }
}
