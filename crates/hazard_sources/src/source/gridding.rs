//! Collapsing of nearby point sources onto a regular grid.

use super::{MagRate, Source, SourceKind};
use hazard_core::types::geo::{latitude_span, longitude_span};
use hazard_core::types::{Location, SourceId};
use std::collections::{BTreeMap, HashMap};

/// Magnitudes closer than this are merged into one MFD bin.
const MAG_BIN_SCALE: f64 = 100.0;

struct Cell {
    key: (i64, i64),
    members: Vec<Source>,
}

/// Merges point sources falling in the same `spacing_km` cell.
///
/// Cells are laid out in latitude bands of height `spacing_km`; the
/// longitude width of a band is taken at its centre. A cell holding two or
/// more point sources becomes one [`SourceKind::CollapsedPoint`] located at
/// the rate-weighted mean of its members, with the summed MFD and the summed
/// number of ruptures. Cells holding a single point source, and every
/// non-point source, are returned untouched. Lists with fewer than two point
/// sources are returned as given.
///
/// Output order: non-point sources in input order, then cells in the order
/// their first member appeared.
pub fn grid_point_sources(sources: Vec<Source>, spacing_km: f64) -> Vec<Source> {
    let num_points = sources.iter().filter(|s| s.kind == SourceKind::Point).count();
    if num_points < 2 || !(spacing_km > 0.0) {
        return sources;
    }
    let dlat = latitude_span(spacing_km);

    let mut out = Vec::with_capacity(sources.len());
    let mut cells: Vec<Cell> = Vec::new();
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();

    for src in sources {
        let Some(loc) = src.locations.first().copied() else {
            out.push(src);
            continue;
        };
        if src.kind != SourceKind::Point {
            out.push(src);
            continue;
        }
        let row = (loc.lat / dlat).floor() as i64;
        let centre_lat = (row as f64 + 0.5) * dlat;
        let col = (loc.lon / longitude_span(spacing_km, centre_lat)).floor() as i64;
        let key = (row, col);
        match index.get(&key) {
            Some(&i) => cells[i].members.push(src),
            None => {
                index.insert(key, cells.len());
                cells.push(Cell {
                    key,
                    members: vec![src],
                });
            }
        }
    }

    for cell in cells {
        if cell.members.len() == 1 {
            out.extend(cell.members);
        } else {
            out.push(collapse(cell));
        }
    }
    out
}

fn collapse(cell: Cell) -> Source {
    let members = cell.members;
    let total_rate: f64 = members.iter().map(Source::total_rate).sum();

    let mut lon = 0.0;
    let mut lat = 0.0;
    let mut depth = 0.0;
    for m in &members {
        // an all-zero-rate cell falls back to the plain centroid
        let w = if total_rate > 0.0 {
            m.total_rate() / total_rate
        } else {
            1.0 / members.len() as f64
        };
        let loc = m.locations[0];
        lon += w * loc.lon;
        lat += w * loc.lat;
        depth += w * loc.depth;
    }

    let mut bins: BTreeMap<i64, MagRate> = BTreeMap::new();
    for m in &members {
        for bin in &m.mfd {
            let key = (bin.mag * MAG_BIN_SCALE).round() as i64;
            bins.entry(key)
                .and_modify(|b| b.rate += bin.rate)
                .or_insert(MagRate::new(key as f64 / MAG_BIN_SCALE, bin.rate));
        }
    }

    let first = &members[0];
    Source {
        id: SourceId::new(format!("cell_{}_{}", cell.key.0, cell.key.1)),
        kind: SourceKind::CollapsedPoint,
        trt: first.trt.clone(),
        num_ruptures: members.iter().map(|m| m.num_ruptures).sum(),
        first_rupture: 0,
        locations: vec![Location::with_depth(lon, lat, depth)],
        mfd: bins.into_values().collect(),
        nsites: members.iter().map(|m| m.nsites).max().unwrap_or(0),
        grp_id: first.grp_id,
    }
}
