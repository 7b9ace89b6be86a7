//! Elaboration: constraints plus resource estimates become a floorplan.

use crate::constraints::ConstraintSet;
use crate::error::PlaceError;
use crate::group::{AreaGroup, Dimension, Floorplan};
use lim_config::PlacementConfig;
use std::collections::{BTreeMap, BTreeSet};

/// Candidate `(width, height)` pairs for a group of the given area.
///
/// For each ratio `r`: `w = ceil(sqrt(area * r))`, `h = ceil(area / w)`.
/// Duplicate pairs are dropped, first occurrence wins.
pub fn aspect_options(area: f64, ratios: &[f64]) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::new();
    if area <= 0.0 {
        return out;
    }
    for &r in ratios {
        let w = (area * r).sqrt().ceil();
        let h = (area / w).ceil();
        if !out.contains(&(w, h)) {
            out.push((w, h));
        }
    }
    out
}

/// Builds the elaborated floorplan.
///
/// Every resource-table entry that names neither a declared group nor a
/// declared source path gets a group of its own. A group
/// without a `RESOURCES` statement takes its area from the table, looked up
/// by name then by source path; a parent without its own area takes the sum
/// of its children. Groups without a fixed dimension get aspect options.
pub fn elaborate(
    set: ConstraintSet,
    resources: &BTreeMap<String, f64>,
    config: &PlacementConfig,
) -> Result<Floorplan, PlaceError> {
    let chip = set
        .chip
        .ok_or_else(|| PlaceError::Config("chip dimension (`DIMENSION FPGA`) is not declared".into()))?;
    let mut groups = set.groups;
    let declared_paths: BTreeSet<String> = groups
        .values()
        .filter_map(|g| g.source_path.clone())
        .collect();

    for (module, &area) in resources {
        if !groups.contains_key(module) && !declared_paths.contains(module) {
            let mut group = AreaGroup::new(module.clone());
            group.area = area;
            groups.insert(module.clone(), group);
        }
    }

    for group in groups.values_mut() {
        if group.area > 0.0 {
            continue;
        }
        let by_path = group.source_path.as_ref().and_then(|p| resources.get(p));
        if let Some(&area) = resources.get(&group.name).or(by_path) {
            group.area = area;
        }
    }

    let parents: Vec<String> = groups
        .values()
        .filter(|g| !g.children.is_empty() && g.area <= 0.0)
        .map(|g| g.name.clone())
        .collect();
    for name in parents {
        let total: f64 = groups[&name]
            .children
            .iter()
            .filter_map(|c| groups.get(c))
            .map(|c| c.area)
            .sum();
        if let Some(g) = groups.get_mut(&name) {
            g.area = total;
        }
    }

    for group in groups.values_mut() {
        if group.dimension == Dimension::Unset {
            let options = aspect_options(group.area, &config.aspect_ratios);
            if !options.is_empty() {
                group.dimension = Dimension::Options(options);
            }
        }
    }

    tracing::info!(
        groups = groups.len(),
        fixed = groups.values().filter(|g| g.is_placed()).count(),
        "elaborated floorplan"
    );
    Ok(Floorplan { chip, groups })
}
