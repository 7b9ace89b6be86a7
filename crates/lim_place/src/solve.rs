//! Incremental placement: batches of free groups solved largest first.

use crate::comm::CommTable;
use crate::error::PlaceError;
use crate::formulate::BatchModel;
use crate::group::{AreaGroup, Dimension, Floorplan};
use crate::rules::apply_rules;
use crate::solver::IlpSolver;
use lim_config::PlacementConfig;
use std::collections::BTreeMap;

/// Fixes the dimensions of free groups whose area barely changed since a
/// prior run.
///
/// A group reuses the prior width and height when the prior snapshot placed
/// it and `|area - prior.area| <= tolerance · prior.area`. Locations are not
/// reused. Returns the names of the seeded groups.
pub fn seed_from_prior(
    plan: &mut Floorplan,
    prior: &BTreeMap<String, AreaGroup>,
    tolerance: f64,
) -> Vec<String> {
    let mut seeded = Vec::new();
    for group in plan.groups.values_mut() {
        if group.is_placed() || matches!(group.dimension, Dimension::Fixed { .. }) {
            continue;
        }
        let Some(old) = prior.get(&group.name) else {
            continue;
        };
        let Some((width, height)) = old.dimension.fixed() else {
            continue;
        };
        if (group.area - old.area).abs() <= tolerance * old.area {
            group.dimension = Dimension::Fixed { width, height };
            seeded.push(group.name.clone());
        }
    }
    if !seeded.is_empty() {
        tracing::debug!(count = seeded.len(), "reused prior dimensions");
    }
    seeded
}

/// Free groups in solve order: area descending, then name.
pub fn solve_order(plan: &Floorplan) -> Vec<String> {
    let mut free: Vec<&AreaGroup> = plan.groups.values().filter(|g| !g.is_placed()).collect();
    free.sort_by(|a, b| b.area.total_cmp(&a.area).then_with(|| a.name.cmp(&b.name)));
    free.into_iter().map(|g| g.name.clone()).collect()
}

/// Places every free group of `plan`.
///
/// Special rules run first, then the free groups are solved in batches of
/// the first configured size, each batch seeing all previously placed
/// groups as fixed. If any batch fails the whole ladder step is abandoned
/// and the run restarts from the rule-applied plan with the next size. When
/// every size fails the placement is infeasible.
pub fn solve_ilp_partial(
    plan: &Floorplan,
    comm: &CommTable,
    solver: &dyn IlpSolver,
    config: &PlacementConfig,
    prior: Option<&BTreeMap<String, AreaGroup>>,
) -> Result<Floorplan, PlaceError> {
    let mut base = plan.clone();
    if let Some(prior) = prior {
        seed_from_prior(&mut base, prior, config.area_reuse_tolerance);
    }
    apply_rules(&mut base, &config.rules);

    let order = solve_order(&base);
    if order.is_empty() {
        return Ok(base);
    }

    let mut last_failure = String::from("no batch size configured");
    for &size in config.batch_sizes.iter().filter(|&&s| s > 0) {
        match solve_batches(&base, &order, size, comm, solver, config) {
            Ok(placed) => {
                tracing::info!(
                    groups = order.len(),
                    batch_size = size,
                    solver = solver.name(),
                    "placement solved"
                );
                return Ok(placed);
            }
            Err(e) => {
                tracing::warn!(batch_size = size, "abandoning batch size: {e}");
                last_failure = e.to_string();
            }
        }
    }
    Err(PlaceError::Infeasible(format!(
        "every batch size failed; last failure: {last_failure}"
    )))
}

fn solve_batches(
    base: &Floorplan,
    order: &[String],
    size: usize,
    comm: &CommTable,
    solver: &dyn IlpSolver,
    config: &PlacementConfig,
) -> Result<Floorplan, PlaceError> {
    let mut work = base.clone();
    for batch in order.chunks(size) {
        let built = BatchModel::build(&work, batch, comm, config)?;
        let solution = solver.solve(&built.model)?;
        for p in built.extract(&solution)? {
            if let Some(group) = work.groups.get_mut(&p.name) {
                group.place(p.x, p.y, p.width, p.height);
            }
        }
        tracing::debug!(batch = ?batch, "placed batch");
    }
    verify(&work)?;
    Ok(work)
}

/// Checks chip containment and pairwise separation of a finished plan.
pub fn verify(plan: &Floorplan) -> Result<(), PlaceError> {
    let groups: Vec<&AreaGroup> = plan.groups.values().collect();
    for (i, a) in groups.iter().enumerate() {
        if !plan.contains(a) {
            return Err(PlaceError::Solver(format!("group `{}` leaves the chip", a.name)));
        }
        for b in &groups[i + 1..] {
            let related = a.parent.as_deref() == Some(b.name.as_str())
                || b.parent.as_deref() == Some(a.name.as_str());
            if related || (a.is_empty_box() && b.is_empty_box()) {
                continue;
            }
            if Floorplan::overlaps(a, b) {
                return Err(PlaceError::Solver(format!(
                    "groups `{}` and `{}` overlap",
                    a.name, b.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Chip;
    use crate::model::{IlpModel, Solution};
    use crate::solver::MicroLpSolver;
    use std::cell::Cell;

    fn two_groups(chip: f64) -> Floorplan {
        let mut groups = BTreeMap::new();
        for name in ["a", "b"] {
            let mut g = AreaGroup::new(name);
            g.area = 400.0;
            g.dimension = Dimension::Options(vec![(20.0, 20.0)]);
            groups.insert(name.to_string(), g);
        }
        Floorplan {
            chip: Chip {
                width: chip,
                height: chip,
            },
            groups,
        }
    }

    fn config() -> PlacementConfig {
        PlacementConfig {
            aspect_ratios: vec![1.0],
            ..PlacementConfig::default()
        }
    }

    #[test]
    fn two_groups_do_not_overlap() {
        let plan = two_groups(100.0);
        let mut comm = CommTable::new();
        comm.add("a", "b", 1.0);
        let placed = solve_ilp_partial(&plan, &comm, &MicroLpSolver::default(), &config(), None).unwrap();
        let a = &placed.groups["a"];
        let b = &placed.groups["b"];
        assert!(a.is_placed() && b.is_placed());
        assert_eq!(a.dimension.fixed(), Some((20.0, 20.0)));
        assert!(!Floorplan::overlaps(a, b));
        assert!(placed.contains(a) && placed.contains(b));
        // Communicating groups end up adjacent.
        let (ax, ay) = a.centroid().unwrap();
        let (bx, by) = b.centroid().unwrap();
        assert!(((ax - bx).abs() + (ay - by).abs() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn too_small_chip_is_infeasible() {
        let plan = two_groups(30.0);
        let err = solve_ilp_partial(&plan, &CommTable::new(), &MicroLpSolver::default(), &config(), None)
            .unwrap_err();
        assert!(matches!(err, PlaceError::Infeasible(_)));
    }

    #[test]
    fn solve_order_is_area_then_name() {
        let mut plan = two_groups(100.0);
        plan.groups.get_mut("b").unwrap().area = 500.0;
        let mut c = AreaGroup::new("c");
        c.area = 400.0;
        plan.groups.insert("c".into(), c);
        assert_eq!(solve_order(&plan), vec!["b", "a", "c"]);
    }

    #[test]
    fn prior_dimensions_are_reused_within_tolerance() {
        let mut plan = two_groups(100.0);
        plan.groups.get_mut("a").unwrap().area = 403.0;
        plan.groups.get_mut("b").unwrap().area = 420.0;
        let mut prior = BTreeMap::new();
        for name in ["a", "b"] {
            let mut g = AreaGroup::new(name);
            g.area = 400.0;
            g.place(50.0, 50.0, 40.0, 10.0);
            prior.insert(name.to_string(), g);
        }
        let seeded = seed_from_prior(&mut plan, &prior, 0.01);
        assert_eq!(seeded, vec!["a".to_string()]);
        assert_eq!(plan.groups["a"].dimension.fixed(), Some((40.0, 10.0)));
        assert_eq!(plan.groups["a"].x_loc, None);
        assert!(plan.groups["b"].dimension.fixed().is_none());
    }

    /// Fails any model with more than `max_free` selection blocks.
    struct PickySolver {
        max_free: usize,
        calls: Cell<usize>,
    }

    impl IlpSolver for PickySolver {
        fn name(&self) -> &'static str {
            "picky"
        }

        fn solve(&self, model: &IlpModel) -> Result<Solution, PlaceError> {
            self.calls.set(self.calls.get() + 1);
            let free = model
                .constraints
                .iter()
                .filter(|c| c.name.starts_with("pick_"))
                .count();
            if free < self.max_free {
                MicroLpSolver::default().solve(model)
            } else {
                Err(PlaceError::Infeasible("too many".into()))
            }
        }
    }

    #[test]
    fn failed_batch_size_moves_down_the_ladder() {
        let plan = two_groups(100.0);
        let solver = PickySolver {
            max_free: 2,
            calls: Cell::new(0),
        };
        let cfg = PlacementConfig {
            batch_sizes: vec![2, 1],
            ..config()
        };
        let placed = solve_ilp_partial(&plan, &CommTable::new(), &solver, &cfg, None).unwrap();
        assert!(placed.groups.values().all(|g| g.is_placed()));
        // One failed call with both groups, then one per group.
        assert_eq!(solver.calls.get(), 3);
    }

    #[test]
    fn fixed_groups_are_respected() {
        let mut plan = two_groups(100.0);
        plan.groups.get_mut("a").unwrap().place(50.0, 50.0, 20.0, 20.0);
        let placed = solve_ilp_partial(&plan, &CommTable::new(), &MicroLpSolver::default(), &config(), None).unwrap();
        assert_eq!(placed.groups["a"].centroid(), Some((50.0, 50.0)));
        assert!(!Floorplan::overlaps(&placed.groups["a"], &placed.groups["b"]));
    }
}
