//! `lim tour`: order placed area groups along a short closed tour.

use lim_place::{tour_groups, Floorplan};
use lim_snapshot::{SnapshotStore, Stage};

use crate::pipeline::resolve_config;
use crate::{GlobalArgs, TourArgs};

/// Runs the `lim tour` command.
///
/// Reads the `final` snapshot, or the `placed` one when no tree has been
/// built yet, and prints one group name per line in tour order.
pub fn run(args: &TourArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = resolve_config(global)?;
    if let Some(seed) = args.seed {
        config.tour.seed = seed;
    }
    let store = SnapshotStore::new(&args.snapshot_dir);
    let stage = if store.exists(Stage::Final) {
        Stage::Final
    } else {
        Stage::Placed
    };
    let plan = Floorplan::from_groups(store.read(stage)?);

    let order = tour_groups(&plan, &config.tour);
    for name in &order {
        println!("{name}");
    }
    if !global.quiet {
        eprintln!("   Ordered {} group(s) from the {stage} snapshot", order.len());
    }
    Ok(0)
}
