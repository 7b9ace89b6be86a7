//! `lim place`: elaborate area groups and solve the floorplan.
//!
//! 1. Parse the constraint file and the resource table
//! 2. Elaborate areas and aspect options; write the `elaborated` snapshot
//! 3. Derive traffic from the module graph, if logs are given
//! 4. Seed dimensions from the previous `placed` snapshot
//! 5. Solve incrementally and write the `placed` snapshot
//!
//! A run that fails to produce a floorplan deletes the `placed` and `final`
//! snapshots of earlier runs, so `lim treecut` falls back to the minimum cut.

use std::collections::BTreeMap;
use std::path::Path;

use lim_diagnostics::DiagnosticSink;
use lim_place::{elaborate, parse_constraints, solve_ilp_partial, solver_for, CommTable, Floorplan};
use lim_snapshot::{SnapshotError, SnapshotStore, Stage};

use crate::pipeline::{finish, load_graph, place_diagnostic, resolve_config};
use crate::{GlobalArgs, PlaceArgs};

/// Runs the `lim place` command.
pub fn run(args: &PlaceArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = resolve_config(global)?;
    if let Some(choice) = args.solver {
        config.placement.solver = choice.into();
    }
    let sink = DiagnosticSink::new();
    let store = SnapshotStore::new(&args.snapshot_dir);

    let source = std::fs::read_to_string(&args.constraints)
        .map_err(|e| format!("cannot read {}: {e}", args.constraints.display()))?;
    let resources = match &args.resources {
        Some(path) => read_resources(path)?,
        None => BTreeMap::new(),
    };

    let plan = match parse_constraints(&source)
        .and_then(|set| elaborate(set, &resources, &config.placement))
    {
        Ok(plan) => plan,
        Err(err) => {
            sink.emit(place_diagnostic(&err, &args.constraints));
            discard_stale_placement(&store)?;
            return Ok(finish(&sink, global));
        }
    };
    store.write(Stage::Elaborated, &plan.groups)?;

    let comm = if args.logs.is_empty() {
        CommTable::new()
    } else {
        match load_graph(&args.logs, &sink)? {
            Some(graph) => CommTable::from_graph(&graph),
            None => return Ok(finish(&sink, global)),
        }
    };

    let prior = if args.no_reuse {
        None
    } else {
        store.try_read(Stage::Placed)
    };
    let solver = solver_for(&config.placement);
    let placed = match solve_ilp_partial(
        &plan,
        &comm,
        solver.as_ref(),
        &config.placement,
        prior.as_ref(),
    ) {
        Ok(placed) => placed,
        Err(err) => {
            sink.emit(place_diagnostic(&err, &args.constraints));
            discard_stale_placement(&store)?;
            return Ok(finish(&sink, global));
        }
    };
    let path = store.write(Stage::Placed, &placed.groups)?;

    if !global.quiet {
        print_plan(&placed);
        eprintln!(
            "   Placed {} group(s) on {}x{}, wrote {}",
            placed.groups.len(),
            placed.chip.width,
            placed.chip.height,
            path.display()
        );
    }
    Ok(finish(&sink, global))
}

fn discard_stale_placement(store: &SnapshotStore) -> Result<(), SnapshotError> {
    for stage in [Stage::Placed, Stage::Final] {
        if store.remove(stage)? {
            tracing::info!(stage = %stage, "discarded snapshot from an earlier placement");
        }
    }
    Ok(())
}

/// Reads the JSON resource table `{ "<module>": <area>, ... }`.
fn read_resources(path: &Path) -> Result<BTreeMap<String, f64>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let table: BTreeMap<String, f64> = serde_json::from_str(&text)
        .map_err(|e| format!("invalid resource table {}: {e}", path.display()))?;
    Ok(table)
}

fn print_plan(plan: &Floorplan) {
    for group in plan.groups.values() {
        match (group.bounds(), group.is_empty_box()) {
            (_, true) => println!("{:<24} empty box", group.name),
            (Some((x0, y0, x1, y1)), false) => {
                println!("{:<24} ({x0}, {y0}) .. ({x1}, {y1})", group.name)
            }
            (None, false) => println!("{:<24} unplaced", group.name),
        }
    }
}
