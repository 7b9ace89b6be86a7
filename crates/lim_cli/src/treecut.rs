//! `lim treecut`: partition the module graph into a merge tree.
//!
//! When a placed snapshot exists and placement-driven cutting is enabled the
//! bisection follows the floorplan; otherwise it uses the minimum cut. The
//! JSON tree report is written for the wrapper emitter, and the placed
//! groups are re-saved as the `final` snapshot annotated with their
//! merge-tree instance paths.

use std::path::Path;

use lim_diagnostics::{Diagnostic, DiagnosticSink, Subject};
use lim_place::{Floorplan, PlacedHints};
use lim_snapshot::{SnapshotStore, Stage};
use lim_treecut::{build_tree, CutOptions, NoHints, PlacementHints, TreeCutError};

use crate::pipeline::{
    check_graph, finish, graph_diagnostic, load_graph, resolve_config, EMPTY_GRAPH_CODE,
};
use crate::{GlobalArgs, TreecutArgs};

/// Runs the `lim treecut` command.
pub fn run(args: &TreecutArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = resolve_config(global)?;
    let sink = DiagnosticSink::new();
    let store = SnapshotStore::new(&args.snapshot_dir);

    let Some(mut graph) = load_graph(&args.logs, &sink)? else {
        return Ok(finish(&sink, global));
    };
    if !check_graph(&mut graph, &config.graph, args.allow_unmatched, &sink) {
        return Ok(finish(&sink, global));
    }

    let use_placement = config.treecut.use_placement && !args.no_placement;
    let mut placed = if use_placement {
        store.try_read(Stage::Placed).map(Floorplan::from_groups)
    } else {
        None
    };
    let placed_hints = placed.as_ref().map(|plan| {
        PlacedHints::new(
            plan,
            config.placement.parent_child_weight,
            config.placement.buffer_distance,
        )
        .with_chains(graph.chain_carriers())
    });
    let hints: &dyn PlacementHints = match &placed_hints {
        Some(h) => h,
        None => &NoHints,
    };
    tracing::debug!(placement_driven = placed_hints.is_some(), "partitioning");

    let options = CutOptions {
        rule_threshold: args.threshold.unwrap_or(config.treecut.rule_threshold),
    };
    let tree = match build_tree(&graph, hints, &options) {
        Ok(tree) => tree,
        Err(TreeCutError::EmptyGraph) => {
            sink.emit(Diagnostic::error(
                EMPTY_GRAPH_CODE,
                "no modules to partition",
                Subject::None,
            ));
            return Ok(finish(&sink, global));
        }
        Err(TreeCutError::Graph(err)) => {
            let log = args.logs.last().map_or(Path::new("-"), |p| p.as_path());
            sink.emit(graph_diagnostic(&err, log));
            return Ok(finish(&sink, global));
        }
        Err(err @ TreeCutError::Internal(_)) => return Err(err.into()),
    };

    let report = tree.report(&graph);
    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?,
        None => println!("{json}"),
    }

    if let Some(plan) = placed.as_mut() {
        let annotated = plan.annotate_paths(&tree.module_paths());
        store.write(Stage::Final, &plan.groups)?;
        tracing::info!(annotated, "wrote final snapshot");
    }

    if !global.quiet {
        eprintln!(
            "   Partitioned {} module(s) into {} node(s), {} boundary(ies), depth {}",
            graph.module_count(),
            tree.len(),
            tree.boundaries().len(),
            tree.depth()
        );
    }
    Ok(finish(&sink, global))
}
