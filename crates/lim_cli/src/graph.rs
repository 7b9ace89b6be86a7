//! `lim graph`: assemble the module graph and report unmatched connections.

use lim_diagnostics::DiagnosticSink;

use crate::pipeline::{check_graph, finish, load_graph, resolve_config};
use crate::{GlobalArgs, GraphArgs};

/// Runs the `lim graph` command.
///
/// Returns exit code 0 if the graph is complete (or unmatched connections
/// are tolerated), 1 otherwise.
pub fn run(args: &GraphArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = resolve_config(global)?;
    let sink = DiagnosticSink::new();

    let Some(mut graph) = load_graph(&args.logs, &sink)? else {
        return Ok(finish(&sink, global));
    };
    let accepted = check_graph(&mut graph, &config.graph, args.allow_unmatched, &sink);

    if !global.quiet {
        eprintln!(
            "   Linked {} module(s), {} edge(s), {} unmatched",
            graph.module_count(),
            graph.edges().len(),
            graph.unmatched().len()
        );
    }

    if let Some(path) = &args.dot {
        let dot = graph.to_dot();
        if path.as_os_str() == "-" {
            println!("{dot}");
        } else {
            std::fs::write(path, dot)
                .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        }
    }

    let code = finish(&sink, global);
    Ok(if accepted { code } else { 1 })
}
