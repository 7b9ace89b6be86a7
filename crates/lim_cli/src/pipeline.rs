//! Shared pipeline steps used by multiple `lim` subcommands.
//!
//! Handles configuration lookup, log loading and graph assembly, and the
//! mapping of library errors onto rendered diagnostics.

use std::path::{Path, PathBuf};

use lim_config::{GraphConfig, LinkerConfig};
use lim_diagnostics::{
    Category, Diagnostic, DiagnosticCode, DiagnosticRenderer, DiagnosticSink, Severity, Subject,
    TerminalRenderer,
};
use lim_graph::{extract, GraphError, LiGraph};
use lim_place::PlaceError;

use crate::GlobalArgs;

/// A module or connection declaration contradicts another.
pub const GRAPH_CONFIG_CODE: DiagnosticCode = DiagnosticCode::new(Category::Error, 101);
/// A dangling-connection record could not be parsed.
pub const MALFORMED_RECORD_CODE: DiagnosticCode = DiagnosticCode::new(Category::Error, 102);
/// The graph has no modules.
pub const EMPTY_GRAPH_CODE: DiagnosticCode = DiagnosticCode::new(Category::Error, 103);
/// A constraint statement could not be parsed.
pub const CONSTRAINT_PARSE_CODE: DiagnosticCode = DiagnosticCode::new(Category::Placement, 101);
/// The constraints are contradictory.
pub const CONSTRAINT_CONFIG_CODE: DiagnosticCode = DiagnosticCode::new(Category::Placement, 102);
/// No feasible placement exists.
pub const INFEASIBLE_CODE: DiagnosticCode = DiagnosticCode::new(Category::Placement, 103);
/// The ILP backend failed.
pub const SOLVER_CODE: DiagnosticCode = DiagnosticCode::new(Category::Placement, 104);

/// Loads the linker configuration.
///
/// Uses `--config` when given, otherwise `lim.toml` in the current
/// directory, otherwise the defaults.
pub fn resolve_config(global: &GlobalArgs) -> Result<LinkerConfig, Box<dyn std::error::Error>> {
    let config = match &global.config {
        Some(path) => lim_config::load_config_file(Path::new(path))?,
        None => lim_config::load_config(&std::env::current_dir()?)?,
    };
    Ok(config)
}

/// Reads every log and merges the resulting graphs in command-line order.
///
/// Extraction and merge failures are emitted to `sink`; the function then
/// returns `Ok(None)`. I/O failures are returned as errors.
pub fn load_graph(
    logs: &[PathBuf],
    sink: &DiagnosticSink,
) -> Result<Option<LiGraph>, Box<dyn std::error::Error>> {
    let mut graph = LiGraph::empty();
    for path in logs {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let part = extract::parse_log(&text).and_then(LiGraph::new);
        let merged = part.and_then(|part| graph.merge(part));
        if let Err(err) = merged {
            sink.emit(graph_diagnostic(&err, path));
            return Ok(None);
        }
        tracing::debug!(log = %path.display(), modules = graph.module_count(), "merged log");
    }
    Ok(Some(graph))
}

/// Trims optional connections and checks for unmatched required ones.
///
/// Returns `false` if the graph is not acceptable for later stages.
pub fn check_graph(
    graph: &mut LiGraph,
    config: &GraphConfig,
    allow_unmatched: bool,
    sink: &DiagnosticSink,
) -> bool {
    if config.trim_optional {
        let removed = graph.trim_optional(sink);
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "trimmed unmatched optional connections");
        }
    }
    graph
        .check_unmatched(sink, allow_unmatched || config.allow_unmatched)
        .is_ok()
}

/// Maps a graph error onto a diagnostic pointing at the offending input.
pub fn graph_diagnostic(err: &GraphError, log: &Path) -> Diagnostic {
    match err {
        GraphError::MalformedRecord { line, reason } => Diagnostic::error(
            MALFORMED_RECORD_CODE,
            format!("malformed connection record: {reason}"),
            Subject::Line {
                file: log.display().to_string(),
                line: *line,
            },
        ),
        GraphError::DuplicateModule { name } => {
            Diagnostic::error(GRAPH_CONFIG_CODE, err.to_string(), Subject::Module(name.clone()))
                .with_note(format!("while merging {}", log.display()))
        }
        GraphError::TypeMismatch {
            name,
            first_module,
            second_module,
            ..
        } => Diagnostic::error(
            GRAPH_CONFIG_CODE,
            err.to_string(),
            Subject::Connection {
                module: second_module.clone(),
                name: name.clone(),
            },
        )
        .with_label(lim_diagnostics::Label::secondary(
            Subject::Module(first_module.clone()),
            "first declared here",
        )),
        GraphError::Unmatched { .. } => {
            Diagnostic::error(GRAPH_CONFIG_CODE, err.to_string(), Subject::None)
        }
    }
}

/// Maps a placement error onto a diagnostic.
pub fn place_diagnostic(err: &PlaceError, constraints: &Path) -> Diagnostic {
    match err {
        PlaceError::Parse { line, message } => Diagnostic::error(
            CONSTRAINT_PARSE_CODE,
            message.clone(),
            Subject::Line {
                file: constraints.display().to_string(),
                line: *line,
            },
        ),
        PlaceError::Config(_) => {
            Diagnostic::error(CONSTRAINT_CONFIG_CODE, err.to_string(), Subject::None)
        }
        PlaceError::Infeasible(_) => Diagnostic::error(INFEASIBLE_CODE, err.to_string(), Subject::None)
            .with_help("enlarge the chip or relax fixed dimensions"),
        PlaceError::Solver(_) | PlaceError::Io(_) => {
            Diagnostic::error(SOLVER_CODE, err.to_string(), Subject::None)
        }
    }
}

/// Renders every diagnostic in `sink` to stderr and returns the exit code.
pub fn finish(sink: &DiagnosticSink, global: &GlobalArgs) -> i32 {
    let diagnostics = sink.take_all();
    let renderer = TerminalRenderer::new(global.color);
    for diag in &diagnostics {
        if global.quiet && diag.severity != Severity::Error {
            continue;
        }
        eprint!("{}", renderer.render(diag));
    }
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    if !global.quiet && (errors > 0 || warnings > 0) {
        eprintln!("   Result: {errors} error(s), {warnings} warning(s)");
    }
    if errors > 0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: None,
        }
    }

    const USER_LOG: &str = "\
compiling user
DanglingSend:{Bit#(32)}:0:req:False:32:user:None
DanglingRecv:{Bit#(32)}:1:resp:False:32:user:None
";
    const PLATFORM_LOG: &str = "\
DanglingRecv:{Bit#(32)}:0:req:False:32:dram:None
DanglingSend:{Bit#(32)}:1:resp:False:32:dram:None
";

    #[test]
    fn load_and_merge_logs() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.log");
        let platform = dir.path().join("platform.log");
        std::fs::write(&user, USER_LOG).unwrap();
        std::fs::write(&platform, PLATFORM_LOG).unwrap();
        let sink = DiagnosticSink::new();
        let mut graph = load_graph(&[user, platform], &sink).unwrap().unwrap();
        assert_eq!(graph.module_count(), 2);
        assert!(check_graph(&mut graph, &GraphConfig::default(), false, &sink));
        assert_eq!(finish(&sink, &quiet()), 0);
    }

    #[test]
    fn duplicate_module_across_logs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        std::fs::write(&a, USER_LOG).unwrap();
        std::fs::write(&b, USER_LOG).unwrap();
        let sink = DiagnosticSink::new();
        assert!(load_graph(&[a, b], &sink).unwrap().is_none());
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, GRAPH_CONFIG_CODE);
        assert_eq!(finish(&sink, &quiet()), 1);
    }

    #[test]
    fn unmatched_is_fatal_unless_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.log");
        std::fs::write(&user, USER_LOG).unwrap();

        let sink = DiagnosticSink::new();
        let mut graph = load_graph(&[user.clone()], &sink).unwrap().unwrap();
        assert!(!check_graph(&mut graph, &GraphConfig::default(), false, &sink));
        assert_eq!(finish(&sink, &quiet()), 1);

        let sink = DiagnosticSink::new();
        let mut graph = load_graph(&[user], &sink).unwrap().unwrap();
        assert!(check_graph(&mut graph, &GraphConfig::default(), true, &sink));
        assert_eq!(finish(&sink, &quiet()), 0);
    }

    #[test]
    fn chain_across_three_logs_passes_the_check() {
        let dir = tempfile::tempdir().unwrap();
        let logs: Vec<PathBuf> = ["core", "cache", "uart"]
            .into_iter()
            .map(|m| {
                let path = dir.path().join(format!("{m}.log"));
                std::fs::write(&path, format!("DanglingChain:{{Bit#(16)}}:0:stats:False:16:{m}:None\n"))
                    .unwrap();
                path
            })
            .collect();
        let sink = DiagnosticSink::new();
        let mut graph = load_graph(&logs, &sink).unwrap().unwrap();
        assert_eq!(graph.module_count(), 3);
        assert!(check_graph(&mut graph, &GraphConfig::default(), false, &sink));
        assert!(sink.diagnostics().is_empty());
        assert_eq!(graph.edges().len(), 3);
    }

    #[test]
    fn malformed_record_names_file_and_line() {
        let err = GraphError::MalformedRecord {
            line: 3,
            reason: "expected 6 fields".into(),
        };
        let diag = graph_diagnostic(&err, Path::new("user.log"));
        assert_eq!(diag.code, MALFORMED_RECORD_CODE);
        assert_eq!(
            diag.subject,
            Subject::Line {
                file: "user.log".into(),
                line: 3
            }
        );
    }

    #[test]
    fn missing_log_is_an_error() {
        let sink = DiagnosticSink::new();
        assert!(load_graph(&[PathBuf::from("/nonexistent/x.log")], &sink).is_err());
    }

    #[test]
    fn infeasible_has_help() {
        let err = PlaceError::Infeasible("every batch size failed".into());
        let diag = place_diagnostic(&err, Path::new("top.cons"));
        assert_eq!(diag.code, INFEASIBLE_CODE);
        assert_eq!(diag.help.len(), 1);
    }
}
