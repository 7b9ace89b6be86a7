//! Dangling-connection record extraction from compiler logs.
//!
//! The hardware compiler reports every connection it could not resolve as a
//! single log line:
//!
//! ```text
//! Dangling<Kind>:{<raw type>}:<index>:<name>:<True|False>:<bitwidth>:<module>:<chain root|None>
//! ```
//!
//! `<Kind>` is one of `Send`, `Recv`, `Chain`, `ChainRoutingSend` or
//! `ChainRoutingRecv`. The record may appear anywhere in the line; lines
//! without the `Dangling` marker are ignored. A `Chain` record describes
//! both ends of a chain segment and yields a `ChainSrc` and a `ChainSink`.

use crate::connection::{Connection, ConnectionKind};
use crate::error::GraphError;

const MARKER: &str = "Dangling";

/// Parses every dangling-connection record in a log.
///
/// Records are returned in log order. The first malformed record aborts
/// extraction with [`GraphError::MalformedRecord`].
pub fn parse_log(text: &str) -> Result<Vec<Connection>, GraphError> {
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        out.extend(parse_log_line(line, i + 1)?);
    }
    tracing::debug!(records = out.len(), "extracted dangling connections");
    Ok(out)
}

/// Parses a single log line. Returns no connections for unrelated lines.
pub fn parse_log_line(line: &str, line_no: usize) -> Result<Vec<Connection>, GraphError> {
    let Some(start) = line.find(MARKER) else {
        return Ok(Vec::new());
    };
    let record = line[start + MARKER.len()..].trim_end();
    let malformed = |reason: &str| GraphError::MalformedRecord {
        line: line_no,
        reason: reason.to_string(),
    };

    let (kind, rest) = record
        .split_once(':')
        .ok_or_else(|| malformed("missing `:` after record kind"))?;
    let (raw_type, rest) = split_braced(rest).ok_or_else(|| malformed("raw type must be `{...}`"))?;
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| malformed("missing `:` after raw type"))?;

    let fields: Vec<&str> = rest.split(':').collect();
    if fields.len() != 6 {
        return Err(malformed(&format!(
            "expected 6 fields after the raw type, found {}",
            fields.len()
        )));
    }
    let index: u32 = fields[0]
        .parse()
        .map_err(|_| malformed(&format!("bad index `{}`", fields[0])))?;
    let name = fields[1];
    if name.is_empty() {
        return Err(malformed("empty connection name"));
    }
    let optional = match fields[2] {
        "True" => true,
        "False" => false,
        other => return Err(malformed(&format!("bad optional flag `{other}`"))),
    };
    let bitwidth: u32 = fields[3]
        .parse()
        .map_err(|_| malformed(&format!("bad bitwidth `{}`", fields[3])))?;
    let module = fields[4];
    if module.is_empty() {
        return Err(malformed("empty module name"));
    }
    let chain_root = match fields[5] {
        "None" | "" => None,
        root => Some(root.to_string()),
    };

    let kinds: &[ConnectionKind] = match kind {
        "Send" => &[ConnectionKind::Send],
        "Recv" => &[ConnectionKind::Recv],
        "Chain" => &[ConnectionKind::ChainSrc, ConnectionKind::ChainSink],
        "ChainRoutingSend" => &[ConnectionKind::ChainRoutingSend],
        "ChainRoutingRecv" => &[ConnectionKind::ChainRoutingRecv],
        other => return Err(malformed(&format!("unknown record kind `{other}`"))),
    };

    Ok(kinds
        .iter()
        .map(|&k| {
            let mut conn = Connection::new(k, name, raw_type, bitwidth, module).with_optional(optional);
            conn.index = index;
            conn.chain_root = chain_root.clone();
            conn
        })
        .collect())
}

/// Splits `{...}rest` at the matching close brace. Nested braces are allowed
/// since raw types may themselves contain them.
fn split_braced(s: &str) -> Option<(&str, &str)> {
    let body = s.strip_prefix('{')?;
    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&body[..i], &body[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_record() {
        let conns =
            parse_log_line("DanglingSend:{Bit#(32)}:0:req:False:32:dram:None", 1).unwrap();
        assert_eq!(conns.len(), 1);
        let c = &conns[0];
        assert_eq!(c.kind, ConnectionKind::Send);
        assert_eq!(c.raw_type, "Bit#(32)");
        assert_eq!(c.name, "req");
        assert!(!c.optional);
        assert_eq!(c.bitwidth, 32);
        assert_eq!(c.module_name, "dram");
        assert_eq!(c.chain_root, None);
        assert!(!c.matched);
    }

    #[test]
    fn marker_may_follow_a_prefix() {
        let conns = parse_log_line(
            "Compilation message: DanglingRecv:{Bit#(8)}:3:rsp:True:8:user:None",
            7,
        )
        .unwrap();
        assert_eq!(conns[0].kind, ConnectionKind::Recv);
        assert_eq!(conns[0].index, 3);
        assert!(conns[0].optional);
    }

    #[test]
    fn chain_yields_both_ends() {
        let conns =
            parse_log_line("DanglingChain:{Bit#(64)}:0:stats:False:64:core:core_root", 1).unwrap();
        let kinds: Vec<_> = conns.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ConnectionKind::ChainSrc, ConnectionKind::ChainSink]);
        assert!(conns.iter().all(|c| c.name == "stats"));
        assert!(conns
            .iter()
            .all(|c| c.chain_root.as_deref() == Some("core_root")));
    }

    #[test]
    fn raw_type_may_contain_colons_and_braces() {
        let conns = parse_log_line(
            "DanglingSend:{Tuple2#(Bit#(1), {a:Bit#(2)})}:0:x:False:3:m:None",
            1,
        )
        .unwrap();
        assert_eq!(conns[0].raw_type, "Tuple2#(Bit#(1), {a:Bit#(2)})");
        assert_eq!(conns[0].name, "x");
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        assert!(parse_log_line("Elaborating module mkTop", 1).unwrap().is_empty());
    }

    #[test]
    fn malformed_records_name_the_line() {
        let cases = [
            "DanglingSend:{Bit#(32)}:0:req:False:32:dram",
            "DanglingSend:Bit#(32):0:req:False:32:dram:None",
            "DanglingSend:{Bit#(32)}:x:req:False:32:dram:None",
            "DanglingSend:{Bit#(32)}:0:req:maybe:32:dram:None",
            "DanglingTeleport:{Bit#(32)}:0:req:False:32:dram:None",
            "DanglingSend:{Bit#(32):0:req:False:32:dram:None",
        ];
        for case in cases {
            match parse_log_line(case, 42) {
                Err(GraphError::MalformedRecord { line, .. }) => assert_eq!(line, 42),
                other => panic!("expected malformed record for {case:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_log_collects_in_order() {
        let log = "\
header line
DanglingSend:{Bit#(32)}:0:x:False:32:a:None
noise
DanglingRecv:{Bit#(32)}:0:x:False:32:b:None
DanglingChain:{Bit#(8)}:0:c:False:8:a:None
";
        let conns = parse_log(log).unwrap();
        assert_eq!(conns.len(), 4);
        assert_eq!(conns[0].module_name, "a");
        assert_eq!(conns[1].module_name, "b");
    }

    #[test]
    fn parse_log_reports_first_error() {
        let err = parse_log("ok\nDanglingSend:{T}:0:x\n").unwrap_err();
        assert!(matches!(err, GraphError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn extracted_records_assemble() {
        let log = "\
DanglingSend:{Bit#(32)}:0:x:False:32:a:None
DanglingRecv:{Bit#(32)}:0:x:False:32:b:None
";
        let graph = crate::LiGraph::new(parse_log(log).unwrap()).unwrap();
        assert!(!graph.has_unmatched());
    }
}
