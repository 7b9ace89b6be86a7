//! CPLEX-LP model writer and solution readers for external solvers.

use crate::error::PlaceError;
use crate::model::{IlpModel, Sense, Solution, VarKind};
use std::fmt::Write;

/// Renders `model` in CPLEX LP format.
///
/// Every variable is listed in the objective (with a zero coefficient if
/// need be) in index order, so that solvers numbering columns by first
/// appearance number them like the model does.
pub fn write_lp(model: &IlpModel) -> String {
    let mut coef = vec![0.0; model.variables.len()];
    for &(v, c) in &model.objective {
        coef[v.index()] += c;
    }

    let mut out = String::new();
    out.push_str("\\ lim placement model\nMinimize\n obj:");
    for (i, c) in coef.iter().enumerate() {
        push_term(&mut out, *c, &model.variables[i].name, i == 0);
    }
    out.push_str("\nSubject To\n");
    for row in &model.constraints {
        let _ = write!(out, " {}:", row.name);
        if row.terms.is_empty() {
            // A row needs at least one term; the first column with zero
            // weight keeps it well-formed.
            if let Some(first) = model.variables.first() {
                push_term(&mut out, 0.0, &first.name, true);
            }
        }
        for (k, &(v, c)) in row.terms.iter().enumerate() {
            push_term(&mut out, c, &model.variables[v.index()].name, k == 0);
        }
        let op = match row.sense {
            Sense::Le => "<=",
            Sense::Ge => ">=",
            Sense::Eq => "=",
        };
        let _ = writeln!(out, " {op} {}", row.rhs);
    }

    out.push_str("Bounds\n");
    for def in &model.variables {
        if def.kind == VarKind::Binary {
            continue;
        }
        let lower = if def.lower.is_finite() {
            def.lower.to_string()
        } else {
            "-inf".to_string()
        };
        let upper = match def.upper {
            Some(u) if u.is_finite() => u.to_string(),
            _ => "+inf".to_string(),
        };
        let _ = writeln!(out, " {lower} <= {} <= {upper}", def.name);
    }

    let binaries: Vec<&str> = model
        .variables
        .iter()
        .filter(|d| d.kind == VarKind::Binary)
        .map(|d| d.name.as_str())
        .collect();
    if !binaries.is_empty() {
        out.push_str("Binaries\n");
        for name in binaries {
            let _ = writeln!(out, " {name}");
        }
    }
    out.push_str("End\n");
    out
}

fn push_term(out: &mut String, coef: f64, name: &str, first: bool) {
    let sign = if coef < 0.0 { "-" } else { "+" };
    if first && coef >= 0.0 {
        let _ = write!(out, " {} {name}", coef.abs());
    } else {
        let _ = write!(out, " {sign} {} {name}", coef.abs());
    }
}

/// Reads a CBC `solu` file.
///
/// The first line carries the status; `Optimal` is the only accepted one.
/// Value lines are `[**] <index> <name> <value> <reduced cost>`; variables
/// CBC omits are zero.
pub fn parse_cbc_solution(text: &str, model: &IlpModel) -> Result<Solution, PlaceError> {
    let mut lines = text.lines();
    let status = lines.next().unwrap_or("").trim();
    if status.starts_with("Infeasible") || status.contains("infeasible") {
        return Err(PlaceError::Infeasible(format!("cbc: {status}")));
    }
    if !status.starts_with("Optimal") {
        return Err(PlaceError::Solver(format!("cbc: {status}")));
    }

    let mut values = vec![0.0; model.variables.len()];
    for line in lines {
        let fields: Vec<&str> = line
            .split_whitespace()
            .filter(|f| *f != "**")
            .collect();
        if fields.len() < 3 {
            continue;
        }
        let name = fields[1];
        let value: f64 = fields[2].parse().map_err(|_| {
            PlaceError::Solver(format!("cbc: unreadable value in `{}`", line.trim()))
        })?;
        match model.var_named(name) {
            Some(var) => values[var.index()] = value,
            None => {
                return Err(PlaceError::Solver(format!("cbc: unknown column `{name}`")));
            }
        }
    }
    Ok(Solution::new(values))
}

/// Reads a GLPK raw MIP solution (`glpsol -w`).
///
/// `s mip <rows> <cols> <status> <objective>` gives the status, `o` being
/// the only accepted one; `j <col> <value>` lines give 1-based column values.
pub fn parse_glpk_solution(text: &str, model: &IlpModel) -> Result<Solution, PlaceError> {
    let mut values = vec![0.0; model.variables.len()];
    let mut status = None;
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["s", "mip", _, _, st, ..] => status = Some(*st),
            ["j", col, value, ..] => {
                let col: usize = col
                    .parse()
                    .map_err(|_| PlaceError::Solver(format!("glpk: bad column `{col}`")))?;
                let value: f64 = value
                    .parse()
                    .map_err(|_| PlaceError::Solver(format!("glpk: bad value `{value}`")))?;
                match col.checked_sub(1).and_then(|i| values.get_mut(i)) {
                    Some(slot) => *slot = value,
                    None => return Err(PlaceError::Solver(format!("glpk: column {col} out of range"))),
                }
            }
            _ => {}
        }
    }
    match status {
        Some("o") => Ok(Solution::new(values)),
        Some("n") => Err(PlaceError::Infeasible("glpk: no integer feasible solution".into())),
        Some(other) => Err(PlaceError::Solver(format!("glpk: status `{other}`"))),
        None => Err(PlaceError::Solver("glpk: no solution status line".into())),
    }
}
