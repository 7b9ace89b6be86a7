//! The placement ILP for one batch of free groups.
//!
//! Groups are modelled by their center `(cx, cy)` and half extents. A free
//! group's half extents are linear in its aspect-option selection binaries;
//! already placed groups contribute constants. Pairs are kept apart with two
//! side indicators and a big-M disjunction, nested groups are kept inside
//! their parent, and the objective sums weighted Manhattan center distances.

use crate::comm::CommTable;
use crate::error::PlaceError;
use crate::group::{AreaGroup, Floorplan};
use crate::model::{IlpModel, Sense, Solution, Var};
use lim_config::PlacementConfig;

/// Affine expression `Σ coef·var + constant`.
#[derive(Debug, Clone, Default)]
struct Lin {
    terms: Vec<(Var, f64)>,
    constant: f64,
}

impl Lin {
    fn constant(c: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: c,
        }
    }

    fn var(v: Var) -> Self {
        Self {
            terms: vec![(v, 1.0)],
            constant: 0.0,
        }
    }

    /// `self + k·other`
    fn plus(&self, k: f64, other: &Lin) -> Lin {
        let mut out = self.clone();
        out.terms
            .extend(other.terms.iter().map(|&(v, c)| (v, c * k)));
        out.constant += k * other.constant;
        out
    }

    fn plus_var(mut self, k: f64, v: Var) -> Lin {
        self.terms.push((v, k));
        self
    }
}

fn row(model: &mut IlpModel, name: String, lhs: Lin, sense: Sense, rhs: f64) {
    model.constrain(name, lhs.terms, sense, rhs - lhs.constant);
}

/// Geometry of one group inside the model.
struct Geom {
    name: String,
    free: bool,
    empty_box: bool,
    parent: Option<String>,
    cx: Lin,
    cy: Lin,
    half_w: Lin,
    half_h: Lin,
    x: Option<Var>,
    y: Option<Var>,
    select: Vec<(Var, (f64, f64))>,
}

/// Solved position and size of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Group name.
    pub name: String,
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    /// Chosen width.
    pub width: f64,
    /// Chosen height.
    pub height: f64,
}

/// A built model plus what is needed to read placements back.
pub struct BatchModel {
    /// The ILP.
    pub model: IlpModel,
    geoms: Vec<Geom>,
}

impl BatchModel {
    /// Builds the model placing `batch` around every placed group of `plan`.
    pub fn build(
        plan: &Floorplan,
        batch: &[String],
        comm: &CommTable,
        config: &PlacementConfig,
    ) -> Result<Self, PlaceError> {
        let chip = plan.chip;
        let big_m = chip.width + chip.height;
        let mut model = IlpModel::new();
        let mut geoms = Vec::new();

        for (i, name) in batch.iter().enumerate() {
            let group = plan
                .groups
                .get(name)
                .ok_or_else(|| PlaceError::Config(format!("unknown group `{name}`")))?;
            geoms.push(free_geom(&mut model, i, group, plan)?);
        }
        for group in plan.groups.values() {
            if batch.contains(&group.name) {
                continue;
            }
            if let Some(g) = fixed_geom(group) {
                geoms.push(g);
            }
        }

        for a in 0..geoms.len() {
            for b in a + 1..geoms.len() {
                let (ga, gb) = (&geoms[a], &geoms[b]);
                if !ga.free && !gb.free {
                    continue;
                }
                if ga.empty_box && gb.empty_box {
                    continue;
                }
                let tag = format!("{a}_{b}");
                let nested = if ga.parent.as_deref() == Some(gb.name.as_str()) {
                    Some((b, a))
                } else if gb.parent.as_deref() == Some(ga.name.as_str()) {
                    Some((a, b))
                } else {
                    None
                };

                let weight = match nested {
                    Some((parent, child)) => {
                        contain(&mut model, &tag, &geoms[parent], &geoms[child]);
                        config.parent_child_weight
                    }
                    None => {
                        separate(&mut model, &tag, ga, gb, big_m);
                        config.comm_weight * comm.traffic(&ga.name, &gb.name)
                    }
                };
                if weight > 0.0 {
                    distance(&mut model, &tag, ga, gb, weight, big_m);
                }
            }
        }

        tracing::debug!(
            batch = batch.len(),
            groups = geoms.len(),
            variables = model.variables.len(),
            rows = model.constraints.len(),
            "built placement model"
        );
        Ok(Self { model, geoms })
    }

    /// Reads the batch placements from a solution.
    ///
    /// A selected non-positive dimension is infeasible.
    pub fn extract(&self, solution: &Solution) -> Result<Vec<Placement>, PlaceError> {
        let violation = solution.max_violation(&self.model);
        if violation > 1e-3 {
            return Err(PlaceError::Solver(format!(
                "solution violates the model by {violation}"
            )));
        }
        let mut out = Vec::new();
        for g in self.geoms.iter().filter(|g| g.free) {
            let chosen = g
                .select
                .iter()
                .max_by(|a, b| solution.value(a.0).total_cmp(&solution.value(b.0)))
                .map(|&(_, dims)| dims)
                .ok_or_else(|| PlaceError::Infeasible(format!("group `{}` has no size", g.name)))?;
            let (w, h) = chosen;
            if w <= 0.0 || h <= 0.0 {
                return Err(PlaceError::Infeasible(format!(
                    "group `{}` selected a non-positive dimension {w}x{h}",
                    g.name
                )));
            }
            let x = g.x.map(|v| solution.value(v)).unwrap_or(g.cx.constant);
            let y = g.y.map(|v| solution.value(v)).unwrap_or(g.cy.constant);
            out.push(Placement {
                name: g.name.clone(),
                x: snap(x),
                y: snap(y),
                width: w,
                height: h,
            });
        }
        Ok(out)
    }
}

/// Removes solver noise below 1e-6.
fn snap(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

fn free_geom(
    model: &mut IlpModel,
    i: usize,
    group: &AreaGroup,
    plan: &Floorplan,
) -> Result<Geom, PlaceError> {
    let choices = group.dimension.choices();
    if choices.is_empty() || choices.iter().any(|&(w, h)| w <= 0.0 || h <= 0.0) {
        return Err(PlaceError::Infeasible(format!(
            "group `{}` has no positive dimension (area {})",
            group.name, group.area
        )));
    }
    let (cw, ch) = (plan.chip.width, plan.chip.height);

    let mut select = Vec::new();
    let mut half_w = Lin::default();
    let mut half_h = Lin::default();
    let mut one = Vec::new();
    for (k, &(w, h)) in choices.iter().enumerate() {
        let s = model.binary(format!("s_{i}_{k}"));
        select.push((s, (w, h)));
        half_w = half_w.plus_var(w / 2.0, s);
        half_h = half_h.plus_var(h / 2.0, s);
        one.push((s, 1.0));
    }
    model.constrain(format!("pick_{i}"), one, Sense::Eq, 1.0);

    let (x_lo, x_hi) = match group.x_loc {
        Some(x) => (x, x),
        None => (0.0, cw),
    };
    let (y_lo, y_hi) = match group.y_loc {
        Some(y) => (y, y),
        None => (0.0, ch),
    };
    let x = model.continuous(format!("x_{i}"), x_lo, Some(x_hi));
    let y = model.continuous(format!("y_{i}"), y_lo, Some(y_hi));
    let cx = Lin::var(x);
    let cy = Lin::var(y);

    row(model, format!("left_{i}"), cx.plus(-1.0, &half_w), Sense::Ge, 0.0);
    row(model, format!("right_{i}"), cx.plus(1.0, &half_w), Sense::Le, cw);
    row(model, format!("bottom_{i}"), cy.plus(-1.0, &half_h), Sense::Ge, 0.0);
    row(model, format!("top_{i}"), cy.plus(1.0, &half_h), Sense::Le, ch);

    Ok(Geom {
        name: group.name.clone(),
        free: true,
        empty_box: group.is_empty_box(),
        parent: group.parent.clone(),
        cx,
        cy,
        half_w,
        half_h,
        x: Some(x),
        y: Some(y),
        select,
    })
}

fn fixed_geom(group: &AreaGroup) -> Option<Geom> {
    let (x, y) = group.centroid()?;
    let (w, h) = group.dimension.fixed()?;
    Some(Geom {
        name: group.name.clone(),
        free: false,
        empty_box: group.is_empty_box(),
        parent: group.parent.clone(),
        cx: Lin::constant(x),
        cy: Lin::constant(y),
        half_w: Lin::constant(w / 2.0),
        half_h: Lin::constant(h / 2.0),
        x: None,
        y: None,
        select: Vec::new(),
    })
}

/// One of: `a` left of `b`, `b` left of `a`, `a` below `b`, `b` below `a`.
fn separate(model: &mut IlpModel, tag: &str, a: &Geom, b: &Geom, big_m: f64) {
    let p = model.binary(format!("p_{tag}"));
    let q = model.binary(format!("q_{tag}"));

    // a.right <= b.left + M(p + q)
    let lhs = a.cx.plus(1.0, &a.half_w).plus(-1.0, &b.cx).plus(1.0, &b.half_w);
    row(model, format!("sep0_{tag}"), lhs.plus_var(-big_m, p).plus_var(-big_m, q), Sense::Le, 0.0);
    // b.right <= a.left + M(1 - p + q)
    let lhs = b.cx.plus(1.0, &b.half_w).plus(-1.0, &a.cx).plus(1.0, &a.half_w);
    row(model, format!("sep1_{tag}"), lhs.plus_var(big_m, p).plus_var(-big_m, q), Sense::Le, big_m);
    // a.top <= b.bottom + M(1 + p - q)
    let lhs = a.cy.plus(1.0, &a.half_h).plus(-1.0, &b.cy).plus(1.0, &b.half_h);
    row(model, format!("sep2_{tag}"), lhs.plus_var(-big_m, p).plus_var(big_m, q), Sense::Le, big_m);
    // b.top <= a.bottom + M(2 - p - q)
    let lhs = b.cy.plus(1.0, &b.half_h).plus(-1.0, &a.cy).plus(1.0, &a.half_h);
    row(model, format!("sep3_{tag}"), lhs.plus_var(big_m, p).plus_var(big_m, q), Sense::Le, 2.0 * big_m);
}

/// Keeps `child` inside `parent`.
fn contain(model: &mut IlpModel, tag: &str, parent: &Geom, child: &Geom) {
    // child.left >= parent.left
    let lhs = child.cx.plus(-1.0, &child.half_w).plus(-1.0, &parent.cx).plus(1.0, &parent.half_w);
    row(model, format!("in0_{tag}"), lhs, Sense::Ge, 0.0);
    // child.right <= parent.right
    let lhs = child.cx.plus(1.0, &child.half_w).plus(-1.0, &parent.cx).plus(-1.0, &parent.half_w);
    row(model, format!("in1_{tag}"), lhs, Sense::Le, 0.0);
    let lhs = child.cy.plus(-1.0, &child.half_h).plus(-1.0, &parent.cy).plus(1.0, &parent.half_h);
    row(model, format!("in2_{tag}"), lhs, Sense::Ge, 0.0);
    let lhs = child.cy.plus(1.0, &child.half_h).plus(-1.0, &parent.cy).plus(-1.0, &parent.half_h);
    row(model, format!("in3_{tag}"), lhs, Sense::Le, 0.0);
}

/// Adds `weight · (|Δcx| + |Δcy|)` to the objective.
fn distance(model: &mut IlpModel, tag: &str, a: &Geom, b: &Geom, weight: f64, big_m: f64) {
    let dx = model.continuous(format!("dx_{tag}"), 0.0, Some(big_m));
    let dy = model.continuous(format!("dy_{tag}"), 0.0, Some(big_m));
    let diff_x = a.cx.plus(-1.0, &b.cx);
    let diff_y = a.cy.plus(-1.0, &b.cy);
    row(model, format!("dxp_{tag}"), Lin::var(dx).plus(-1.0, &diff_x), Sense::Ge, 0.0);
    row(model, format!("dxn_{tag}"), Lin::var(dx).plus(1.0, &diff_x), Sense::Ge, 0.0);
    row(model, format!("dyp_{tag}"), Lin::var(dy).plus(-1.0, &diff_y), Sense::Ge, 0.0);
    row(model, format!("dyn_{tag}"), Lin::var(dy).plus(1.0, &diff_y), Sense::Ge, 0.0);
    model.minimize(dx, weight);
    model.minimize(dy, weight);
}
