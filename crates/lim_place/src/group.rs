//! Area groups and the floorplan they live in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute key marking a group as an empty box.
pub const EMPTY_BOX: &str = "EMPTYBOX";

/// Size of a group's rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Dimension {
    /// Not decided yet.
    #[default]
    Unset,
    /// A single width and height.
    Fixed {
        /// Width in chip units.
        width: f64,
        /// Height in chip units.
        height: f64,
    },
    /// Candidate `(width, height)` pairs; the solver picks exactly one.
    Options(Vec<(f64, f64)>),
}

impl Dimension {
    /// Width and height if the dimension is fixed.
    pub fn fixed(&self) -> Option<(f64, f64)> {
        match self {
            Dimension::Fixed { width, height } => Some((*width, *height)),
            _ => None,
        }
    }

    /// Candidates the solver may choose from.
    pub fn choices(&self) -> Vec<(f64, f64)> {
        match self {
            Dimension::Unset => Vec::new(),
            Dimension::Fixed { width, height } => vec![(*width, *height)],
            Dimension::Options(options) => options.clone(),
        }
    }
}

/// A rectangular chip region reserved for one module or module subtree.
///
/// `x_loc`/`y_loc` are the rectangle's center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaGroup {
    /// Unique group name.
    pub name: String,
    /// Module instance path the group constrains, if declared.
    pub source_path: Option<String>,
    /// Required area in chip units squared.
    pub area: f64,
    /// Horizontal center.
    pub x_loc: Option<f64>,
    /// Vertical center.
    pub y_loc: Option<f64>,
    /// Rectangle size or candidate sizes.
    pub dimension: Dimension,
    /// Enclosing group.
    pub parent: Option<String>,
    /// Nested groups, in name order.
    pub children: Vec<String>,
    /// Free-form `KEY = VALUE` attributes.
    pub attributes: BTreeMap<String, String>,
}

impl AreaGroup {
    /// Creates an unplaced group with no area.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_path: None,
            area: 0.0,
            x_loc: None,
            y_loc: None,
            dimension: Dimension::Unset,
            parent: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// `true` if the group is marked `EMPTYBOX = True`.
    pub fn is_empty_box(&self) -> bool {
        self.attributes
            .get(EMPTY_BOX)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// `true` once both location and a single dimension are known.
    pub fn is_placed(&self) -> bool {
        self.x_loc.is_some() && self.y_loc.is_some() && self.dimension.fixed().is_some()
    }

    /// Rectangle center, if located.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        Some((self.x_loc?, self.y_loc?))
    }

    /// `(x0, y0, x1, y1)` of a placed group.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let (x, y) = self.centroid()?;
        let (w, h) = self.dimension.fixed()?;
        Some((x - w / 2.0, y - h / 2.0, x + w / 2.0, y + h / 2.0))
    }

    /// Places the group.
    pub fn place(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.x_loc = Some(x);
        self.y_loc = Some(y);
        self.dimension = Dimension::Fixed { width, height };
    }
}

/// Chip extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chip {
    /// Width in chip units.
    pub width: f64,
    /// Height in chip units.
    pub height: f64,
}

/// All groups of a design plus the chip they are placed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floorplan {
    /// Chip extent.
    pub chip: Chip,
    /// Groups by name.
    pub groups: BTreeMap<String, AreaGroup>,
}

impl Floorplan {
    /// Rebuilds a plan from a group snapshot. The chip is the bounding box
    /// of the placed groups, anchored at the origin.
    pub fn from_groups(groups: BTreeMap<String, AreaGroup>) -> Self {
        let (width, height) = groups
            .values()
            .filter_map(AreaGroup::bounds)
            .fold((0.0_f64, 0.0_f64), |(w, h), (_, _, x1, y1)| (w.max(x1), h.max(y1)));
        Self {
            chip: Chip { width, height },
            groups,
        }
    }

    /// Returns `true` if the placed rectangles of `a` and `b` intersect with
    /// positive area.
    pub fn overlaps(a: &AreaGroup, b: &AreaGroup) -> bool {
        match (a.bounds(), b.bounds()) {
            (Some((ax0, ay0, ax1, ay1)), Some((bx0, by0, bx1, by1))) => {
                const EPS: f64 = 1e-6;
                ax0 < bx1 - EPS && bx0 < ax1 - EPS && ay0 < by1 - EPS && by0 < ay1 - EPS
            }
            _ => false,
        }
    }

    /// Returns `true` if the placed rectangle lies inside the chip.
    pub fn contains(&self, group: &AreaGroup) -> bool {
        const EPS: f64 = 1e-6;
        group.bounds().is_some_and(|(x0, y0, x1, y1)| {
            x0 >= -EPS && y0 >= -EPS && x1 <= self.chip.width + EPS && y1 <= self.chip.height + EPS
        })
    }

    /// Fills in `source_path` from `paths` for groups that have none.
    ///
    /// Used for the final snapshot so every group names its hierarchical
    /// instance in the merge tree.
    pub fn annotate_paths(&mut self, paths: &BTreeMap<String, String>) -> usize {
        let mut annotated = 0;
        for group in self.groups.values_mut() {
            if group.source_path.is_none() {
                if let Some(path) = paths.get(&group.name) {
                    group.source_path = Some(path.clone());
                    annotated += 1;
                }
            }
        }
        annotated
    }
}
