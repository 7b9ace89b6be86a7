//! Special-cased placement rules applied before the general solver.

use crate::group::Floorplan;
use lim_config::{PlacementRule, Side};

/// Places each rule's group flush against its anchor.
///
/// A left/right neighbour takes the anchor's height, an above/below one its
/// width; the other extent is rounded up from the area. A rule is skipped
/// (with a warning) when either group is missing, the anchor is unplaced,
/// the group is already placed, or the result would leave the chip or hit
/// another placed group. Returns the names of the groups placed.
pub fn apply_rules(plan: &mut Floorplan, rules: &[PlacementRule]) -> Vec<String> {
    let mut applied = Vec::new();
    for rule in rules {
        match try_rule(plan, rule) {
            Ok(()) => {
                tracing::debug!(group = %rule.group, anchor = %rule.anchor, "applied placement rule");
                applied.push(rule.group.clone());
            }
            Err(reason) => {
                tracing::warn!(group = %rule.group, anchor = %rule.anchor, "placement rule skipped: {reason}");
            }
        }
    }
    applied
}

fn try_rule(plan: &mut Floorplan, rule: &PlacementRule) -> Result<(), String> {
    let anchor = plan
        .groups
        .get(&rule.anchor)
        .ok_or_else(|| format!("no group `{}`", rule.anchor))?;
    let (ax0, ay0, ax1, ay1) = anchor
        .bounds()
        .ok_or_else(|| format!("anchor `{}` is not placed", rule.anchor))?;
    let group = plan
        .groups
        .get(&rule.group)
        .ok_or_else(|| format!("no group `{}`", rule.group))?;
    if group.is_placed() {
        return Err("group is already placed".into());
    }
    if group.area <= 0.0 {
        return Err("group has no area".into());
    }

    let (ah, aw) = (ay1 - ay0, ax1 - ax0);
    let (cx, cy, w, h) = match rule.side {
        Side::Left | Side::Right => {
            let w = (group.area / ah).ceil();
            let cx = if rule.side == Side::Left {
                ax0 - w / 2.0
            } else {
                ax1 + w / 2.0
            };
            (cx, (ay0 + ay1) / 2.0, w, ah)
        }
        Side::Above | Side::Below => {
            let h = (group.area / aw).ceil();
            let cy = if rule.side == Side::Above {
                ay1 + h / 2.0
            } else {
                ay0 - h / 2.0
            };
            ((ax0 + ax1) / 2.0, cy, aw, h)
        }
    };

    let mut candidate = group.clone();
    candidate.place(cx, cy, w, h);
    if !plan.contains(&candidate) {
        return Err("result is out of bounds".into());
    }
    let collides = plan.groups.values().any(|other| {
        other.name != candidate.name
            && !(other.is_empty_box() && candidate.is_empty_box())
            && candidate.parent.as_deref() != Some(other.name.as_str())
            && Floorplan::overlaps(&candidate, other)
    });
    if collides {
        return Err("result overlaps a placed group".into());
    }
    plan.groups.insert(candidate.name.clone(), candidate);
    Ok(())
}
