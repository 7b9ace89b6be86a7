//! Placement-derived guidance for bisection and buffering.

/// Oracle consulted by the partitioner when physical placement is known.
///
/// Members are passed as module names in name order; traffic edges use
/// indices into that slice.
pub trait PlacementHints {
    /// Splits `members` into two sides, returning a 0/1 label per member.
    ///
    /// `None` means the oracle has no opinion and the min-cut fallback is
    /// used. Labels that leave a side empty are also ignored.
    fn bisect(&self, members: &[&str], traffic: &[(usize, usize, f64)]) -> Option<Vec<u8>>;

    /// Number of pipeline buffers available between two sibling regions.
    fn buffer_budget(&self, left: &[&str], right: &[&str]) -> usize;
}

/// Hints for an unplaced design: never bisects, no buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHints;

impl PlacementHints for NoHints {
    fn bisect(&self, _members: &[&str], _traffic: &[(usize, usize, f64)]) -> Option<Vec<u8>> {
        None
    }

    fn buffer_budget(&self, _left: &[&str], _right: &[&str]) -> usize {
        0
    }
}
