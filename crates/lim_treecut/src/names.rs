//! Unique names for merge nodes and placeholders.

use std::collections::BTreeSet;

/// Hands out node and placeholder names that collide neither with each
/// other nor with any reserved (module) name.
#[derive(Debug, Clone)]
pub struct NameSupply {
    taken: BTreeSet<String>,
    counter: usize,
}

impl NameSupply {
    /// Creates a supply that will never produce any of `reserved`.
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: reserved.into_iter().map(Into::into).collect(),
            counter: 0,
        }
    }

    /// Name for the next merge node.
    pub fn node(&mut self) -> String {
        self.fresh("lim_node")
    }

    /// Name for the next empty placeholder leaf.
    pub fn placeholder(&mut self) -> String {
        self.fresh("lim_empty")
    }

    fn fresh(&mut self, prefix: &str) -> String {
        loop {
            let candidate = format!("{prefix}_{}", self.counter);
            self.counter += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut names = NameSupply::new(Vec::<String>::new());
        let a = names.node();
        let b = names.placeholder();
        let c = names.node();
        assert_eq!(a, "lim_node_0");
        assert_eq!(b, "lim_empty_1");
        assert_eq!(c, "lim_node_2");
    }

    #[test]
    fn reserved_names_are_skipped() {
        let mut names = NameSupply::new(["lim_empty_0", "lim_empty_1"]);
        assert_eq!(names.placeholder(), "lim_empty_2");
    }
}
