//! Stable identifiers printed in front of every diagnostic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which family a code belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Graph and input errors (`E`).
    Error,
    /// Tolerable graph problems (`W`).
    Warning,
    /// Floorplanning problems (`P`).
    Placement,
}

impl Category {
    /// Letter the code is printed with.
    pub fn prefix(self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warning => 'W',
            Self::Placement => 'P',
        }
    }
}

/// Letter plus three digits, e.g. `E102` or `P103`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// Family.
    pub category: Category,
    /// Number within the family.
    pub number: u16,
}

impl DiagnosticCode {
    /// Builds a code; usable in `const` items.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFEASIBLE: DiagnosticCode = DiagnosticCode::new(Category::Placement, 103);

    #[test]
    fn prints_letter_and_padded_number() {
        assert_eq!(INFEASIBLE.to_string(), "P103");
        assert_eq!(DiagnosticCode::new(Category::Warning, 7).to_string(), "W007");
        assert_eq!(DiagnosticCode::new(Category::Error, 102).to_string(), "E102");
    }

    #[test]
    fn json_keeps_family_and_number() {
        let json = serde_json::to_value(INFEASIBLE).unwrap();
        assert_eq!(json["category"], "Placement");
        assert_eq!(json["number"], 103);
    }
}
