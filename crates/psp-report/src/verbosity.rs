use std::fmt;

use crate::error::ReportError;

/// How much of the Section → Rule → Problem tree a text report shows.
///
/// | level | sections | rules |
/// |---|---|---|
/// | 0 | none | none |
/// | 1 | with problems | none |
/// | 2 | with problems | with problems, including problem lines |
/// | 3 | all | all |
///
/// The closing verdict and totals line is printed at every level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(u8);

impl Verbosity {
    pub const SUMMARY: Verbosity = Verbosity(0);
    pub const SECTIONS: Verbosity = Verbosity(1);
    pub const PROBLEMS: Verbosity = Verbosity(2);
    pub const FULL: Verbosity = Verbosity(3);

    pub fn level(self) -> u8 {
        self.0
    }

    pub(crate) fn shows_section(self, has_problems: bool) -> bool {
        match self.0 {
            0 => false,
            1 | 2 => has_problems,
            _ => true,
        }
    }

    pub(crate) fn shows_rule(self, has_problems: bool) -> bool {
        match self.0 {
            0 | 1 => false,
            2 => has_problems,
            _ => true,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::PROBLEMS
    }
}

impl TryFrom<u8> for Verbosity {
    type Error = ReportError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= Self::FULL.0 {
            Ok(Self(value))
        } else {
            Err(ReportError::InvalidVerbosity { value })
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_select_sections_and_rules() {
        assert!(!Verbosity::SUMMARY.shows_section(true));
        assert!(Verbosity::SECTIONS.shows_section(true));
        assert!(!Verbosity::SECTIONS.shows_rule(true));
        assert!(Verbosity::PROBLEMS.shows_rule(true));
        assert!(!Verbosity::PROBLEMS.shows_section(false));
        assert!(Verbosity::FULL.shows_section(false));
        assert!(Verbosity::FULL.shows_rule(false));
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert_eq!(Verbosity::try_from(3).ok(), Some(Verbosity::FULL));
        assert!(matches!(
            Verbosity::try_from(4),
            Err(ReportError::InvalidVerbosity { value: 4 })
        ));
    }
}
