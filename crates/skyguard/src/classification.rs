//! Risk tier classification.
//!
//! Maps a likelihood/severity pair onto the three-band tolerability matrix of
//! ICAO Doc 9859. The score is `likelihood * severity weight`; each band's lower
//! bound is inclusive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::risk::{Likelihood, Severity};

/// Lowest score classified as [`Tier::High`].
pub const HIGH_THRESHOLD: u8 = 15;

/// Lowest score classified as [`Tier::Medium`].
pub const MEDIUM_THRESHOLD: u8 = 6;

/// Derived risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Acceptable as is.
    Low,
    /// Tolerable with mitigation.
    Medium,
    /// Unacceptable; must be mitigated before publication.
    High,
}

impl Tier {
    /// All tiers, most severe first.
    pub const ALL: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    /// Tolerability label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Acceptable",
            Self::Medium => "Tolerable",
            Self::High => "Unacceptable",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw matrix score, 1..=25.
#[must_use]
pub fn score(likelihood: Likelihood, severity: Severity) -> u8 {
    likelihood.value() * severity.weight()
}

/// Classify a likelihood/severity pair.
#[must_use]
pub fn classify(likelihood: Likelihood, severity: Severity) -> Tier {
    match score(likelihood, severity) {
        s if s >= HIGH_THRESHOLD => Tier::High,
        s if s >= MEDIUM_THRESHOLD => Tier::Medium,
        _ => Tier::Low,
    }
}
