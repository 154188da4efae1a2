//! Derived statistics over the register.
//!
//! Every function here is a pure O(n) pass over a slice of records. Nothing is
//! cached; callers recompute after each change.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::classification::{self, Tier};
use crate::error::{Error, Result};
use crate::risk::{Likelihood, RiskRecord, Severity, Stage, Status};

/// Number of sample titles kept per matrix cell.
const MATRIX_SAMPLE_TITLES: usize = 3;

/// Stage selection for the register table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageFilter {
    /// Every stage.
    #[default]
    All,
    /// A single stage.
    Stage(Stage),
}

impl fmt::Display for StageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Stage(stage) => write!(f, "{}", stage.as_str()),
        }
    }
}

impl FromStr for StageFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Stage)
        }
    }
}

impl From<Stage> for StageFilter {
    fn from(stage: Stage) -> Self {
        Self::Stage(stage)
    }
}

/// Number of records identified at `stage`.
#[must_use]
pub fn count_by_stage(records: &[RiskRecord], stage: Stage) -> usize {
    records.iter().filter(|r| r.stage == stage).count()
}

/// Number of records identified at `stage` whose tier is `tier`.
#[must_use]
pub fn count_by_stage_and_tier(records: &[RiskRecord], stage: Stage, tier: Tier) -> usize {
    records
        .iter()
        .filter(|r| r.stage == stage && r.tier() == tier)
        .count()
}

/// Number of records with `status`.
#[must_use]
pub fn count_by_status(records: &[RiskRecord], status: Status) -> usize {
    records.iter().filter(|r| r.status == status).count()
}

/// Number of records of tier [`Tier::High`], whatever their status.
#[must_use]
pub fn critical_count(records: &[RiskRecord]) -> usize {
    records.iter().filter(|r| r.tier() == Tier::High).count()
}

/// Share of mitigated records as a percentage in 0..=100.
///
/// An empty register has an efficiency of 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mitigation_efficiency(records: &[RiskRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let mitigated = count_by_status(records, Status::Mitigated);
    mitigated as f64 / records.len() as f64 * 100.0
}

/// Number of active records of tier [`Tier::High`].
#[must_use]
pub fn unresolved_critical_count(records: &[RiskRecord]) -> usize {
    records
        .iter()
        .filter(|r| r.status == Status::Active && r.tier() == Tier::High)
        .count()
}

/// Records matching `filter`, in register order.
#[must_use]
pub fn filter_by_stage(records: &[RiskRecord], filter: StageFilter) -> Vec<&RiskRecord> {
    match filter {
        StageFilter::All => records.iter().collect(),
        StageFilter::Stage(stage) => records.iter().filter(|r| r.stage == stage).collect(),
    }
}

/// Per-stage counts backing the stage bar chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageBreakdown {
    /// The stage.
    pub stage: Stage,
    /// All records at this stage.
    pub total: usize,
    /// Records of tier High.
    pub high: usize,
    /// Records of tier Medium.
    pub medium: usize,
    /// Records of tier Low.
    pub low: usize,
}

/// One entry per stage, in process order.
#[must_use]
pub fn stage_breakdown(records: &[RiskRecord]) -> Vec<StageBreakdown> {
    Stage::ALL
        .into_iter()
        .map(|stage| StageBreakdown {
            stage,
            total: count_by_stage(records, stage),
            high: count_by_stage_and_tier(records, stage, Tier::High),
            medium: count_by_stage_and_tier(records, stage, Tier::Medium),
            low: count_by_stage_and_tier(records, stage, Tier::Low),
        })
        .collect()
}

/// Counts per mitigation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusBreakdown {
    /// Active records.
    pub active: usize,
    /// Mitigated records.
    pub mitigated: usize,
    /// Latent records.
    pub latent: usize,
}

/// Count records per status.
#[must_use]
pub fn status_breakdown(records: &[RiskRecord]) -> StatusBreakdown {
    StatusBreakdown {
        active: count_by_status(records, Status::Active),
        mitigated: count_by_status(records, Status::Mitigated),
        latent: count_by_status(records, Status::Latent),
    }
}

/// One cell of the likelihood × severity matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixCell {
    /// Row.
    pub likelihood: Likelihood,
    /// Column.
    pub severity: Severity,
    /// Tier of the cell.
    pub tier: Tier,
    /// Records classified in this cell.
    pub count: usize,
    /// Titles of the first few records in the cell, in register order.
    pub sample_titles: Vec<String>,
}

/// The 5×5 matrix: rows from likelihood 5 down to 1, columns from A to E.
#[must_use]
pub fn risk_matrix(records: &[RiskRecord]) -> Vec<Vec<MatrixCell>> {
    Likelihood::DESCENDING
        .into_iter()
        .map(|likelihood| {
            Severity::ALL
                .into_iter()
                .map(|severity| {
                    let mut in_cell = records
                        .iter()
                        .filter(|r| r.likelihood == likelihood && r.severity == severity);
                    let sample_titles: Vec<String> = in_cell
                        .by_ref()
                        .take(MATRIX_SAMPLE_TITLES)
                        .map(|r| r.title.clone())
                        .collect();
                    let count = sample_titles.len() + in_cell.count();
                    MatrixCell {
                        likelihood,
                        severity,
                        tier: classification::classify(likelihood, severity),
                        count,
                        sample_titles,
                    }
                })
                .collect()
        })
        .collect()
}

/// Headline safety performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// All records.
    pub total: usize,
    /// Records of tier High, any status.
    pub critical: usize,
    /// Records with status Latent.
    pub latent: usize,
    /// Active records of tier High.
    pub unresolved_critical: usize,
    /// Mitigated share as a percentage.
    pub mitigation_efficiency: f64,
}

impl DashboardSummary {
    /// Mitigation efficiency rounded to a whole percent.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn mitigation_efficiency_rounded(&self) -> u8 {
        self.mitigation_efficiency.round().clamp(0.0, 100.0) as u8
    }
}

/// Compute the headline indicators.
#[must_use]
pub fn dashboard_summary(records: &[RiskRecord]) -> DashboardSummary {
    DashboardSummary {
        total: records.len(),
        critical: critical_count(records),
        latent: count_by_status(records, Status::Latent),
        unresolved_critical: unresolved_critical_count(records),
        mitigation_efficiency: mitigation_efficiency(records),
    }
}
