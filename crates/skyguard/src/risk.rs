//! Core risk types for skyguard.
//!
//! This module defines the risk record and the closed value domains it is built
//! from. Every value that enters from outside (CLI arguments, the persisted
//! register, suggestion responses) is parsed into these types, so a record can
//! never hold an out-of-domain likelihood, severity, stage or status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::{self, Tier};
use crate::error::{Error, Result};
use crate::suggest::Suggestion;

/// Current time truncated to the millisecond precision of the persisted layout.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Opaque identifier of a risk record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskId(String);

impl RiskId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RiskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RiskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RiskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Stage of the instrument flight procedure design process (Doc 8168).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Collection of aeronautical, terrain and obstacle data.
    #[default]
    #[serde(alias = "Obtención de Información")]
    DataGathering,
    /// Obstacle assessment against protection surfaces.
    #[serde(alias = "Análisis de Obstáculos")]
    ObstacleAnalysis,
    /// Procedure construction (PANS-OPS).
    #[serde(alias = "Proceso de Diseño (PANS-OPS)")]
    DesignProcess,
    /// Ground validation of the designed procedure.
    #[serde(alias = "Validación en Tierra")]
    GroundValidation,
    /// Flight validation of the designed procedure.
    #[serde(alias = "Validación en Vuelo")]
    FlightValidation,
}

impl Stage {
    /// All stages in process order.
    pub const ALL: [Stage; 5] = [
        Stage::DataGathering,
        Stage::ObstacleAnalysis,
        Stage::DesignProcess,
        Stage::GroundValidation,
        Stage::FlightValidation,
    ];

    /// Machine identifier, as used in the persisted register and on the CLI.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataGathering => "data_gathering",
            Self::ObstacleAnalysis => "obstacle_analysis",
            Self::DesignProcess => "design_process",
            Self::GroundValidation => "ground_validation",
            Self::FlightValidation => "flight_validation",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::DataGathering => "Data Gathering",
            Self::ObstacleAnalysis => "Obstacle Analysis",
            Self::DesignProcess => "Design Process (PANS-OPS)",
            Self::GroundValidation => "Ground Validation",
            Self::FlightValidation => "Flight Validation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|stage| {
                stage.as_str() == normalized || stage.label().eq_ignore_ascii_case(s.trim())
            })
            .ok_or_else(|| Error::invalid_value("stage", s))
    }
}

/// Likelihood of a hazard occurring, 1 (extremely improbable) to 5 (frequent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Likelihood(u8);

impl Likelihood {
    /// Least frequent value.
    pub const MIN: Likelihood = Likelihood(1);
    /// Most frequent value.
    pub const MAX: Likelihood = Likelihood(5);

    /// All values, most frequent first (matrix row order).
    pub const DESCENDING: [Likelihood; 5] = [
        Likelihood(5),
        Likelihood(4),
        Likelihood(3),
        Likelihood(2),
        Likelihood(1),
    ];

    /// Create a likelihood if `value` is within 1..=5.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    /// The numeric value.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Descriptive label (ICAO Doc 9859 probability table).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            5 => "Frequent",
            4 => "Occasional",
            3 => "Remote",
            2 => "Improbable",
            _ => "Extremely Improbable",
        }
    }
}

impl Default for Likelihood {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for Likelihood {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value).ok_or_else(|| Error::invalid_value("likelihood", value.to_string()))
    }
}

impl From<Likelihood> for u8 {
    fn from(value: Likelihood) -> Self {
        value.0
    }
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Likelihood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| Error::invalid_value("likelihood", s))
    }
}

/// Severity of a hazard's consequence, A (catastrophic) to E (negligible).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Severity {
    /// Catastrophic.
    A,
    /// Hazardous.
    B,
    /// Major.
    #[default]
    C,
    /// Minor.
    D,
    /// Negligible.
    E,
}

impl Severity {
    /// All severities, most severe first (matrix column order).
    pub const ALL: [Severity; 5] = [Severity::A, Severity::B, Severity::C, Severity::D, Severity::E];

    /// Numeric weight used by the classification score.
    #[must_use]
    pub fn weight(self) -> u8 {
        match self {
            Self::A => 5,
            Self::B => 4,
            Self::C => 3,
            Self::D => 2,
            Self::E => 1,
        }
    }

    /// Descriptive label (ICAO Doc 9859 severity table).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::A => "Catastrophic",
            Self::B => "Hazardous",
            Self::C => "Major",
            Self::D => "Minor",
            Self::E => "Negligible",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
        };
        f.write_str(letter)
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            "E" => Ok(Self::E),
            _ => Err(Error::invalid_value("severity", s)),
        }
    }
}

/// Mitigation status of a risk, independent of its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Hazard is present and not yet mitigated.
    #[default]
    Active,
    /// Mitigation is in place.
    Mitigated,
    /// Hazard is dormant but under surveillance.
    Latent,
}

impl Status {
    /// All statuses in display order.
    pub const ALL: [Status; 3] = [Status::Active, Status::Mitigated, Status::Latent];
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Mitigated => write!(f, "Mitigated"),
            Self::Latent => write!(f, "Latent"),
        }
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "mitigated" => Ok(Self::Mitigated),
            "latent" => Ok(Self::Latent),
            _ => Err(Error::invalid_value("status", s)),
        }
    }
}

/// A hazard logged in the safety register.
///
/// Field names and timestamp encoding (epoch milliseconds) follow the persisted
/// register layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRecord {
    /// Unique identifier, immutable.
    pub id: RiskId,
    /// Short hazard title.
    pub title: String,
    /// Hazard description.
    pub description: String,
    /// Design stage where the hazard was identified.
    pub stage: Stage,
    /// Likelihood of occurrence.
    pub likelihood: Likelihood,
    /// Severity of the consequence.
    pub severity: Severity,
    /// How the risk is (or will be) reduced.
    pub mitigation_plan: String,
    /// Mitigation status.
    pub status: Status,
    /// When the record was created.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// When the status was last changed.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_review: DateTime<Utc>,
}

impl RiskRecord {
    /// Risk tier derived from likelihood and severity.
    #[must_use]
    pub fn tier(&self) -> Tier {
        classification::classify(self.likelihood, self.severity)
    }

    /// Matrix code such as `4B`.
    #[must_use]
    pub fn matrix_code(&self) -> String {
        format!("{}{}", self.likelihood, self.severity)
    }

    /// Change the status and stamp the review time.
    ///
    /// The review time never moves backwards, even if the wall clock does.
    pub fn transition(&mut self, status: Status, at: DateTime<Utc>) {
        self.status = status;
        self.last_review = at.max(self.last_review);
    }
}

/// A risk being composed before it is committed to the register.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RiskDraft {
    /// Short hazard title.
    pub title: String,
    /// Hazard description.
    pub description: String,
    /// Design stage.
    pub stage: Stage,
    /// Likelihood of occurrence.
    pub likelihood: Likelihood,
    /// Severity of the consequence.
    pub severity: Severity,
    /// Mitigation plan.
    pub mitigation_plan: String,
}

impl RiskDraft {
    /// Start a draft with default classification values.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, stage: Stage) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            stage,
            ..Self::default()
        }
    }

    /// Whether the draft has enough text to ask for a suggestion.
    #[must_use]
    pub fn can_request_suggestion(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }

    /// Overwrite mitigation plan and classification with a suggestion.
    ///
    /// Consequences are informational and are not stored on the draft.
    pub fn apply_suggestion(&mut self, suggestion: &Suggestion) {
        self.mitigation_plan.clone_from(&suggestion.suggested_mitigation);
        self.likelihood = suggestion.suggested_likelihood;
        self.severity = suggestion.suggested_severity;
    }

    /// Turn the draft into an active record stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteDraft`] if the title, description or mitigation
    /// plan is blank.
    pub fn finalize(self) -> Result<RiskRecord> {
        self.finalize_at(now_millis())
    }

    /// Like [`RiskDraft::finalize`] with an explicit creation time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteDraft`] if a required field is blank.
    pub fn finalize_at(self, at: DateTime<Utc>) -> Result<RiskRecord> {
        if self.title.trim().is_empty() {
            return Err(Error::IncompleteDraft { field: "title" });
        }
        if self.description.trim().is_empty() {
            return Err(Error::IncompleteDraft {
                field: "description",
            });
        }
        if self.mitigation_plan.trim().is_empty() {
            return Err(Error::IncompleteDraft {
                field: "mitigation plan",
            });
        }

        Ok(RiskRecord {
            id: RiskId::generate(),
            title: self.title,
            description: self.description,
            stage: self.stage,
            likelihood: self.likelihood,
            severity: self.severity,
            mitigation_plan: self.mitigation_plan,
            status: Status::Active,
            created_at: at,
            last_review: at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn complete_draft() -> RiskDraft {
        let mut draft = RiskDraft::new(
            "Outdated obstacle database",
            "Survey data older than 24 months",
            Stage::DataGathering,
        );
        draft.mitigation_plan = "Commission a new survey".to_string();
        draft
    }

    #[test]
    fn test_likelihood_domain() {
        assert!(Likelihood::new(0).is_none());
        assert!(Likelihood::new(6).is_none());
        for v in 1..=5 {
            assert_eq!(Likelihood::new(v).unwrap().value(), v);
        }
        assert_eq!(Likelihood::default().value(), 3);
    }

    #[test]
    fn test_likelihood_parse() {
        assert_eq!("4".parse::<Likelihood>().unwrap().value(), 4);
        assert!("9".parse::<Likelihood>().unwrap_err().is_invalid_value());
        assert!("x".parse::<Likelihood>().is_err());
    }

    #[test]
    fn test_likelihood_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<Likelihood>("0").is_err());
        assert!(serde_json::from_str::<Likelihood>("6").is_err());
        assert_eq!(serde_json::from_str::<Likelihood>("5").unwrap(), Likelihood::MAX);
    }

    #[test]
    fn test_severity_weights_and_order() {
        let weights: Vec<u8> = Severity::ALL.iter().map(|s| s.weight()).collect();
        assert_eq!(weights, vec![5, 4, 3, 2, 1]);
        assert_eq!(Severity::default(), Severity::C);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("b".parse::<Severity>().unwrap(), Severity::B);
        assert_eq!(" E ".parse::<Severity>().unwrap(), Severity::E);
        assert!("F".parse::<Severity>().is_err());
        assert!(serde_json::from_str::<Severity>("\"F\"").is_err());
    }

    #[test]
    fn test_stage_parse() {
        assert_eq!(
            "obstacle_analysis".parse::<Stage>().unwrap(),
            Stage::ObstacleAnalysis
        );
        assert_eq!(
            "flight-validation".parse::<Stage>().unwrap(),
            Stage::FlightValidation
        );
        assert_eq!(
            "Ground Validation".parse::<Stage>().unwrap(),
            Stage::GroundValidation
        );
        assert!("taxi".parse::<Stage>().is_err());
    }

    #[test]
    fn test_stage_accepts_legacy_labels() {
        let stage: Stage = serde_json::from_str("\"Validación en Vuelo\"").unwrap();
        assert_eq!(stage, Stage::FlightValidation);
        assert_eq!(
            serde_json::to_string(&stage).unwrap(),
            "\"flight_validation\""
        );
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("MITIGATED".parse::<Status>().unwrap(), Status::Mitigated);
        assert_eq!(Status::Latent.to_string(), "Latent");
        assert!("closed".parse::<Status>().is_err());
    }

    #[test]
    fn test_finalize_creates_active_record() {
        let record = complete_draft().finalize().unwrap();

        assert_eq!(record.status, Status::Active);
        assert_eq!(record.created_at, record.last_review);
        assert_eq!(record.likelihood.value(), 3);
        assert_eq!(record.severity, Severity::C);
        assert!(!record.id.as_str().is_empty());
    }

    #[test]
    fn test_finalize_generates_distinct_ids() {
        let a = complete_draft().finalize().unwrap();
        let b = complete_draft().finalize().unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_finalize_requires_fields() {
        let mut draft = complete_draft();
        draft.mitigation_plan = "   ".to_string();
        assert!(matches!(
            draft.finalize(),
            Err(Error::IncompleteDraft {
                field: "mitigation plan"
            })
        ));

        let mut draft = complete_draft();
        draft.title.clear();
        assert!(matches!(
            draft.finalize(),
            Err(Error::IncompleteDraft { field: "title" })
        ));
    }

    #[test]
    fn test_can_request_suggestion() {
        assert!(complete_draft().can_request_suggestion());
        assert!(!RiskDraft::new("Title", "", Stage::DesignProcess).can_request_suggestion());
    }

    #[test]
    fn test_apply_suggestion() {
        let mut draft = complete_draft();
        let suggestion = Suggestion {
            consequences: "CFIT".to_string(),
            suggested_mitigation: "Resurvey obstacles".to_string(),
            suggested_likelihood: Likelihood::new(2).unwrap(),
            suggested_severity: Severity::A,
        };

        draft.apply_suggestion(&suggestion);

        assert_eq!(draft.mitigation_plan, "Resurvey obstacles");
        assert_eq!(draft.likelihood.value(), 2);
        assert_eq!(draft.severity, Severity::A);
        assert_eq!(draft.title, "Outdated obstacle database");
    }

    #[test]
    fn test_transition_never_moves_review_backwards() {
        let mut record = complete_draft().finalize().unwrap();
        let created = record.created_at;

        record.transition(Status::Latent, created - Duration::seconds(30));
        assert_eq!(record.status, Status::Latent);
        assert_eq!(record.last_review, created);

        let later = created + Duration::seconds(5);
        record.transition(Status::Mitigated, later);
        assert_eq!(record.last_review, later);
    }

    #[test]
    fn test_record_serialization_layout() {
        let record = complete_draft().finalize().unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert!(value.get("mitigationPlan").is_some());
        assert!(value.get("createdAt").unwrap().is_i64());
        assert_eq!(value.get("severity").unwrap(), "C");
        assert_eq!(value.get("likelihood").unwrap(), 3);
        assert_eq!(value.get("status").unwrap(), "Active");

        let back: RiskRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_matrix_code() {
        let mut record = complete_draft().finalize().unwrap();
        record.likelihood = Likelihood::new(4).unwrap();
        record.severity = Severity::B;
        assert_eq!(record.matrix_code(), "4B");
    }
}
