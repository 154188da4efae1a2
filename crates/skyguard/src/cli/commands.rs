//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::aggregate::StageFilter;
use crate::risk::{Likelihood, Severity, Stage, Status};

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Short hazard title
    #[arg(short, long)]
    pub title: String,

    /// Hazard description
    #[arg(short, long)]
    pub description: String,

    /// Design stage where the hazard was identified
    #[arg(short, long, value_enum)]
    pub stage: StageArg,

    /// Likelihood of occurrence (1 = extremely improbable, 5 = frequent)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub likelihood: Option<u8>,

    /// Severity of the consequence (A = catastrophic, E = negligible)
    #[arg(short = 'e', long, value_enum, ignore_case = true)]
    pub severity: Option<SeverityArg>,

    /// Mitigation plan
    #[arg(short, long)]
    pub mitigation: Option<String>,

    /// Ask the suggestion service for mitigation and classification first
    #[arg(long)]
    pub suggest: bool,
}

impl AddCommand {
    /// Likelihood given on the command line, if any.
    #[must_use]
    pub fn likelihood(&self) -> Option<Likelihood> {
        self.likelihood.and_then(Likelihood::new)
    }
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show risks from this stage ("all" for every stage)
    #[arg(short, long, default_value = "all")]
    pub stage: StageFilter,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Identifier of the risk
    pub id: String,

    /// New lifecycle status
    #[arg(value_enum)]
    pub status: StatusArg,
}

/// Remove command arguments.
#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Identifier of the risk
    pub id: String,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Suggest command arguments.
#[derive(Debug, Args)]
pub struct SuggestCommand {
    /// Short hazard title
    #[arg(short, long)]
    pub title: String,

    /// Hazard description
    #[arg(short, long)]
    pub description: String,

    /// Design stage where the hazard was identified
    #[arg(short, long, value_enum, default_value = "data-gathering")]
    pub stage: StageArg,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Design stage argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StageArg {
    /// Data gathering
    DataGathering,
    /// Obstacle analysis
    ObstacleAnalysis,
    /// Design process (PANS-OPS)
    DesignProcess,
    /// Ground validation
    GroundValidation,
    /// Flight validation
    FlightValidation,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::DataGathering => Self::DataGathering,
            StageArg::ObstacleAnalysis => Self::ObstacleAnalysis,
            StageArg::DesignProcess => Self::DesignProcess,
            StageArg::GroundValidation => Self::GroundValidation,
            StageArg::FlightValidation => Self::FlightValidation,
        }
    }
}

/// Severity argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    /// Catastrophic
    A,
    /// Hazardous
    B,
    /// Major
    C,
    /// Minor
    D,
    /// Negligible
    E,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::A => Self::A,
            SeverityArg::B => Self::B,
            SeverityArg::C => Self::C,
            SeverityArg::D => Self::D,
            SeverityArg::E => Self::E,
        }
    }
}

/// Lifecycle status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Open hazard being worked
    Active,
    /// Mitigation implemented
    Mitigated,
    /// Hidden hazard, not currently manifesting
    Latent,
}

impl From<StatusArg> for Status {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => Self::Active,
            StatusArg::Mitigated => Self::Mitigated,
            StatusArg::Latent => Self::Latent,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_arg_conversion() {
        assert_eq!(Stage::from(StageArg::DataGathering), Stage::DataGathering);
        assert_eq!(
            Stage::from(StageArg::ObstacleAnalysis),
            Stage::ObstacleAnalysis
        );
        assert_eq!(Stage::from(StageArg::DesignProcess), Stage::DesignProcess);
        assert_eq!(
            Stage::from(StageArg::GroundValidation),
            Stage::GroundValidation
        );
        assert_eq!(
            Stage::from(StageArg::FlightValidation),
            Stage::FlightValidation
        );
    }

    #[test]
    fn test_stage_arg_names_match_stage_ids() {
        for arg in StageArg::value_variants() {
            let name = arg.to_possible_value().unwrap().get_name().to_string();
            let stage: Stage = name.parse().unwrap();
            assert_eq!(stage, Stage::from(*arg));
        }
    }

    #[test]
    fn test_severity_arg_conversion() {
        assert_eq!(Severity::from(SeverityArg::A), Severity::A);
        assert_eq!(Severity::from(SeverityArg::C), Severity::C);
        assert_eq!(Severity::from(SeverityArg::E), Severity::E);
    }

    #[test]
    fn test_status_arg_conversion() {
        assert_eq!(Status::from(StatusArg::Active), Status::Active);
        assert_eq!(Status::from(StatusArg::Mitigated), Status::Mitigated);
        assert_eq!(Status::from(StatusArg::Latent), Status::Latent);
    }

    #[test]
    fn test_add_command_likelihood() {
        let cmd = AddCommand {
            title: "t".to_string(),
            description: "d".to_string(),
            stage: StageArg::DesignProcess,
            likelihood: Some(4),
            severity: None,
            mitigation: None,
            suggest: false,
        };
        assert_eq!(cmd.likelihood().map(Likelihood::value), Some(4));
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
