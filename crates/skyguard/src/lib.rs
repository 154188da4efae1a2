//! `skyguard` - Safety risk register for instrument flight procedure design
//!
//! This library provides the risk record model, the likelihood/severity
//! classification, a register that persists itself through a pluggable
//! key-value slot, the projections behind the dashboard views and the
//! suggestion assistant used when composing new records.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod classification;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod risk;
pub mod storage;
pub mod store;
pub mod suggest;

pub use aggregate::{DashboardSummary, MatrixCell, StageFilter};
pub use classification::{classify, score, Tier};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use risk::{Likelihood, RiskDraft, RiskId, RiskRecord, Severity, Stage, Status};
pub use storage::{MemorySlot, Persistence, SlotStats, SqliteSlot};
pub use store::RiskStore;
pub use suggest::{SuggestOutcome, Suggestion, SuggestionAssistant, SuggestionProvider};
