//! The risk register.
//!
//! [`RiskStore`] owns the ordered sequence of records (newest first) and
//! mirrors the full sequence to its [`Persistence`] slot after every mutation.
//! Persistence failures never reach the caller: an unreadable slot loads as an
//! empty register and a failed write leaves the in-memory register authoritative.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::aggregate::{
    self, DashboardSummary, MatrixCell, StageBreakdown, StageFilter, StatusBreakdown,
};
use crate::classification::Tier;
use crate::error::{Error, Result};
use crate::risk::{now_millis, RiskId, RiskRecord, Stage, Status};
use crate::storage::Persistence;

/// Serialize a register for the persistent slot.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(records: &[RiskRecord]) -> Result<String> {
    Ok(serde_json::to_string(records)?)
}

/// Parse a register read from the persistent slot.
///
/// # Errors
///
/// Returns an error if the payload is not a list of valid records.
pub fn decode(payload: &str) -> Result<Vec<RiskRecord>> {
    Ok(serde_json::from_str(payload)?)
}

/// In-memory register backed by a persistent slot.
#[derive(Debug)]
pub struct RiskStore<P> {
    records: Vec<RiskRecord>,
    backend: P,
}

impl<P: Persistence> RiskStore<P> {
    /// Open the register, loading whatever the slot holds.
    ///
    /// A missing or unparsable slot yields an empty register.
    pub fn open(backend: P) -> Self {
        let records = Self::load(&backend);
        debug!("Register loaded with {} risks", records.len());
        Self { records, backend }
    }

    /// Read and decode the slot, treating any failure as "no prior state".
    fn load(backend: &P) -> Vec<RiskRecord> {
        let payload = match backend.load() {
            Ok(Some(payload)) => payload,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read register slot, starting empty: {}", e);
                return Vec::new();
            }
        };

        let decoded = match decode(&payload) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to parse register slot, starting empty: {}", e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let total = decoded.len();
        let mut records: Vec<RiskRecord> = decoded
            .into_iter()
            .filter(|record| seen.insert(record.id.clone()))
            .collect();
        if records.len() < total {
            warn!(
                "Dropped {} risks with duplicate ids from register slot",
                total - records.len()
            );
        }

        for record in &mut records {
            if record.last_review < record.created_at {
                warn!(
                    "Risk {} reviewed before it was created, moving review to creation time",
                    record.id
                );
                record.last_review = record.created_at;
            }
        }
        records
    }

    /// Write the whole register to the slot; failures are logged and swallowed.
    fn persist(&mut self) {
        let result = encode(&self.records).and_then(|payload| self.backend.save(&payload));
        if let Err(e) = result {
            warn!("Failed to persist register: {}", e);
        }
    }

    /// Insert a record at the front of the register.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRisk`] if a record with the same id exists; the
    /// register is left unchanged and nothing is written.
    pub fn add(&mut self, record: RiskRecord) -> Result<()> {
        if self.get(&record.id).is_some() {
            return Err(Error::DuplicateRisk {
                id: record.id.to_string(),
            });
        }
        debug!("Adding risk {} ({})", record.id, record.matrix_code());
        self.records.insert(0, record);
        self.persist();
        Ok(())
    }

    /// Delete the record with `id`. Absent ids are a no-op.
    ///
    /// Returns `true` if a record was removed.
    pub fn remove(&mut self, id: &RiskId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| &r.id != id);
        let removed = self.records.len() < before;
        if removed {
            debug!("Removed risk {}", id);
        } else {
            debug!("Remove ignored, no risk {}", id);
        }
        self.persist();
        removed
    }

    /// Set the status of the record with `id` and stamp its review time.
    /// Absent ids are a no-op.
    ///
    /// Returns `true` if a record was updated.
    pub fn update_status(&mut self, id: &RiskId, status: Status) -> bool {
        let now = now_millis();
        let updated = match self.records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                debug!("Risk {} status {} -> {}", id, record.status, status);
                record.transition(status, now);
                true
            }
            None => {
                debug!("Status update ignored, no risk {}", id);
                false
            }
        };
        self.persist();
        updated
    }

    /// All records, newest first.
    #[must_use]
    pub fn records(&self) -> &[RiskRecord] {
        &self.records
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &RiskId) -> Option<&RiskRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the register is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The persistence backend.
    #[must_use]
    pub fn backend(&self) -> &P {
        &self.backend
    }

    // Projections over the current contents.

    /// See [`aggregate::count_by_stage`].
    #[must_use]
    pub fn count_by_stage(&self, stage: Stage) -> usize {
        aggregate::count_by_stage(&self.records, stage)
    }

    /// See [`aggregate::count_by_stage_and_tier`].
    #[must_use]
    pub fn count_by_stage_and_tier(&self, stage: Stage, tier: Tier) -> usize {
        aggregate::count_by_stage_and_tier(&self.records, stage, tier)
    }

    /// See [`aggregate::count_by_status`].
    #[must_use]
    pub fn count_by_status(&self, status: Status) -> usize {
        aggregate::count_by_status(&self.records, status)
    }

    /// See [`aggregate::mitigation_efficiency`].
    #[must_use]
    pub fn mitigation_efficiency(&self) -> f64 {
        aggregate::mitigation_efficiency(&self.records)
    }

    /// See [`aggregate::unresolved_critical_count`].
    #[must_use]
    pub fn unresolved_critical_count(&self) -> usize {
        aggregate::unresolved_critical_count(&self.records)
    }

    /// See [`aggregate::filter_by_stage`].
    #[must_use]
    pub fn filter_by_stage(&self, filter: StageFilter) -> Vec<&RiskRecord> {
        aggregate::filter_by_stage(&self.records, filter)
    }

    /// See [`aggregate::stage_breakdown`].
    #[must_use]
    pub fn stage_breakdown(&self) -> Vec<StageBreakdown> {
        aggregate::stage_breakdown(&self.records)
    }

    /// See [`aggregate::status_breakdown`].
    #[must_use]
    pub fn status_breakdown(&self) -> StatusBreakdown {
        aggregate::status_breakdown(&self.records)
    }

    /// See [`aggregate::risk_matrix`].
    #[must_use]
    pub fn risk_matrix(&self) -> Vec<Vec<MatrixCell>> {
        aggregate::risk_matrix(&self.records)
    }

    /// See [`aggregate::dashboard_summary`].
    #[must_use]
    pub fn dashboard_summary(&self) -> DashboardSummary {
        aggregate::dashboard_summary(&self.records)
    }
}
