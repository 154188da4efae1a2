//! In-process slot backend.

use crate::error::{Error, Result};

use super::Persistence;

/// A slot held in memory.
///
/// Counts writes so callers can observe how often the register was persisted.
/// When built with [`MemorySlot::failing`], every save returns an error.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    value: Option<String>,
    writes: usize,
    fail_writes: bool,
}

impl MemorySlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot pre-filled with `payload`.
    #[must_use]
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            value: Some(payload.into()),
            ..Self::default()
        }
    }

    /// Create a slot that rejects every write.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Current slot contents.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Number of successful writes.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Persistence for MemorySlot {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.value.clone())
    }

    fn save(&mut self, payload: &str) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "slot is read-only",
            )));
        }
        self.value = Some(payload.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slot_is_empty() {
        let slot = MemorySlot::new();
        assert!(slot.load().unwrap().is_none());
        assert_eq!(slot.writes(), 0);
    }

    #[test]
    fn test_save_counts_writes() {
        let mut slot = MemorySlot::new();
        slot.save("a").unwrap();
        slot.save("b").unwrap();
        assert_eq!(slot.payload(), Some("b"));
        assert_eq!(slot.writes(), 2);
    }

    #[test]
    fn test_failing_slot_keeps_previous_value() {
        let mut slot = MemorySlot::failing();
        assert!(slot.save("x").is_err());
        assert!(slot.payload().is_none());
        assert_eq!(slot.writes(), 0);
    }
}
