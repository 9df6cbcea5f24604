//! Run-wide tables: serial-number dedup and per-model counts.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use indexmap::IndexMap;

/// Result of claiming a serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The serial was unseen and now belongs to the caller.
    Accepted,
    /// The serial was already claimed under `first_hostname`.
    Duplicate { first_hostname: String },
}

/// Serial number → hostname of the device that claimed it first.
///
/// Shared by every host worker in a run. Membership test and insert happen
/// under one lock, so two workers can never both claim the same serial.
#[derive(Debug, Default)]
pub struct DedupTable {
    seen: Mutex<HashMap<String, String>>,
}

impl DedupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check for `serial` and insert it when absent.
    pub fn claim(&self, serial: &str, hostname: &str) -> Claim {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        match seen.get(serial) {
            Some(first) => Claim::Duplicate {
                first_hostname: first.clone(),
            },
            None => {
                seen.insert(serial.to_string(), hostname.to_string());
                Claim::Accepted
            }
        }
    }

    /// Number of distinct serials claimed so far.
    pub fn claimed(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Count of accepted devices per model, in first-seen order.
///
/// Only the orchestrator's draining loop touches this, so it needs no lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCounts {
    entries: IndexMap<String, usize>,
}

impl ModelCounts {
    pub fn record(&mut self, model: &str) {
        match self.entries.get_mut(model) {
            Some(count) => *count += 1,
            None => {
                self.entries.insert(model.to_string(), 1);
            }
        }
    }

    pub fn get(&self, model: &str) -> usize {
        self.entries.get(model).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(m, c)| (m.as_str(), *c))
    }

    pub fn total(&self) -> usize {
        self.entries.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn claim_is_first_wins() {
        let table = DedupTable::new();
        assert_eq!(table.claim("FDO123", "edge-a"), Claim::Accepted);
        assert_eq!(
            table.claim("FDO123", "edge-b"),
            Claim::Duplicate {
                first_hostname: "edge-a".to_string()
            }
        );
        assert_eq!(table.claim("FDO999", "edge-b"), Claim::Accepted);
        assert_eq!(table.claimed(), 2);
    }

    #[test]
    fn concurrent_claims_accept_exactly_once() {
        let table = Arc::new(DedupTable::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let table = table.clone();
                std::thread::spawn(move || table.claim("SHARED", &format!("host-{i}")))
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|c| *c == Claim::Accepted)
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(table.claimed(), 1);
    }

    #[test]
    fn model_counts_keep_first_seen_order() {
        let mut counts = ModelCounts::default();
        counts.record("ISR4331/K9");
        counts.record("C1111-4P");
        counts.record("ISR4331/K9");

        let listed: Vec<_> = counts.iter().collect();
        assert_eq!(listed, vec![("ISR4331/K9", 2), ("C1111-4P", 1)]);
        assert_eq!(counts.get("C1111-4P"), 1);
        assert_eq!(counts.get("missing"), 0);
        assert_eq!(counts.total(), 3);
    }
}
