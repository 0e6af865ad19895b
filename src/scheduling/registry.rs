use std::{collections::BTreeMap, fmt, sync::Arc};

use log::{info, warn};
use serde::Serialize;

use crate::{
    error::{FedErr, Result},
    participant::{Participant, ParticipantErr, ParticipantId},
};

/// Whether a participant can be selected for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    /// Failed too many consecutive rounds, skipped until reinstated.
    Unreachable,
    /// Missed the deadline of the current round, back to `Available` on the next one.
    TimedOut,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Availability::Available => "available",
            Availability::Unreachable => "unreachable",
            Availability::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

struct Entry {
    participant: Arc<dyn Participant>,
    availability: Availability,
    consecutive_failures: usize,
}

/// Tracks the members of a federation and their health across rounds.
pub struct Registry {
    entries: BTreeMap<ParticipantId, Entry>,
    max_consecutive_failures: usize,
}

impl Registry {
    /// Creates an empty `Registry`.
    ///
    /// # Arguments
    /// * `max_consecutive_failures` - The amount of failed rounds in a row after which a
    ///   participant becomes unreachable.
    pub fn new(max_consecutive_failures: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_consecutive_failures: max_consecutive_failures.max(1),
        }
    }

    /// Adds a participant, ids must be unique.
    pub fn register(&mut self, participant: Arc<dyn Participant>) -> Result<()> {
        let id = participant.id();
        if self.entries.contains_key(&id) {
            return Err(FedErr::InvalidConfig(format!(
                "participant id {id} is registered twice"
            )));
        }

        self.entries.insert(
            id,
            Entry {
                participant,
                availability: Availability::Available,
                consecutive_failures: 0,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<Arc<dyn Participant>> {
        self.entries.get(&id).map(|e| Arc::clone(&e.participant))
    }

    pub fn availability(&self, id: ParticipantId) -> Option<Availability> {
        self.entries.get(&id).map(|e| e.availability)
    }

    pub fn consecutive_failures(&self, id: ParticipantId) -> Option<usize> {
        self.entries.get(&id).map(|e| e.consecutive_failures)
    }

    /// Returns the ids that may take part in a round, in ascending order.
    ///
    /// Timed out participants are still selectable, they only missed one round's deadline.
    pub fn selectable(&self) -> Vec<ParticipantId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.availability != Availability::Unreachable)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Clears the per-round timeout markers.
    pub fn begin_round(&mut self) {
        for entry in self.entries.values_mut() {
            if entry.availability == Availability::TimedOut {
                entry.availability = Availability::Available;
            }
        }
    }

    /// Records that a participant delivered a usable update.
    pub fn record_success(&mut self, id: ParticipantId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.consecutive_failures = 0;
            entry.availability = Availability::Available;
        }
    }

    /// Records a participant failure.
    ///
    /// # Returns
    /// The participant's availability after the failure.
    pub fn record_failure(&mut self, id: ParticipantId, err: &ParticipantErr) -> Option<Availability> {
        let max = self.max_consecutive_failures;
        let entry = self.entries.get_mut(&id)?;
        entry.consecutive_failures += 1;

        entry.availability = if entry.consecutive_failures >= max {
            warn!(
                participant = id.0,
                failures = entry.consecutive_failures;
                "participant marked unreachable: {err}"
            );
            Availability::Unreachable
        } else if matches!(err, ParticipantErr::TrainingTimeout { .. }) {
            Availability::TimedOut
        } else {
            Availability::Available
        };

        Some(entry.availability)
    }

    /// Makes an unreachable participant selectable again and clears its failures.
    ///
    /// # Returns
    /// false if the id is unknown.
    pub fn reinstate(&mut self, id: ParticipantId) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };

        entry.availability = Availability::Available;
        entry.consecutive_failures = 0;
        info!(participant = id.0; "participant reinstated");
        true
    }
}
