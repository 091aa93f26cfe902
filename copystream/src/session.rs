// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Turn store
//
// Keeps the accumulators of concurrently streaming turns, keyed by turn id.
// Turns whose stream went quiet are finalized as aborted by `cleanup`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::engine::{ContentEngine, FinalizedMessage, ParsedChannels};
use crate::turn::{TurnAccumulator, TurnError};

// ---------------------------------------------------------------------------
// TurnStore trait
// ---------------------------------------------------------------------------

/// Trait for in-flight turn storage.
///
/// Implementations must be thread-safe (Send + Sync): chunks for different
/// turns arrive from different tasks.
pub trait TurnStore: Send + Sync {
    /// Start a turn. Returns false if a turn with this id is already running.
    fn start(&self, turn_id: &str) -> bool;

    /// Append a chunk to a running turn.
    fn append(&self, turn_id: &str, chunk: &str) -> Result<Option<ParsedChannels>, TurnError>;

    /// Finalize and remove a turn whose stream completed.
    fn finish(&self, turn_id: &str) -> Result<FinalizedMessage, TurnError>;

    /// Finalize and remove a turn whose stream failed.
    fn abort(&self, turn_id: &str) -> Result<FinalizedMessage, TurnError>;

    /// Abort turns idle for longer than `max_age`, returning their
    /// finalized snapshots.
    fn cleanup(&self, max_age: Duration) -> Vec<(String, FinalizedMessage)>;
}

// ---------------------------------------------------------------------------
// InMemoryTurnStore
// ---------------------------------------------------------------------------

struct TurnEntry {
    accumulator: TurnAccumulator,
    last_seen: DateTime<Utc>,
}

/// In-memory turn store backed by `DashMap` for concurrent access.
pub struct InMemoryTurnStore {
    engine: Arc<ContentEngine>,
    turns: DashMap<String, TurnEntry>,
}

impl InMemoryTurnStore {
    pub fn new(engine: Arc<ContentEngine>) -> Self {
        Self {
            engine,
            turns: DashMap::new(),
        }
    }

    /// Number of running turns (for metrics/testing).
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn contains(&self, turn_id: &str) -> bool {
        self.turns.contains_key(turn_id)
    }

    fn remove(&self, turn_id: &str) -> Result<TurnAccumulator, TurnError> {
        self.turns
            .remove(turn_id)
            .map(|(_, entry)| entry.accumulator)
            .ok_or_else(|| TurnError::UnknownTurn(turn_id.to_string()))
    }

    /// Test helper: backdate a turn's activity.
    #[cfg(test)]
    fn set_last_seen(&self, turn_id: &str, last_seen: DateTime<Utc>) {
        if let Some(mut entry) = self.turns.get_mut(turn_id) {
            entry.last_seen = last_seen;
        }
    }
}

impl TurnStore for InMemoryTurnStore {
    fn start(&self, turn_id: &str) -> bool {
        match self.turns.entry(turn_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(TurnEntry {
                    accumulator: TurnAccumulator::new(self.engine.clone()),
                    last_seen: Utc::now(),
                });
                tracing::debug!(turn_id, "turn started");
                true
            }
        }
    }

    fn append(&self, turn_id: &str, chunk: &str) -> Result<Option<ParsedChannels>, TurnError> {
        let mut entry = self
            .turns
            .get_mut(turn_id)
            .ok_or_else(|| TurnError::UnknownTurn(turn_id.to_string()))?;
        entry.last_seen = Utc::now();
        entry.accumulator.append(chunk)
    }

    fn finish(&self, turn_id: &str) -> Result<FinalizedMessage, TurnError> {
        self.remove(turn_id)?.finish()
    }

    fn abort(&self, turn_id: &str) -> Result<FinalizedMessage, TurnError> {
        self.remove(turn_id)?.abort()
    }

    fn cleanup(&self, max_age: Duration) -> Vec<(String, FinalizedMessage)> {
        let now = Utc::now();
        let stale: Vec<String> = self
            .turns
            .iter()
            .filter(|entry| {
                let age = now
                    .signed_duration_since(entry.last_seen)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                age > max_age
            })
            .map(|entry| entry.key().clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|turn_id| {
                let message = self.abort(&turn_id).ok()?;
                tracing::info!(turn_id = %turn_id, "abandoned turn finalized");
                Some((turn_id, message))
            })
            .collect()
    }
}
