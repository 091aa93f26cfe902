// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Turn accumulator
//
// Owns the raw buffer of one generation turn. Chunks are appended as they
// arrive; the whole buffer is re-parsed for a live preview at most once per
// reparse interval, and finalized exactly once.

use std::sync::Arc;
use std::time::Instant;

use crate::classify::ClassificationLock;
use crate::engine::{ContentEngine, FinalizedMessage, ParsedChannels};
use crate::marker::ScanMode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("turn buffer limit exceeded: {attempted} bytes > {limit} bytes")]
    BufferOverflow { limit: usize, attempted: usize },

    #[error("turn already finished")]
    Finished,

    #[error("unknown turn: {0}")]
    UnknownTurn(String),
}

pub struct TurnAccumulator {
    engine: Arc<ContentEngine>,
    buffer: String,
    lock: ClassificationLock,
    last_parse_at: Option<Instant>,
    /// Buffer length covered by `latest`.
    parsed_len: usize,
    latest: Option<ParsedChannels>,
    finished: bool,
}

impl TurnAccumulator {
    pub fn new(engine: Arc<ContentEngine>) -> Self {
        Self {
            engine,
            buffer: String::new(),
            lock: ClassificationLock::new(),
            last_parse_at: None,
            parsed_len: 0,
            latest: None,
            finished: false,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn lock(&self) -> ClassificationLock {
        self.lock
    }

    /// Append a chunk. Returns a fresh preview when the reparse interval
    /// has elapsed since the last one.
    pub fn append(&mut self, chunk: &str) -> Result<Option<ParsedChannels>, TurnError> {
        self.append_at(chunk, Instant::now())
    }

    pub fn append_at(
        &mut self,
        chunk: &str,
        now: Instant,
    ) -> Result<Option<ParsedChannels>, TurnError> {
        if self.finished {
            return Err(TurnError::Finished);
        }

        let limit = self.engine.config().stream.max_buffer_bytes;
        let attempted = self.buffer.len() + chunk.len();
        if attempted > limit {
            return Err(TurnError::BufferOverflow { limit, attempted });
        }
        self.buffer.push_str(chunk);

        let interval = self.engine.config().stream.reparse_interval;
        let due = self
            .last_parse_at
            .map_or(true, |last| now.saturating_duration_since(last) >= interval);
        if !due {
            return Ok(None);
        }
        Ok(Some(self.reparse(now)))
    }

    /// Re-parse the whole buffer now, regardless of the interval.
    pub fn preview(&mut self) -> ParsedChannels {
        self.reparse(Instant::now())
    }

    /// The most recent preview, if any.
    pub fn snapshot(&self) -> Option<&ParsedChannels> {
        self.latest.as_ref()
    }

    /// Finalize the full buffer.
    pub fn finish(&mut self) -> Result<FinalizedMessage, TurnError> {
        self.mark_finished()?;
        Ok(self.engine.finalize(&self.buffer, &mut self.lock))
    }

    /// Finalize the part of the buffer covered by the last preview, for a
    /// stream that ended in an error.
    pub fn abort(&mut self) -> Result<FinalizedMessage, TurnError> {
        self.mark_finished()?;
        tracing::debug!(
            buffer_bytes = self.buffer.len(),
            parsed_bytes = self.parsed_len,
            "turn aborted, finalizing last snapshot"
        );
        let snapshot = &self.buffer[..self.parsed_len];
        Ok(self.engine.finalize_aborted(snapshot, &mut self.lock))
    }

    fn mark_finished(&mut self) -> Result<(), TurnError> {
        if self.finished {
            return Err(TurnError::Finished);
        }
        self.finished = true;
        Ok(())
    }

    fn reparse(&mut self, now: Instant) -> ParsedChannels {
        let parsed = self
            .engine
            .parse_locked(&self.buffer, ScanMode::Streaming, &mut self.lock);
        self.last_parse_at = Some(now);
        self.parsed_len = self.buffer.len();
        self.latest = Some(parsed.clone());
        parsed
    }
}
