// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

// Preview processor
//
// Takes an upstream byte stream for one turn, feeds it through a turn
// accumulator, and produces a stream of preview events followed by the
// finalized message.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use super::decoder::Utf8Carry;
use super::types::{PreviewEvent, UpstreamAbort};
use crate::engine::{ContentEngine, FinalizedMessage};
use crate::turn::TurnAccumulator;

/// Capacity of the event channel between the processing task and the
/// consumer.
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct PreviewProcessor {
    engine: Arc<ContentEngine>,
}

impl PreviewProcessor {
    pub fn new(engine: Arc<ContentEngine>) -> Self {
        Self { engine }
    }

    /// Process an upstream chunk stream, producing preview events.
    ///
    /// Previews are emitted as the reparse interval allows. The stream always
    /// ends with one `Finished` event: the full buffer when the upstream
    /// completes, or the last parsed snapshot (marked aborted) when it yields
    /// an error or the turn rejects a chunk.
    pub fn process(
        &self,
        mut input: impl Stream<Item = Result<Bytes, UpstreamAbort>> + Unpin + Send + 'static,
    ) -> impl Stream<Item = PreviewEvent> {
        let engine = self.engine.clone();
        let (tx, rx) = mpsc::channel::<PreviewEvent>(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut turn = TurnAccumulator::new(engine);
            let mut decoder = Utf8Carry::new();

            while let Some(item) = input.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(abort) => {
                        tracing::info!(error = %abort, bytes = turn.len(), "upstream stream aborted");
                        let _ = send_finished(&tx, turn.abort().ok()).await;
                        return;
                    }
                };

                let text = decoder.push(&bytes);
                if text.is_empty() {
                    continue;
                }
                match turn.append(&text) {
                    Ok(Some(preview)) => {
                        if tx.send(PreviewEvent::Preview(preview)).await.is_err() {
                            return; // Consumer went away
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "chunk rejected, finalizing last snapshot");
                        let _ = send_finished(&tx, turn.abort().ok()).await;
                        return;
                    }
                }
            }

            let tail = decoder.finish();
            if !tail.is_empty() {
                if let Err(e) = turn.append(&tail) {
                    tracing::warn!(error = %e, "trailing bytes rejected");
                }
            }
            let _ = send_finished(&tx, turn.finish().ok()).await;
        });

        ReceiverStream::new(rx)
    }
}

async fn send_finished(
    tx: &mpsc::Sender<PreviewEvent>,
    message: Option<FinalizedMessage>,
) -> Result<(), mpsc::error::SendError<PreviewEvent>> {
    match message {
        Some(message) => tx.send(PreviewEvent::Finished(message)).await,
        None => Ok(()),
    }
}
