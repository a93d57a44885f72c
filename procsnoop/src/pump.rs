//! The event pump: the single reader of the ring buffer.

use crate::cancel::CancellationToken;
use crate::error::ReadError;
use crate::event::{self, ProcessEvent};
use async_trait::async_trait;
use aya::maps::{MapData, RingBuf};
use bytes::Bytes;
use std::io::{self, Write};
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tracing::{debug, info, warn};

const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Where raw records come from.
#[async_trait]
pub trait RecordSource: Send {
    /// Waits for the next record. There is no timeout; cancellation is
    /// handled by the pump racing this call.
    async fn next_record(&mut self) -> Result<Bytes, ReadError>;
}

/// Where decoded events go.
pub trait EventSink: Send {
    fn emit(&mut self, event: &ProcessEvent) -> io::Result<()>;
}

pub struct RingBufSource {
    inner: AsyncFd<RingBuf<MapData>>,
}

impl RingBufSource {
    pub fn new(ring_buf: RingBuf<MapData>) -> io::Result<Self> {
        Ok(Self {
            inner: AsyncFd::new(ring_buf)?,
        })
    }
}

#[async_trait]
impl RecordSource for RingBufSource {
    async fn next_record(&mut self) -> Result<Bytes, ReadError> {
        loop {
            let mut guard = self.inner.readable_mut().await?;
            let record = guard
                .get_inner_mut()
                .next()
                .map(|item| Bytes::copy_from_slice(&item));
            match record {
                // 保持 ready 状态，缓冲区里可能还有记录
                Some(record) => return Ok(record),
                None => guard.clear_ready(),
            }
        }
    }
}

/// Prints each event as one line on stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&mut self, event: &ProcessEvent) -> io::Result<()> {
        let line = event::render(event);
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub rendered: u64,
    pub decode_errors: u64,
    pub read_errors: u64,
    pub sink_errors: u64,
}

pub struct EventPump<S, K> {
    source: S,
    sink: K,
    cancel: CancellationToken,
}

impl<S, K> EventPump<S, K>
where
    S: RecordSource,
    K: EventSink,
{
    pub fn new(source: S, sink: K, cancel: CancellationToken) -> Self {
        Self {
            source,
            sink,
            cancel,
        }
    }

    /// Drains the source until cancelled. Records are handled strictly in
    /// arrival order and each one is emitted before the next read.
    pub async fn run(self) -> PumpStats {
        let Self {
            mut source,
            mut sink,
            cancel,
        } = self;
        let mut stats = PumpStats::default();
        info!("[Pump] Event pump started.");

        while !cancel.is_cancelled() {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = source.next_record() => next,
            };

            let raw = match next {
                Ok(raw) => raw,
                Err(e) if cancel.is_cancelled() => {
                    debug!("[Pump] Read interrupted by shutdown: {}", e);
                    break;
                }
                Err(e) => {
                    stats.read_errors += 1;
                    warn!("[Pump] Failed reading from ring buffer: {}", e);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(READ_ERROR_BACKOFF) => {}
                    }
                    continue;
                }
            };

            let event = match event::decode(&raw) {
                Ok(event) => event,
                Err(e) => {
                    stats.decode_errors += 1;
                    warn!("[Pump] Skipping malformed record: {} ({:02x?})", e, &raw[..]);
                    continue;
                }
            };

            match sink.emit(&event) {
                Ok(()) => stats.rendered += 1,
                Err(e) => {
                    stats.sink_errors += 1;
                    warn!("[Pump] Failed to emit event for pid {}: {}", event.pid, e);
                }
            }
        }

        info!("[Pump] Event pump stopped: {:?}", stats);
        stats
    }
}
