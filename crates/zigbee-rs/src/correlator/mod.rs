// crates/zigbee-rs/src/correlator/mod.rs
//! Correlation of bridge responses with the commands that caused them.
//!
//! Every command sent to the bridge opens a `PendingExchange` keyed by
//! `(CommandKind, sequence)`. The exchange ends exactly once: completed by a
//! matching response, timed out by `tick`, or aborted by its owner. Ending it
//! removes it from the table and releases its sequence number, and the caller
//! receives a single `ExchangeCompletion` describing the outcome.

pub mod sequence;

pub use sequence::SequenceAllocator;

use crate::bridge::{BridgeStatus, CommandKind, ResponsePayload};
use crate::hal::ZigbeeError;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use log::{debug, trace, warn};

/// Timeout of a bridge exchange when the caller does not pick one.
pub const DEFAULT_EXCHANGE_TIMEOUT_MS: u64 = 2000;

/// Opaque identifier of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExchangeHandle(pub u32);

/// Lifecycle of an exchange. Exchanges in the table are always `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Waiting,
    Completed,
    Aborted,
    TimedOut,
}

/// One outstanding command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub handle: ExchangeHandle,
    pub kind: CommandKind,
    pub sequence: u8,
    pub deadline_us: u64,
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// A matching response arrived. `status` may still be a failure.
    Completed {
        status: BridgeStatus,
        payload: ResponsePayload,
    },
    TimedOut,
    Aborted,
}

impl ExchangeOutcome {
    pub fn state(&self) -> ExchangeState {
        match self {
            Self::Completed { .. } => ExchangeState::Completed,
            Self::TimedOut => ExchangeState::TimedOut,
            Self::Aborted => ExchangeState::Aborted,
        }
    }

    /// True only for a completed exchange with a success status.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Completed {
                status: BridgeStatus::Success,
                ..
            }
        )
    }
}

/// The single completion event of an exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeCompletion {
    pub handle: ExchangeHandle,
    pub kind: CommandKind,
    pub sequence: u8,
    pub outcome: ExchangeOutcome,
}

impl ExchangeCompletion {
    /// The final state of the exchange.
    pub fn state(&self) -> ExchangeState {
        self.outcome.state()
    }
}

/// The table of waiting exchanges of one network instance.
#[derive(Debug, Default)]
pub struct ReplyCorrelator {
    exchanges: BTreeMap<ExchangeHandle, PendingExchange>,
    /// Sequence number -> owning exchange. The sequence space is shared by
    /// all command kinds.
    reserved: BTreeMap<u8, ExchangeHandle>,
    sequence: SequenceAllocator,
    next_handle: u32,
}

impl ReplyCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an exchange for a command sent with an explicit sequence number.
    pub fn submit(
        &mut self,
        kind: CommandKind,
        sequence: u8,
        timeout_ms: u64,
        current_time_us: u64,
    ) -> Result<ExchangeHandle, ZigbeeError> {
        if self.reserved.contains_key(&sequence) {
            warn!(
                "[CORR] Refusing {:?} with sequence {}: already reserved.",
                kind, sequence
            );
            return Err(ZigbeeError::SequenceInUse(sequence));
        }

        self.next_handle = self.next_handle.wrapping_add(1);
        let handle = ExchangeHandle(self.next_handle);
        let deadline_us = current_time_us.saturating_add(timeout_ms.saturating_mul(1000));
        self.exchanges.insert(
            handle,
            PendingExchange {
                handle,
                kind,
                sequence,
                deadline_us,
            },
        );
        self.reserved.insert(sequence, handle);
        debug!(
            "[CORR] Exchange {:?} opened: {:?} seq={} deadline={}us",
            handle, kind, sequence, deadline_us
        );
        Ok(handle)
    }

    /// Allocates a free sequence number and opens an exchange with it.
    /// Returns the handle and the sequence number to put on the wire.
    pub fn submit_next(
        &mut self,
        kind: CommandKind,
        timeout_ms: u64,
        current_time_us: u64,
    ) -> Result<(ExchangeHandle, u8), ZigbeeError> {
        let reserved = &self.reserved;
        let sequence = self.sequence.allocate(|s| reserved.contains_key(&s))?;
        let handle = self.submit(kind, sequence, timeout_ms, current_time_us)?;
        Ok((handle, sequence))
    }

    /// Routes a response to the waiting exchange with the same kind and
    /// sequence number. Returns `None` when nothing matches; the frame then
    /// belongs to the unsolicited path.
    pub fn complete(
        &mut self,
        kind: CommandKind,
        sequence: u8,
        status: BridgeStatus,
        payload: ResponsePayload,
    ) -> Option<ExchangeCompletion> {
        let handle = *self.reserved.get(&sequence)?;
        let matches = self
            .exchanges
            .get(&handle)
            .is_some_and(|ex| ex.kind == kind);
        if !matches {
            trace!(
                "[CORR] {:?} seq={} does not match the waiting exchange {:?}.",
                kind, sequence, handle
            );
            return None;
        }
        debug!(
            "[CORR] Exchange {:?} completed: {:?} seq={} status={}",
            handle, kind, sequence, status
        );
        self.finish(handle, ExchangeOutcome::Completed { status, payload })
    }

    /// Times out every exchange whose deadline has been reached, earliest first.
    pub fn tick(&mut self, current_time_us: u64) -> Vec<ExchangeCompletion> {
        let mut expired: Vec<(u64, ExchangeHandle)> = self
            .exchanges
            .values()
            .filter(|ex| current_time_us >= ex.deadline_us)
            .map(|ex| (ex.deadline_us, ex.handle))
            .collect();
        expired.sort_unstable();

        expired
            .into_iter()
            .filter_map(|(_, handle)| {
                if let Some(ex) = self.exchanges.get(&handle) {
                    warn!(
                        "[CORR] Exchange {:?} timed out: {:?} seq={}",
                        handle, ex.kind, ex.sequence
                    );
                }
                self.finish(handle, ExchangeOutcome::TimedOut)
            })
            .collect()
    }

    /// Aborts one exchange immediately, releasing its sequence number.
    pub fn abort(&mut self, handle: ExchangeHandle) -> Result<ExchangeCompletion, ZigbeeError> {
        debug!("[CORR] Aborting exchange {:?}", handle);
        self.finish(handle, ExchangeOutcome::Aborted)
            .ok_or(ZigbeeError::UnknownExchange)
    }

    /// Aborts every waiting exchange (network teardown).
    pub fn abort_all(&mut self) -> Vec<ExchangeCompletion> {
        let handles: Vec<ExchangeHandle> = self.exchanges.keys().copied().collect();
        if !handles.is_empty() {
            debug!("[CORR] Aborting {} waiting exchange(s).", handles.len());
        }
        handles
            .into_iter()
            .filter_map(|h| self.finish(h, ExchangeOutcome::Aborted))
            .collect()
    }

    /// The earliest deadline of all waiting exchanges.
    pub fn next_deadline(&self) -> Option<u64> {
        self.exchanges.values().map(|ex| ex.deadline_us).min()
    }

    pub fn is_waiting(&self, kind: CommandKind, sequence: u8) -> bool {
        self.reserved
            .get(&sequence)
            .and_then(|h| self.exchanges.get(h))
            .is_some_and(|ex| ex.kind == kind)
    }

    pub fn is_sequence_reserved(&self, sequence: u8) -> bool {
        self.reserved.contains_key(&sequence)
    }

    pub fn waiting_count(&self) -> usize {
        self.exchanges.len()
    }

    pub fn get(&self, handle: ExchangeHandle) -> Option<&PendingExchange> {
        self.exchanges.get(&handle)
    }

    fn finish(
        &mut self,
        handle: ExchangeHandle,
        outcome: ExchangeOutcome,
    ) -> Option<ExchangeCompletion> {
        let exchange = self.exchanges.remove(&handle)?;
        self.reserved.remove(&exchange.sequence);
        Some(ExchangeCompletion {
            handle,
            kind: exchange.kind,
            sequence: exchange.sequence,
            outcome,
        })
    }
}
