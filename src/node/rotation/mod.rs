//! Rotation over reachable descriptors
//!
//! Each cycle probes every descriptor in list order, keeps the reachable
//! ones without re-sorting, and advances a persisted cursor over them.

mod state;

pub use state::{parse_state, FileStateStore, MemoryStateStore, RotationStateStore, UNINITIALIZED};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{error, info, instrument, warn};

use super::loader::SourceUnavailable;
use super::oracle::ReachabilityOracle;
use crate::models::{DisplayRecord, EndpointDescriptor};

/// Result of one selection cycle
///
/// The four variants are mutually exclusive and each maps to a distinct
/// display record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The descriptor source does not exist or cannot be read
    NoSourceFile,
    /// The source exists but yielded no descriptors
    EmptySource,
    /// Descriptors exist but none passed the oracle
    NoneReachable { candidates: usize },
    /// A descriptor was selected and its index persisted
    Selected {
        descriptor: EndpointDescriptor,
        index: usize,
        reachable: usize,
    },
}

impl SelectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSourceFile => "no_source_file",
            Self::EmptySource => "empty_source",
            Self::NoneReachable { .. } => "none_reachable",
            Self::Selected { .. } => "selected",
        }
    }

    pub fn selected(&self) -> Option<&EndpointDescriptor> {
        match self {
            Self::Selected { descriptor, .. } => Some(descriptor),
            _ => None,
        }
    }

    /// Record to hand to the rendering collaborator
    pub fn display_record(&self, at: DateTime<Local>) -> DisplayRecord {
        match self {
            Self::NoSourceFile => {
                DisplayRecord::placeholder("Node file not found", "nodes.txt not found", at)
            }
            Self::EmptySource => {
                DisplayRecord::placeholder("Please add nodes", "Please add nodes in nodes.txt", at)
            }
            Self::NoneReachable { .. } => {
                DisplayRecord::placeholder("No nodes available", "No nodes available", at)
            }
            Self::Selected { descriptor, .. } => DisplayRecord::for_descriptor(descriptor, at),
        }
    }
}

impl std::fmt::Display for SelectionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cursor following `persisted` in a reachable set of `len` entries
///
/// An uninitialized (negative) cursor starts at 0. `len` must be non-zero.
pub fn next_index(persisted: i64, len: usize) -> usize {
    debug_assert!(len > 0, "next_index over an empty set");
    if persisted < 0 || len == 0 {
        return 0;
    }
    let len = len as u64;
    ((persisted as u64 % len + 1) % len) as usize
}

/// Selects one reachable descriptor per cycle
pub struct RotationSelector {
    oracle: Arc<dyn ReachabilityOracle>,
    state: Arc<dyn RotationStateStore>,
    probe_delay: Duration,
}

impl RotationSelector {
    pub fn new(
        oracle: Arc<dyn ReachabilityOracle>,
        state: Arc<dyn RotationStateStore>,
        probe_delay: Duration,
    ) -> Self {
        Self {
            oracle,
            state,
            probe_delay,
        }
    }

    /// Probe descriptors one at a time, pausing between probes
    ///
    /// Reachable descriptors keep their relative source order.
    pub async fn reachable(&self, descriptors: &[EndpointDescriptor]) -> Vec<EndpointDescriptor> {
        let mut reachable = Vec::new();

        for (i, descriptor) in descriptors.iter().enumerate() {
            if i > 0 && !self.probe_delay.is_zero() {
                tokio::time::sleep(self.probe_delay).await;
            }

            if self.oracle.probe(descriptor.host(), descriptor.port()).await {
                reachable.push(descriptor.clone());
            }
        }

        reachable
    }

    /// Pick the next reachable descriptor and persist its index
    ///
    /// The cursor is untouched when nothing is reachable.
    #[instrument(skip_all, fields(candidates = descriptors.len()))]
    pub async fn select_next(&self, descriptors: &[EndpointDescriptor]) -> SelectionOutcome {
        if descriptors.is_empty() {
            return SelectionOutcome::EmptySource;
        }

        let mut reachable = self.reachable(descriptors).await;
        if reachable.is_empty() {
            warn!("None of {} descriptors are reachable", descriptors.len());
            return SelectionOutcome::NoneReachable {
                candidates: descriptors.len(),
            };
        }

        let persisted = self.state.read().await;
        let index = next_index(persisted, reachable.len());

        if let Err(e) = self.state.write(index).await {
            error!("Failed to persist rotation index {}: {}", index, e);
        }

        let total = reachable.len();
        let descriptor = reachable.swap_remove(index);
        info!(
            "{} of {} descriptors reachable, selected #{}: {} ({})",
            total,
            descriptors.len(),
            index + 1,
            descriptor.label(),
            descriptor.host()
        );

        SelectionOutcome::Selected {
            descriptor,
            index,
            reachable: total,
        }
    }

    /// Map a loader result to a cycle outcome
    pub async fn run_cycle(
        &self,
        source: Result<Vec<EndpointDescriptor>, SourceUnavailable>,
    ) -> SelectionOutcome {
        match source {
            Ok(descriptors) => self.select_next(&descriptors).await,
            Err(e) => {
                warn!("{}", e);
                SelectionOutcome::NoSourceFile
            }
        }
    }
}
