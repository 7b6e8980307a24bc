//! Copier run state and reporting types

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Status callback fired as the copier makes progress
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A status callback that discards everything
pub fn silent() -> StatusCallback {
    Arc::new(|_| {})
}

/// Why a discovered item was kept or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    /// Queued for copy
    Eligible,
    /// `IPM.File.Document` items are never recovered
    Document,
    /// Last active folder is outside the message folder root
    OutsideIpmSubtree,
    /// Last active folder is below Contacts
    ContactsSubfolder,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Eligible => write!(f, "eligible"),
            Classification::Document => write!(f, "document"),
            Classification::OutsideIpmSubtree => write!(f, "outside_ipm_subtree"),
            Classification::ContactsSubfolder => write!(f, "contacts_subfolder"),
        }
    }
}

/// Mutable state of one migration run.
///
/// Every discovered id lives in exactly one of `pending_item_ids`, the
/// in-flight batch, `bad_batches`, `bad_items`, or the copied count.
#[derive(Debug, Default)]
pub struct RunState {
    pub pending_item_ids: VecDeque<String>,
    pub discovery_offset: usize,
    pub discovery_complete: bool,
    pub discovery_error: Option<String>,
    /// Consecutive failures at the current offset
    pub discovery_failures: u32,
    /// Set once retries are exhausted
    pub discovery_abandoned: bool,
    pub bad_batches: VecDeque<Vec<String>>,
    pub bad_items: Vec<String>,
    pub copied: usize,
    pub skipped_documents: usize,
    pub skipped_outside_ipm: usize,
    pub skipped_contacts: usize,
    pub passes: usize,
}

impl RunState {
    /// Whether discovery will not request any more pages
    pub fn discovery_finished(&self) -> bool {
        self.discovery_complete || self.discovery_abandoned
    }

    /// Whether any id is still waiting for a copy attempt
    pub fn has_work(&self) -> bool {
        !self.pending_item_ids.is_empty() || !self.bad_batches.is_empty()
    }

    pub(crate) fn record_skip(&mut self, classification: Classification) {
        match classification {
            Classification::Eligible => {}
            Classification::Document => self.skipped_documents += 1,
            Classification::OutsideIpmSubtree => self.skipped_outside_ipm += 1,
            Classification::ContactsSubfolder => self.skipped_contacts += 1,
        }
    }
}

/// Snapshot of a copier's progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopierSummary {
    pub copied: usize,
    pub pending: usize,
    pub bad_batches: usize,
    pub bad_items: Vec<String>,
    pub discovery_complete: bool,
    pub discovery_error: Option<String>,
    pub skipped_documents: usize,
    pub skipped_outside_ipm: usize,
    pub skipped_contacts: usize,
    pub passes: usize,
}

impl From<&RunState> for CopierSummary {
    fn from(state: &RunState) -> Self {
        Self {
            copied: state.copied,
            pending: state.pending_item_ids.len(),
            bad_batches: state.bad_batches.len(),
            bad_items: state.bad_items.clone(),
            discovery_complete: state.discovery_complete,
            discovery_error: state.discovery_error.clone(),
            skipped_documents: state.skipped_documents,
            skipped_outside_ipm: state.skipped_outside_ipm,
            skipped_contacts: state.skipped_contacts,
            passes: state.passes,
        }
    }
}
