//! Item discovery and transfer engine

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::types::{Classification, CopierSummary, RunState, StatusCallback};
use crate::error::RecoveryError;
use crate::hierarchy::FolderHierarchy;
use crate::identifier;
use crate::transport::{DiscoveredItem, ExchangeTransport, FindItemsPage, DOCUMENT_ITEM_CLASS};

/// Default page and copy batch size
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default number of retries for a failing discovery page
pub const DEFAULT_MAX_DISCOVERY_RETRIES: u32 = 3;

/// Decide whether a discovered item should be recovered
pub fn classify(item: &DiscoveredItem, hierarchy: &FolderHierarchy) -> Classification {
    if item.item_class == DOCUMENT_ITEM_CLASS {
        return Classification::Document;
    }

    let reference = identifier::folder_reference(&item.last_active_folder_id);
    let folder = Some(reference.as_str());

    if !hierarchy.is_from_ipm_subtree(folder) {
        Classification::OutsideIpmSubtree
    } else if hierarchy.is_contacts_subfolder(folder) {
        Classification::ContactsSubfolder
    } else {
        Classification::Eligible
    }
}

/// Copies eligible items from a source folder to a target folder.
///
/// Each call to [`ItemCopier::process`] does at most one discovery request
/// and one copy request. Callers loop until it returns `true`.
pub struct ItemCopier {
    transport: Arc<dyn ExchangeTransport>,
    hierarchy: Arc<FolderHierarchy>,
    report_status: StatusCallback,
    source_folder_id: String,
    target_folder_id: String,
    batch_size: usize,
    max_discovery_retries: u32,
    state: RunState,
}

impl ItemCopier {
    pub fn new(
        transport: Arc<dyn ExchangeTransport>,
        hierarchy: Arc<FolderHierarchy>,
        report_status: StatusCallback,
        source_folder_id: impl Into<String>,
        target_folder_id: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            transport,
            hierarchy,
            report_status,
            source_folder_id: source_folder_id.into(),
            target_folder_id: target_folder_id.into(),
            batch_size: batch_size.max(1),
            max_discovery_retries: DEFAULT_MAX_DISCOVERY_RETRIES,
            state: RunState::default(),
        }
    }

    /// Set how many consecutive discovery failures are retried
    pub fn with_max_discovery_retries(mut self, retries: u32) -> Self {
        self.max_discovery_retries = retries;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn summary(&self) -> CopierSummary {
        CopierSummary::from(&self.state)
    }

    /// Run one discovery pass and at most one copy pass.
    ///
    /// Returns `true` once discovery is finished and nothing is left to copy.
    pub async fn process(&mut self) -> bool {
        self.state.passes += 1;

        if !self.state.discovery_finished() {
            self.discovery_pass().await;
        }

        if self.state.discovery_finished() && !self.state.has_work() {
            return true;
        }

        if !self.state.has_work() {
            return false;
        }

        self.copy_pass().await;
        self.report("Pass completed");

        false
    }

    fn report(&self, status: &str) {
        info!("{}", status);
        (self.report_status)(status);
    }

    async fn discovery_pass(&mut self) {
        self.report("Discovering Items");

        let result = self
            .transport
            .find_items(
                &self.source_folder_id,
                self.batch_size,
                self.state.discovery_offset,
            )
            .await;

        match result {
            Ok(page) => {
                self.report("Processing Items");
                self.process_page(page);
            }
            Err(e) => self.record_discovery_error(e),
        }
    }

    fn process_page(&mut self, page: FindItemsPage) {
        let found = page.items.len();
        let mut queued = 0;

        for item in page.items {
            let classification = classify(&item, &self.hierarchy);
            if classification == Classification::Eligible {
                self.state.pending_item_ids.push_back(item.item_id);
                queued += 1;
            } else {
                debug!("Skipping {} ({})", item.item_id, classification);
                self.state.record_skip(classification);
            }
        }

        debug!(
            "Discovery at offset {}: {} found, {} queued, next offset {}",
            self.state.discovery_offset, found, queued, page.next_offset
        );

        if !page.is_last_page && page.next_offset <= self.state.discovery_offset {
            let message = RecoveryError::Discovery(format!(
                "paging cursor stalled at offset {}",
                self.state.discovery_offset
            ))
            .to_string();
            error!("{}, stopping discovery", message);
            self.state.discovery_error = Some(message.clone());
            self.state.discovery_abandoned = true;
            self.report(&format!("Discovery abandoned: {}", message));
            return;
        }

        self.state.discovery_offset = page.next_offset;
        self.state.discovery_failures = 0;
        self.state.discovery_error = None;

        if page.is_last_page {
            info!(
                "Discovery complete at offset {}",
                self.state.discovery_offset
            );
            self.state.discovery_complete = true;
        }
    }

    fn record_discovery_error(&mut self, error: RecoveryError) {
        let message = error.to_string();
        self.state.discovery_failures += 1;
        self.state.discovery_error = Some(message.clone());

        if self.state.discovery_failures > self.max_discovery_retries {
            error!(
                "Giving up on discovery at offset {} after {} failures: {}",
                self.state.discovery_offset, self.state.discovery_failures, message
            );
            self.state.discovery_abandoned = true;
            self.report(&format!("Discovery abandoned: {}", message));
        } else {
            warn!(
                "Discovery failed at offset {} (attempt {}): {}",
                self.state.discovery_offset, self.state.discovery_failures, message
            );
            self.report(&format!("Discovery error: {}", message));
        }
    }

    /// Retry split batches first, then take fresh ids from the queue
    fn next_batch(&mut self) -> Vec<String> {
        if let Some(batch) = self.state.bad_batches.pop_front() {
            return batch;
        }

        let count = self.batch_size.min(self.state.pending_item_ids.len());
        self.state.pending_item_ids.drain(..count).collect()
    }

    async fn copy_pass(&mut self) {
        let batch = self.next_batch();
        if batch.is_empty() {
            return;
        }

        self.report(&format!("Copying {} Items", batch.len()));

        match self
            .transport
            .copy_items(&batch, &self.target_folder_id)
            .await
        {
            Ok(response) if response.is_success() => {
                self.state.copied += batch.len();
                self.report("Copy pass complete");
            }
            Ok(response) => {
                let error = RecoveryError::Copy(format!(
                    "{}: {}",
                    response.response_class, response.response_code
                ));
                self.handle_copy_error(batch, &response.copied_item_ids, error);
            }
            Err(e) => self.handle_copy_error(batch, &[], e),
        }
    }

    fn handle_copy_error(&mut self, batch: Vec<String>, confirmed: &[String], error: RecoveryError) {
        let attempted = batch.len();
        let (copied, mut remaining): (Vec<String>, Vec<String>) =
            batch.into_iter().partition(|id| confirmed.contains(id));
        self.state.copied += copied.len();

        warn!(
            "Copy of {} items failed ({} confirmed copied): {}",
            attempted,
            copied.len(),
            error
        );

        match remaining.len() {
            0 => {}
            1 => {
                let item_id = remaining.remove(0);
                error!("Item {} could not be copied: {}", item_id, error);
                self.report(&format!("Unable to copy item {}", item_id));
                self.state.bad_items.push(item_id);
            }
            len => {
                let second = remaining.split_off(len / 2);
                self.report(&format!(
                    "Copy failed, retrying as batches of {} and {}",
                    remaining.len(),
                    second.len()
                ));
                self.state.bad_batches.push_back(remaining);
                self.state.bad_batches.push_back(second);
            }
        }
    }
}
