//! Recovery run driver
//!
//! Loads the folder hierarchy, creates the target folder and drives an
//! [`ItemCopier`] until the source folder is drained.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RecoverySettings;
use crate::copier::{silent, ItemCopier, StatusCallback};
use crate::error::Result;
use crate::hierarchy::FolderHierarchy;
use crate::transport::ExchangeTransport;

/// Outcome of a recovery run
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub target_folder_id: String,
    pub target_folder_name: String,
    pub copied: usize,
    pub bad_items: Vec<String>,
    /// Last discovery failure when discovery was abandoned
    pub discovery_error: Option<String>,
    pub skipped_documents: usize,
    pub skipped_outside_ipm: usize,
    pub skipped_contacts: usize,
    pub passes: usize,
}

impl RecoveryReport {
    /// Whether every discovered item made it across
    pub fn is_complete(&self) -> bool {
        self.bad_items.is_empty() && self.discovery_error.is_none()
    }
}

pub struct RecoveryJob {
    transport: Arc<dyn ExchangeTransport>,
    settings: RecoverySettings,
    folder_page_size: usize,
    report_status: StatusCallback,
}

impl RecoveryJob {
    pub fn new(
        transport: Arc<dyn ExchangeTransport>,
        settings: RecoverySettings,
        folder_page_size: usize,
    ) -> Self {
        Self {
            transport,
            settings,
            folder_page_size,
            report_status: silent(),
        }
    }

    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.report_status = callback;
        self
    }

    fn report(&self, status: &str) {
        info!("{}", status);
        (self.report_status)(status);
    }

    pub async fn load_hierarchy(&self) -> Result<FolderHierarchy> {
        self.report("Loading folder hierarchy");
        let hierarchy =
            FolderHierarchy::initialize(self.transport.as_ref(), self.folder_page_size).await?;
        self.report("Initialization complete");
        Ok(hierarchy)
    }

    pub async fn run(&self, hierarchy: FolderHierarchy) -> Result<RecoveryReport> {
        let folder_name = self.settings.folder_name_or_default();

        self.report("Creating target folder");
        let target_folder_id = self
            .transport
            .create_folder(&self.settings.target_parent, &folder_name)
            .await?;
        self.report("Folder created");
        info!("Recovering into '{}' ({})", folder_name, target_folder_id);

        let mut copier = ItemCopier::new(
            self.transport.clone(),
            Arc::new(hierarchy),
            self.report_status.clone(),
            self.settings.source_folder.clone(),
            target_folder_id.clone(),
            self.settings.batch_size,
        )
        .with_max_discovery_retries(self.settings.max_discovery_retries);

        while !copier.process().await {}

        let summary = copier.summary();
        if !summary.bad_items.is_empty() {
            warn!("{} items could not be copied", summary.bad_items.len());
        }
        self.report("Recovery completed");

        Ok(RecoveryReport {
            target_folder_id,
            target_folder_name: folder_name,
            copied: summary.copied,
            bad_items: summary.bad_items,
            discovery_error: summary.discovery_error,
            skipped_documents: summary.skipped_documents,
            skipped_outside_ipm: summary.skipped_outside_ipm,
            skipped_contacts: summary.skipped_contacts,
            passes: summary.passes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{MSG_FOLDER_ROOT, ROOT};
    use crate::transport::mock::MockTransport;
    use std::sync::Mutex;

    fn settings(source: &str) -> RecoverySettings {
        RecoverySettings {
            source_folder: source.to_string(),
            folder_name: Some("Recovered".to_string()),
            batch_size: 10,
            ..RecoverySettings::default()
        }
    }

    #[tokio::test]
    async fn test_run_copies_into_new_folder() {
        let mock = Arc::new(MockTransport::new());
        let ipm = mock.add_folder(ROOT, "Top", Some(MSG_FOLDER_ROOT)).await;
        let inbox = mock.add_folder(&ipm.folder_id, "Inbox", None).await;
        let source = mock.add_folder(ROOT, "Deletions", None).await;
        for _ in 0..3 {
            mock.add_item(&source.folder_id, "IPM.Note", &inbox.short_folder_id).await;
        }
        mock.add_item(&source.folder_id, "IPM.File.Document", "").await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let job = RecoveryJob::new(mock.clone(), settings(&source.folder_id), 50)
            .with_status_callback(Arc::new(move |s: &str| sink.lock().unwrap().push(s.to_string())));

        let hierarchy = job.load_hierarchy().await.unwrap();
        assert_eq!(hierarchy.len(), 3);

        let report = job.run(hierarchy).await.unwrap();
        assert_eq!(report.copied, 3);
        assert_eq!(report.skipped_documents, 1);
        assert_eq!(report.target_folder_name, "Recovered");
        assert!(report.is_complete());

        let copies = mock.copy_requests().await;
        assert!(copies.iter().all(|c| c.target_folder_id == report.target_folder_id));

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.first().map(String::as_str), Some("Loading folder hierarchy"));
        assert!(seen.contains(&"Folder created".to_string()));
        assert_eq!(seen.last().map(String::as_str), Some("Recovery completed"));
    }

    #[tokio::test]
    async fn test_abandoned_discovery_is_reported() {
        let mock = Arc::new(MockTransport::new());
        let source = mock.add_folder(ROOT, "Deletions", None).await;
        mock.fail_find_items(100).await;

        let mut settings = settings(&source.folder_id);
        settings.max_discovery_retries = 2;
        let job = RecoveryJob::new(mock.clone(), settings, 50);

        let report = job.run(FolderHierarchy::default()).await.unwrap();
        assert!(report.discovery_error.is_some());
        assert!(!report.is_complete());
        assert_eq!(mock.find_item_requests().await.len(), 3);
    }
}
