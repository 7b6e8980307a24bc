//! In-memory mailbox for testing
//!
//! Behaves like a backend with explicit paging: `next_offset` is
//! `offset + returned` and the last page is the one that reaches the end
//! of the folder. Copies of "poison" items fail the whole request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    CopyItemsResponse, DiscoveredItem, ExchangeTransport, FindFoldersPage, FindItemsPage,
    ResponseClass, Traversal,
};
use crate::error::{RecoveryError, Result};
use crate::hierarchy::Folder;
use crate::identifier::{self, ENTRY_ID_LEN};

/// A recorded copy request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub item_ids: Vec<String>,
    pub target_folder_id: String,
}

#[derive(Debug)]
struct MockFolder {
    parent_id: String,
    folder: Folder,
}

#[derive(Debug, Default)]
struct MockMailbox {
    folders: Vec<MockFolder>,
    items: HashMap<String, Vec<DiscoveredItem>>,
    poison_ids: HashSet<String>,
    failing_find_items: usize,
    find_item_requests: Vec<(usize, usize)>,
    copy_requests: Vec<CopyRequest>,
    copied: Vec<String>,
    next_id: usize,
}

impl MockMailbox {
    fn allocate_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    fn resolve(&self, id: &str) -> Option<&MockFolder> {
        self.folders.iter().find(|f| {
            f.folder.folder_id == id || f.folder.distinguished_folder_id.as_deref() == Some(id)
        })
    }

    /// Folder id for a folder id or well-known name
    fn key(&self, id: &str) -> String {
        self.resolve(id)
            .map(|f| f.folder.folder_id.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn children(&self, parent_id: &str) -> Vec<Folder> {
        let parent_key = self.key(parent_id);

        self.folders
            .iter()
            .filter(|f| f.parent_id == parent_key)
            .map(|f| f.folder.clone())
            .collect()
    }

    fn descendants(&self, parent_id: &str) -> Vec<Folder> {
        let mut result = Vec::new();
        let mut queue = vec![parent_id.to_string()];

        while let Some(id) = queue.pop() {
            for child in self.children(&id) {
                queue.push(child.folder_id.clone());
                result.push(child);
            }
        }

        result
    }
}

/// Build a folder entry id whose short-id slice encodes `n`
pub fn mock_entry_id(n: usize) -> String {
    let mut bytes = vec![0u8; ENTRY_ID_LEN];
    bytes[22..30].copy_from_slice(&(n as u64).to_be_bytes());
    bytes[0] = 0xAA;
    STANDARD.encode(bytes)
}

/// In-memory transport implementation for testing
pub struct MockTransport {
    state: Mutex<MockMailbox>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockMailbox::default()),
        }
    }

    /// Add a folder below `parent_id` (a folder id, a well-known name, or `root`)
    pub async fn add_folder(
        &self,
        parent_id: &str,
        display_name: &str,
        distinguished: Option<&str>,
    ) -> Folder {
        let mut state = self.state.lock().await;
        let n = state.allocate_id();

        let (parent_key, parent_path) = match state.resolve(parent_id) {
            Some(parent) => (parent.folder.folder_id.clone(), parent.folder.folder_path.clone()),
            None => (parent_id.to_string(), String::new()),
        };

        let entry_id = mock_entry_id(n);
        let folder = Folder {
            folder_id: format!("folder-{}", n),
            short_folder_id: identifier::short_folder_id(&entry_id)
                .unwrap_or_else(|_| format!("short-{}", n)),
            entry_id,
            folder_path: format!("{}/{}", parent_path, display_name),
            distinguished_folder_id: distinguished.map(|s| s.to_string()),
            child_folder_count: 0,
        };

        if let Some(parent) = state
            .folders
            .iter_mut()
            .find(|f| f.folder.folder_id == parent_key)
        {
            parent.folder.child_folder_count += 1;
        }

        state.folders.push(MockFolder {
            parent_id: parent_key,
            folder: folder.clone(),
        });

        folder
    }

    /// Add an item to a folder and return its id
    pub async fn add_item(&self, folder_id: &str, item_class: &str, last_active_folder_id: &str) -> String {
        let mut state = self.state.lock().await;
        let n = state.allocate_id();
        let item_id = format!("item-{}", n);
        let key = state.key(folder_id);

        state
            .items
            .entry(key)
            .or_default()
            .push(DiscoveredItem {
                item_id: item_id.clone(),
                item_class: item_class.to_string(),
                last_active_folder_id: last_active_folder_id.to_string(),
                item_type: "Message".to_string(),
                subject: Some(format!("Message {}", n)),
            });

        item_id
    }

    /// Make every copy request containing `item_id` fail
    pub async fn poison(&self, item_id: &str) {
        self.state.lock().await.poison_ids.insert(item_id.to_string());
    }

    /// Fail the next `count` item searches
    pub async fn fail_find_items(&self, count: usize) {
        self.state.lock().await.failing_find_items = count;
    }

    /// Recorded `(offset, max_entries)` of every item search
    pub async fn find_item_requests(&self) -> Vec<(usize, usize)> {
        self.state.lock().await.find_item_requests.clone()
    }

    /// Recorded copy requests, in order
    pub async fn copy_requests(&self) -> Vec<CopyRequest> {
        self.state.lock().await.copy_requests.clone()
    }

    /// Source ids copied successfully
    pub async fn copied_ids(&self) -> Vec<String> {
        self.state.lock().await.copied.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn page_bounds(len: usize, max_entries: usize, offset: usize) -> (usize, usize) {
    let start = offset.min(len);
    let end = start.saturating_add(max_entries).min(len);
    (start, end)
}

#[async_trait::async_trait]
impl ExchangeTransport for MockTransport {
    async fn find_items(
        &self,
        folder_id: &str,
        max_entries: usize,
        offset: usize,
    ) -> Result<FindItemsPage> {
        let mut state = self.state.lock().await;
        state.find_item_requests.push((offset, max_entries));

        if state.failing_find_items > 0 {
            state.failing_find_items -= 1;
            return Err(RecoveryError::Discovery("ErrorServerBusy".to_string()));
        }

        let key = state.key(folder_id);
        let items = state.items.get(&key).cloned().unwrap_or_default();
        let (start, end) = page_bounds(items.len(), max_entries, offset);

        debug!("MockTransport: find_items {} [{}..{})", folder_id, start, end);

        Ok(FindItemsPage {
            items: items[start..end].to_vec(),
            next_offset: end,
            is_last_page: end >= items.len(),
        })
    }

    async fn create_folder(&self, parent_folder_id: &str, display_name: &str) -> Result<String> {
        Ok(self.add_folder(parent_folder_id, display_name, None).await.folder_id)
    }

    async fn copy_items(
        &self,
        item_ids: &[String],
        target_folder_id: &str,
    ) -> Result<CopyItemsResponse> {
        let mut state = self.state.lock().await;
        state.copy_requests.push(CopyRequest {
            item_ids: item_ids.to_vec(),
            target_folder_id: target_folder_id.to_string(),
        });

        if item_ids.iter().any(|id| state.poison_ids.contains(id)) {
            return Ok(CopyItemsResponse {
                response_class: ResponseClass::Error,
                response_code: "ErrorItemCorrupt".to_string(),
                copied_item_ids: Vec::new(),
                new_item_ids: Vec::new(),
            });
        }

        state.copied.extend(item_ids.iter().cloned());

        Ok(CopyItemsResponse {
            response_class: ResponseClass::Success,
            response_code: "NoError".to_string(),
            copied_item_ids: item_ids.to_vec(),
            new_item_ids: item_ids.iter().map(|id| format!("copy-of-{}", id)).collect(),
        })
    }

    async fn find_folders(
        &self,
        parent_folder_id: &str,
        traversal: Traversal,
        max_entries: usize,
        offset: usize,
    ) -> Result<FindFoldersPage> {
        let state = self.state.lock().await;
        let folders = match traversal {
            Traversal::Shallow => state.children(parent_folder_id),
            Traversal::Deep => state.descendants(parent_folder_id),
        };
        let (start, end) = page_bounds(folders.len(), max_entries, offset);

        Ok(FindFoldersPage {
            folders: folders[start..end].to_vec(),
            next_offset: end,
            is_last_page: end >= folders.len(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::ROOT;

    #[tokio::test]
    async fn test_mock_paging() {
        let mock = MockTransport::new();
        let folder = mock.add_folder(ROOT, "Deletions", None).await;
        for _ in 0..5 {
            mock.add_item(&folder.folder_id, "IPM.Note", "").await;
        }

        let first = mock.find_items(&folder.folder_id, 3, 0).await.unwrap();
        assert_eq!(first.items.len(), 3);
        assert!(!first.is_last_page);
        assert_eq!(first.next_offset, 3);

        let second = mock.find_items(&folder.folder_id, 3, 3).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.is_last_page);
    }

    #[tokio::test]
    async fn test_mock_deep_traversal() {
        let mock = MockTransport::new();
        let a = mock.add_folder(ROOT, "A", None).await;
        let b = mock.add_folder(&a.folder_id, "B", None).await;
        mock.add_folder(&b.folder_id, "C", None).await;

        let shallow = mock.find_folders(ROOT, Traversal::Shallow, 10, 0).await.unwrap();
        assert_eq!(shallow.folders.len(), 1);
        assert_eq!(shallow.folders[0].child_folder_count, 1);

        let deep = mock.find_folders(ROOT, Traversal::Deep, 10, 0).await.unwrap();
        assert_eq!(deep.folders.len(), 3);
    }

    #[tokio::test]
    async fn test_mock_poisoned_copy_fails_whole_request() {
        let mock = MockTransport::new();
        let ids = vec!["a".to_string(), "b".to_string()];
        mock.poison("b").await;

        let response = mock.copy_items(&ids, "target").await.unwrap();
        assert!(!response.is_success());
        assert!(mock.copied_ids().await.is_empty());
        assert_eq!(mock.copy_requests().await.len(), 1);
    }
}
