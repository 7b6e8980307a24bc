//! Folder hierarchy index

use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::types::{Folder, CONTACTS, MSG_FOLDER_ROOT, ROOT};
use crate::error::Result;
use crate::transport::{ExchangeTransport, Traversal};

/// Default number of folders requested per page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Every folder in the mailbox, indexed by short id and well-known name
#[derive(Debug, Clone, Default)]
pub struct FolderHierarchy {
    folders: Vec<Folder>,
    by_short_id: HashMap<String, usize>,
    by_distinguished: HashMap<String, usize>,
}

impl FolderHierarchy {
    /// Walk the mailbox from the root and build the index
    pub async fn initialize(transport: &dyn ExchangeTransport, page_size: usize) -> Result<Self> {
        info!("Loading folder hierarchy via {}", transport.name());

        let mut folders = Vec::new();
        let mut worklist = vec![ROOT.to_string()];

        while let Some(parent_id) = worklist.pop() {
            let children = Self::find_all_children(transport, &parent_id, page_size).await?;

            for child in &children {
                if child.child_folder_count > 0 {
                    worklist.push(child.folder_id.clone());
                }
            }

            folders.extend(children);
        }

        let hierarchy = Self::from_folders(folders);
        info!("Folder hierarchy loaded: {} folders", hierarchy.folders.len());

        Ok(hierarchy)
    }

    /// Page through the direct children of one folder
    async fn find_all_children(
        transport: &dyn ExchangeTransport,
        parent_id: &str,
        page_size: usize,
    ) -> Result<Vec<Folder>> {
        let mut children = Vec::new();
        let mut offset = 0;

        loop {
            let page = transport
                .find_folders(parent_id, Traversal::Shallow, page_size, offset)
                .await?;

            debug!(
                "Folder page under {}: {} folders, last={}",
                parent_id,
                page.folders.len(),
                page.is_last_page
            );

            children.extend(page.folders);

            if page.is_last_page {
                break;
            }

            if page.next_offset <= offset {
                warn!(
                    "Folder paging under {} stalled at offset {}, stopping",
                    parent_id, offset
                );
                break;
            }

            offset = page.next_offset;
        }

        Ok(children)
    }

    /// Index an already loaded folder list
    pub fn from_folders(folders: Vec<Folder>) -> Self {
        let mut by_short_id = HashMap::with_capacity(folders.len());
        let mut by_distinguished = HashMap::new();

        for (position, folder) in folders.iter().enumerate() {
            if by_short_id
                .insert(folder.short_folder_id.clone(), position)
                .is_some()
            {
                warn!(
                    "Duplicate short folder id {} ({})",
                    folder.short_folder_id, folder.folder_path
                );
            }

            if let Some(name) = &folder.distinguished_folder_id {
                by_distinguished.insert(name.clone(), position);
            }
        }

        Self {
            folders,
            by_short_id,
            by_distinguished,
        }
    }

    /// All discovered folders, in discovery order
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    /// Look up a folder by short id
    pub fn by_short_id(&self, short_folder_id: &str) -> Option<&Folder> {
        self.by_short_id
            .get(short_folder_id)
            .map(|&position| &self.folders[position])
    }

    /// Look up a folder by well-known name
    pub fn by_distinguished(&self, name: &str) -> Option<&Folder> {
        self.by_distinguished
            .get(name)
            .map(|&position| &self.folders[position])
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Whether the folder lives under the message folder root.
    ///
    /// Empty and unknown ids are treated as eligible.
    pub fn is_from_ipm_subtree(&self, short_folder_id: Option<&str>) -> bool {
        let folder = match self.known_folder(short_folder_id) {
            Some(folder) => folder,
            None => return true,
        };

        match self.by_distinguished(MSG_FOLDER_ROOT) {
            Some(ipm_root) => folder.folder_path.starts_with(&ipm_root.folder_path),
            None => true,
        }
    }

    /// Whether the folder is a descendant of Contacts (not Contacts itself).
    ///
    /// Empty and unknown ids are not contacts subfolders.
    pub fn is_contacts_subfolder(&self, short_folder_id: Option<&str>) -> bool {
        let folder = match self.known_folder(short_folder_id) {
            Some(folder) => folder,
            None => return false,
        };

        match self.by_distinguished(CONTACTS) {
            Some(contacts) => folder
                .folder_path
                .starts_with(&format!("{}/", contacts.folder_path)),
            None => false,
        }
    }

    fn known_folder(&self, short_folder_id: Option<&str>) -> Option<&Folder> {
        match short_folder_id {
            Some(id) if !id.is_empty() => self.by_short_id(id),
            _ => None,
        }
    }
}
