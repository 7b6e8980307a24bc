//! Transport abstraction
//!
//! The engine and the folder index only talk to an [`ExchangeTransport`].
//! Two backends implement it: SOAP/XML ([`ews::EwsTransport`]) and
//! REST/OData ([`rest::RestTransport`]). [`factory::TransportFactory`]
//! picks one from the host's capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::hierarchy::Folder;

pub mod ews;
pub mod factory;
pub mod mock;
pub mod rest;

pub use factory::{TransportFactory, TransportKind};

/// Item class that is never recovered
pub const DOCUMENT_ITEM_CLASS: &str = "IPM.File.Document";

/// Folder traversal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Traversal {
    /// Direct children only
    Shallow,
    /// All descendants
    Deep,
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Traversal::Shallow => write!(f, "Shallow"),
            Traversal::Deep => write!(f, "Deep"),
        }
    }
}

/// Response class reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseClass {
    Success,
    Warning,
    Error,
}

impl ResponseClass {
    /// Parse a `ResponseClass` attribute value
    pub fn parse(value: &str) -> Self {
        match value {
            "Success" => ResponseClass::Success,
            "Warning" => ResponseClass::Warning,
            _ => ResponseClass::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseClass::Success)
    }
}

impl fmt::Display for ResponseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseClass::Success => write!(f, "Success"),
            ResponseClass::Warning => write!(f, "Warning"),
            ResponseClass::Error => write!(f, "Error"),
        }
    }
}

/// An item found in the source folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredItem {
    /// Backend item id
    pub item_id: String,
    /// Content type label, e.g. `IPM.Note`
    pub item_class: String,
    /// Short id of the folder the item lived in before deletion
    pub last_active_folder_id: String,
    /// Backend element/type name (`Message`, `Contact`, ...)
    pub item_type: String,
    pub subject: Option<String>,
}

/// One page of items
#[derive(Debug, Clone, Default)]
pub struct FindItemsPage {
    pub items: Vec<DiscoveredItem>,
    /// Offset to pass on the next call
    pub next_offset: usize,
    /// Whether this page contains the last item in range
    pub is_last_page: bool,
}

/// One page of child folders
#[derive(Debug, Clone, Default)]
pub struct FindFoldersPage {
    pub folders: Vec<Folder>,
    /// Offset to pass on the next call
    pub next_offset: usize,
    /// Whether this page contains the last folder in range
    pub is_last_page: bool,
}

/// Result of a copy request
#[derive(Debug, Clone)]
pub struct CopyItemsResponse {
    /// Aggregate class over every item in the request
    pub response_class: ResponseClass,
    /// First failure code, or `NoError`
    pub response_code: String,
    /// Source ids the backend confirmed as copied
    pub copied_item_ids: Vec<String>,
    /// Ids of the newly created copies
    pub new_item_ids: Vec<String>,
}

impl CopyItemsResponse {
    pub fn is_success(&self) -> bool {
        self.response_class.is_success()
    }
}

/// Mail backend operations used by the recovery engine
#[async_trait::async_trait]
pub trait ExchangeTransport: Send + Sync {
    /// Find one page of items in a folder
    async fn find_items(
        &self,
        folder_id: &str,
        max_entries: usize,
        offset: usize,
    ) -> Result<FindItemsPage>;

    /// Create a folder and return its id
    async fn create_folder(&self, parent_folder_id: &str, display_name: &str) -> Result<String>;

    /// Copy items to a folder
    async fn copy_items(
        &self,
        item_ids: &[String],
        target_folder_id: &str,
    ) -> Result<CopyItemsResponse>;

    /// Find one page of folders below a parent
    async fn find_folders(
        &self,
        parent_folder_id: &str,
        traversal: Traversal,
        max_entries: usize,
        offset: usize,
    ) -> Result<FindFoldersPage>;

    /// Backend name, for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_class_parse() {
        assert_eq!(ResponseClass::parse("Success"), ResponseClass::Success);
        assert_eq!(ResponseClass::parse("Warning"), ResponseClass::Warning);
        assert_eq!(ResponseClass::parse("Error"), ResponseClass::Error);
        assert_eq!(ResponseClass::parse(""), ResponseClass::Error);
    }

    #[test]
    fn test_traversal_display() {
        assert_eq!(Traversal::Shallow.to_string(), "Shallow");
        assert_eq!(Traversal::Deep.to_string(), "Deep");
    }
}
