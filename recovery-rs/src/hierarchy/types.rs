//! Folder types

use serde::{Deserialize, Serialize};

/// Well-known name of the top of the IPM subtree
pub const MSG_FOLDER_ROOT: &str = "msgfolderroot";

/// Well-known name of the Contacts folder
pub const CONTACTS: &str = "contacts";

/// Well-known name of the mailbox root
pub const ROOT: &str = "root";

/// Separator some backends emit inside folder paths instead of `/`
pub const PRIVATE_PATH_SEPARATOR: char = '\u{FFFE}';

/// A mailbox folder as reported by a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Backend-specific primary key
    pub folder_id: String,
    /// Base64 entry id blob
    pub entry_id: String,
    /// Comparison key derived from `entry_id`
    pub short_folder_id: String,
    /// Slash-delimited display path
    pub folder_path: String,
    /// Well-known name, if this is a distinguished folder
    pub distinguished_folder_id: Option<String>,
    /// Number of direct child folders
    pub child_folder_count: usize,
}

/// Rewrite private-use path separators to `/`
pub fn normalize_folder_path(path: &str) -> String {
    path.replace(PRIVATE_PATH_SEPARATOR, "/")
}
