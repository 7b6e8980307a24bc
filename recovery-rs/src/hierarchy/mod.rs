//! Mailbox folder hierarchy
//!
//! Walks every folder reachable from the mailbox root once per run and
//! answers the two classification questions the copier asks about an
//! item's last active folder.

pub mod index;
pub mod types;

pub use index::FolderHierarchy;
pub use types::*;
