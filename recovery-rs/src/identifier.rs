//! Entry identifier codec
//!
//! Exchange entry ids are 46-byte blobs. Bytes 22..44 hold the store GUID
//! followed by the global counter, which is what "last active parent folder"
//! references on deleted items carry. Reducing a folder entry id to that
//! slice gives a key both sides can be compared on.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{RecoveryError, Result};

/// Length of a folder entry id blob
pub const ENTRY_ID_LEN: usize = 46;

const SHORT_ID_START: usize = 22;
const SHORT_ID_END: usize = 44;

/// Derive the short folder id from a base64 entry id
pub fn short_folder_id(entry_id: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(entry_id.trim())
        .map_err(|e| RecoveryError::InvalidIdentifier(format!("{}: {}", entry_id, e)))?;

    if bytes.len() != ENTRY_ID_LEN {
        return Err(RecoveryError::InvalidIdentifier(format!(
            "expected {} bytes, got {}",
            ENTRY_ID_LEN,
            bytes.len()
        )));
    }

    Ok(STANDARD.encode(&bytes[SHORT_ID_START..SHORT_ID_END]))
}

/// Normalize an item's last-active-folder value into the short id space.
///
/// A full entry id is reduced with [`short_folder_id`]; anything else is
/// assumed to already be in short form and returned unchanged.
pub fn folder_reference(value: &str) -> String {
    match STANDARD.decode(value.trim()) {
        Ok(bytes) if bytes.len() == ENTRY_ID_LEN => {
            STANDARD.encode(&bytes[SHORT_ID_START..SHORT_ID_END])
        }
        _ => value.to_string(),
    }
}
