//! SOAP response parsing

use tracing::warn;

use super::templates::{MESSAGES_NS, TYPES_NS};
use super::xml::{self, Element};
use crate::error::{RecoveryError, Result};
use crate::hierarchy::{normalize_folder_path, Folder};
use crate::identifier;
use crate::transport::{
    CopyItemsResponse, DiscoveredItem, FindFoldersPage, FindItemsPage, ResponseClass,
};

const LAST_ACTIVE_FOLDER_TAG: u32 = 0x348a;
const FOLDER_PATH_TAG: u32 = 0x6874;
const ENTRY_ID_TAG: u32 = 0x0fff;

/// Class and code of a `*ResponseMessage` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStatus {
    pub class: ResponseClass,
    pub code: String,
}

impl ResponseStatus {
    fn read(message: &Element) -> Result<Self> {
        Ok(Self {
            class: ResponseClass::parse(message.attr("ResponseClass").unwrap_or_default()),
            code: message.single(MESSAGES_NS, "ResponseCode")?.text(),
        })
    }
}

/// Paging attributes of a `RootFolder` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Paging {
    offset: usize,
    includes_last: bool,
}

impl Paging {
    fn read(root_folder: &Element) -> Self {
        let number = |name: &str| {
            root_folder
                .attr(name)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0)
        };

        Self {
            offset: number("IndexedPagingOffset"),
            includes_last: root_folder.attr("IncludesLastItemInRange") == Some("true"),
        }
    }
}

/// Parse a property tag such as `0x0FFF` or `0xfff`
fn property_tag(value: &str) -> Option<u32> {
    let value = value.trim();
    let hex = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u32::from_str_radix(hex, 16).ok()
}

/// Extended property values of an element, keyed by numeric tag
fn extended_properties(element: &Element) -> Result<Vec<(u32, String)>> {
    let mut properties = Vec::new();
    for property in element.descendants_named(TYPES_NS, "ExtendedProperty") {
        let uri = property.single(TYPES_NS, "ExtendedFieldURI")?;
        let value = property.single(TYPES_NS, "Value")?;
        if let Some(tag) = uri.attr("PropertyTag").and_then(property_tag) {
            properties.push((tag, value.text()));
        }
    }
    Ok(properties)
}

fn parse_document(response: &str) -> Result<Element> {
    xml::parse(&xml::normalize_separators(response))
}

/// Status of a FindItem response, plus the parsed page
pub fn parse_find_item(response: &str) -> Result<(ResponseStatus, FindItemsPage)> {
    let doc = parse_document(response)?;
    let message = doc.single(MESSAGES_NS, "FindItemResponseMessage")?;
    let status = ResponseStatus::read(message)?;
    if !status.class.is_success() {
        return Ok((status, FindItemsPage::default()));
    }

    let root_folder = message.single(MESSAGES_NS, "RootFolder")?;
    let paging = Paging::read(root_folder);
    let items_element = root_folder.single(TYPES_NS, "Items")?;

    let mut items = Vec::new();
    for element in items_element.child_elements() {
        let item_id = element
            .single(TYPES_NS, "ItemId")?
            .attr("Id")
            .unwrap_or_default()
            .to_string();

        let item_class = element
            .descendants_named(TYPES_NS, "ItemClass")
            .iter()
            .map(|e| e.text())
            .collect::<String>();

        let last_active_folder_id = extended_properties(element)?
            .into_iter()
            .find(|(tag, _)| *tag == LAST_ACTIVE_FOLDER_TAG)
            .map(|(_, value)| value)
            .unwrap_or_default();

        items.push(DiscoveredItem {
            item_id,
            item_class,
            last_active_folder_id,
            item_type: element.name.clone(),
            subject: element.first(TYPES_NS, "Subject").map(|e| e.text()),
        });
    }

    let page = FindItemsPage {
        items,
        next_offset: paging.offset,
        is_last_page: paging.includes_last,
    };

    Ok((status, page))
}

/// Status of a CreateFolder response and the new folder id
pub fn parse_create_folder(response: &str) -> Result<(ResponseStatus, String)> {
    let doc = parse_document(response)?;
    let message = doc.single(MESSAGES_NS, "CreateFolderResponseMessage")?;
    let status = ResponseStatus::read(message)?;
    if !status.class.is_success() {
        return Ok((status, String::new()));
    }

    let folder_id = message
        .single(TYPES_NS, "FolderId")?
        .attr("Id")
        .unwrap_or_default()
        .to_string();

    Ok((status, folder_id))
}

/// Aggregate CopyItem response.
///
/// The server answers with one message per requested id, in request order.
pub fn parse_copy_item(response: &str, requested: &[String]) -> Result<CopyItemsResponse> {
    let doc = parse_document(response)?;
    let messages = doc.descendants_named(MESSAGES_NS, "CopyItemResponseMessage");

    if messages.len() != requested.len() {
        warn!(
            "CopyItem returned {} response messages for {} items",
            messages.len(),
            requested.len()
        );
    }

    let mut result = CopyItemsResponse {
        response_class: ResponseClass::Success,
        response_code: "NoError".to_string(),
        copied_item_ids: Vec::new(),
        new_item_ids: Vec::new(),
    };

    for (index, message) in messages.iter().enumerate() {
        let status = ResponseStatus::read(message)?;
        if status.class.is_success() {
            if let Some(source_id) = requested.get(index) {
                result.copied_item_ids.push(source_id.clone());
            }
            if let Some(new_id) = message
                .first(TYPES_NS, "ItemId")
                .and_then(|e| e.attr("Id"))
                .filter(|id| !id.is_empty())
            {
                result.new_item_ids.push(new_id.to_string());
            }
        } else if result.response_class.is_success() {
            result.response_class = status.class;
            result.response_code = status.code;
        }
    }

    if messages.len() < requested.len() && result.response_class.is_success() {
        result.response_class = ResponseClass::Error;
        result.response_code = "ErrorMissingResponseMessage".to_string();
    }

    Ok(result)
}

/// Status of a FindFolder response, plus the parsed page
pub fn parse_find_folder(response: &str) -> Result<(ResponseStatus, FindFoldersPage)> {
    let doc = parse_document(response)?;
    let message = doc.single(MESSAGES_NS, "FindFolderResponseMessage")?;
    let status = ResponseStatus::read(message)?;
    if !status.class.is_success() {
        return Ok((status, FindFoldersPage::default()));
    }

    let root_folder = message.single(MESSAGES_NS, "RootFolder")?;
    let paging = Paging::read(root_folder);
    let folders_element = root_folder.single(TYPES_NS, "Folders")?;

    let mut folders = Vec::new();
    for element in folders_element.child_elements() {
        let folder_id = element
            .single(TYPES_NS, "FolderId")?
            .attr("Id")
            .unwrap_or_default()
            .to_string();

        let distinguished = element
            .descendants_named(TYPES_NS, "DistinguishedFolderId")
            .iter()
            .map(|e| e.text())
            .collect::<String>();

        let child_folder_count = element
            .first(TYPES_NS, "ChildFolderCount")
            .and_then(|e| e.text().parse::<usize>().ok())
            .unwrap_or(0);

        let mut folder_path = String::new();
        let mut entry_id = String::new();
        for (tag, value) in extended_properties(element)? {
            match tag {
                FOLDER_PATH_TAG => folder_path = value,
                ENTRY_ID_TAG => entry_id = value,
                _ => {}
            }
        }

        let short_folder_id = match identifier::short_folder_id(&entry_id) {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping folder {}: {}", folder_id, e);
                continue;
            }
        };

        folders.push(Folder {
            folder_id,
            entry_id,
            short_folder_id,
            folder_path: normalize_folder_path(&folder_path),
            distinguished_folder_id: (!distinguished.is_empty()).then_some(distinguished),
            child_folder_count,
        });
    }

    let page = FindFoldersPage {
        folders,
        next_offset: paging.offset,
        is_last_page: paging.includes_last,
    };

    Ok((status, page))
}

/// Map a non-success status to an error
pub fn ensure_success(operation: &str, status: &ResponseStatus) -> Result<()> {
    if status.class.is_success() {
        Ok(())
    } else {
        Err(RecoveryError::service(operation, status.code.clone()))
    }
}
