//! SOAP request envelopes

use quick_xml::escape::escape;

use crate::transport::Traversal;

pub const MESSAGES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
pub const TYPES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/types";
pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const EXCHANGE_VERSION: &str = "Exchange2013_SP1";

/// Folder class given to folders created by the recovery run
pub const MAIL_FOLDER_CLASS: &str = "IPF.Note";

/// Well-known folder names understood by the server
const DISTINGUISHED_FOLDER_NAMES: &[&str] = &[
    "root",
    "msgfolderroot",
    "inbox",
    "outbox",
    "drafts",
    "sentitems",
    "deleteditems",
    "junkemail",
    "contacts",
    "calendar",
    "tasks",
    "notes",
    "journal",
    "searchfolders",
    "conversationhistory",
    "syncissues",
    "conflicts",
    "localfailures",
    "serverfailures",
    "archiveroot",
    "archivemsgfolderroot",
    "archivedeleteditems",
    "recoverableitemsroot",
    "recoverableitemsdeletions",
    "recoverableitemsversions",
    "recoverableitemspurges",
    "archiverecoverableitemsroot",
    "archiverecoverableitemsdeletions",
];

pub fn is_distinguished(folder_id: &str) -> bool {
    DISTINGUISHED_FOLDER_NAMES.contains(&folder_id)
}

/// `DistinguishedFolderId` for well-known names, `FolderId` otherwise
fn folder_ref(folder_id: &str) -> String {
    if is_distinguished(folder_id) {
        format!(r#"<t:DistinguishedFolderId Id="{}"/>"#, escape(folder_id))
    } else {
        format!(r#"<t:FolderId Id="{}"/>"#, escape(folder_id))
    }
}

fn envelope(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:m="{m}" xmlns:t="{t}" xmlns:soap="{soap}">"#,
            r#"<soap:Header><t:RequestServerVersion Version="{version}" /></soap:Header>"#,
            "<soap:Body>{body}</soap:Body>",
            "</soap:Envelope>"
        ),
        m = MESSAGES_NS,
        t = TYPES_NS,
        soap = SOAP_NS,
        version = EXCHANGE_VERSION,
        body = body
    )
}

pub fn find_item(folder_id: &str, max_entries: usize, offset: usize) -> String {
    envelope(&format!(
        concat!(
            r#"<m:FindItem Traversal="Shallow">"#,
            "<m:ItemShape>",
            "<t:BaseShape>IdOnly</t:BaseShape>",
            "<t:AdditionalProperties>",
            r#"<t:ExtendedFieldURI PropertyTag="0x348a" PropertyType="Binary" />"#,
            r#"<t:FieldURI FieldURI="item:ItemClass" />"#,
            "</t:AdditionalProperties>",
            "</m:ItemShape>",
            r#"<m:IndexedPageItemView MaxEntriesReturned="{max}" Offset="{offset}" BasePoint="Beginning" />"#,
            "<m:ParentFolderIds>{parent}</m:ParentFolderIds>",
            "</m:FindItem>"
        ),
        max = max_entries,
        offset = offset,
        parent = folder_ref(folder_id)
    ))
}

pub fn create_folder(parent_folder_id: &str, display_name: &str) -> String {
    envelope(&format!(
        concat!(
            "<m:CreateFolder>",
            "<m:ParentFolderId>{parent}</m:ParentFolderId>",
            "<m:Folders>",
            "<t:Folder>",
            "<t:FolderClass>{class}</t:FolderClass>",
            "<t:DisplayName>{name}</t:DisplayName>",
            "</t:Folder>",
            "</m:Folders>",
            "</m:CreateFolder>"
        ),
        parent = folder_ref(parent_folder_id),
        class = MAIL_FOLDER_CLASS,
        name = escape(display_name)
    ))
}

pub fn copy_item(item_ids: &[String], target_folder_id: &str) -> String {
    let ids: String = item_ids
        .iter()
        .map(|id| format!(r#"<t:ItemId Id="{}" />"#, escape(id.as_str())))
        .collect();

    envelope(&format!(
        concat!(
            "<m:CopyItem>",
            "<m:ToFolderId>{target}</m:ToFolderId>",
            "<m:ItemIds>{ids}</m:ItemIds>",
            "<m:ReturnNewItemIds>true</m:ReturnNewItemIds>",
            "</m:CopyItem>"
        ),
        target = folder_ref(target_folder_id),
        ids = ids
    ))
}

pub fn find_folder(
    parent_folder_id: &str,
    traversal: Traversal,
    max_entries: usize,
    offset: usize,
) -> String {
    envelope(&format!(
        concat!(
            r#"<m:FindFolder Traversal="{traversal}">"#,
            "<m:FolderShape>",
            "<t:BaseShape>IdOnly</t:BaseShape>",
            "<t:AdditionalProperties>",
            r#"<t:FieldURI FieldURI="folder:DistinguishedFolderId" />"#,
            r#"<t:FieldURI FieldURI="folder:ChildFolderCount" />"#,
            r#"<t:ExtendedFieldURI PropertyTag="0x6874" PropertyType="String" />"#,
            r#"<t:ExtendedFieldURI PropertyTag="0x0FFF" PropertyType="Binary" />"#,
            "</t:AdditionalProperties>",
            "</m:FolderShape>",
            r#"<m:IndexedPageFolderView MaxEntriesReturned="{max}" Offset="{offset}" BasePoint="Beginning" />"#,
            "<m:ParentFolderIds>{parent}</m:ParentFolderIds>",
            "</m:FindFolder>"
        ),
        traversal = traversal,
        max = max_entries,
        offset = offset,
        parent = folder_ref(parent_folder_id)
    ))
}
