//! OData payloads

use serde::{Deserialize, Serialize};

/// Extended property ids requested alongside messages and folders
pub mod props {
    pub const ENTRY_ID: &str = "Binary 0xfff";
    pub const FOLDER_PATH_FULL_NAME: &str = "String 0x6874";
    pub const MESSAGE_CLASS: &str = "String 0x1a";
    pub const LAST_ACTIVE_PARENT_FOLDER_ID: &str = "Binary 0x348a";
}

/// Collection response
#[derive(Debug, Clone, Deserialize)]
pub struct ODataCollection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ExtendedProperty {
    pub property_id: String,
    #[serde(default)]
    pub value: String,
}

fn find_property<'a>(properties: &'a [ExtendedProperty], id: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|p| p.property_id.eq_ignore_ascii_case(id))
        .map(|p| p.value.as_str())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RestMessage {
    #[serde(rename = "@odata.type", default)]
    pub odata_type: Option<String>,
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub single_value_extended_properties: Vec<ExtendedProperty>,
}

impl RestMessage {
    pub fn property(&self, id: &str) -> Option<&str> {
        find_property(&self.single_value_extended_properties, id)
    }

    /// Entity type name, e.g. `Message` for `#Microsoft.OutlookServices.Message`
    pub fn item_type(&self) -> String {
        self.odata_type
            .as_deref()
            .and_then(|t| t.rsplit('.').next())
            .filter(|t| !t.is_empty())
            .unwrap_or("Message")
            .to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RestFolder {
    pub id: String,
    #[serde(default)]
    pub well_known_name: Option<String>,
    #[serde(default)]
    pub child_folder_count: usize,
    #[serde(default)]
    pub single_value_extended_properties: Vec<ExtendedProperty>,
}

impl RestFolder {
    pub fn property(&self, id: &str) -> Option<&str> {
        find_property(&self.single_value_extended_properties, id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateFolderBody<'a> {
    pub display_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CopyMessageBody<'a> {
    pub destination_id: &'a str,
}

/// `$expand` clause selecting the given extended properties
pub fn expand_properties(ids: &[&str]) -> String {
    let filter = ids
        .iter()
        .map(|id| format!("PropertyId eq '{}'", id))
        .collect::<Vec<_>>()
        .join(" or ");
    format!("SingleValueExtendedProperties($filter={})", filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_messages() {
        let json = r##"{
            "@odata.context": "https://outlook.office.com/api/v2.0/$metadata#Me/MailFolders('x')/Messages",
            "value": [
                {
                    "@odata.type": "#Microsoft.OutlookServices.EventMessage",
                    "Id": "m1",
                    "Subject": "Hello",
                    "SingleValueExtendedProperties": [
                        {"PropertyId": "String 0x1a", "Value": "IPM.Schedule.Meeting.Request"},
                        {"PropertyId": "Binary 0x348a", "Value": "c2hvcnQ="}
                    ]
                },
                {"Id": "m2"}
            ]
        }"##;

        let page: ODataCollection<RestMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 2);

        let first = &page.value[0];
        assert_eq!(first.property(props::MESSAGE_CLASS), Some("IPM.Schedule.Meeting.Request"));
        assert_eq!(first.property(props::LAST_ACTIVE_PARENT_FOLDER_ID), Some("c2hvcnQ="));
        assert_eq!(first.item_type(), "EventMessage");

        let second = &page.value[1];
        assert_eq!(second.property(props::MESSAGE_CLASS), None);
        assert_eq!(second.item_type(), "Message");
    }

    #[test]
    fn test_property_ids_ignore_case() {
        let folder: RestFolder = serde_json::from_str(
            r#"{"Id": "f", "SingleValueExtendedProperties": [{"PropertyId": "Binary 0xFFF", "Value": "AA=="}]}"#,
        )
        .unwrap();
        assert_eq!(folder.property(props::ENTRY_ID), Some("AA=="));
        assert_eq!(folder.child_folder_count, 0);
        assert!(folder.well_known_name.is_none());
    }

    #[test]
    fn test_expand_clause() {
        assert_eq!(
            expand_properties(&[props::MESSAGE_CLASS, props::LAST_ACTIVE_PARENT_FOLDER_ID]),
            "SingleValueExtendedProperties($filter=PropertyId eq 'String 0x1a' or PropertyId eq 'Binary 0x348a')"
        );
    }

    #[test]
    fn test_request_bodies() {
        let body = serde_json::to_string(&CopyMessageBody { destination_id: "t" }).unwrap();
        assert_eq!(body, r#"{"DestinationId":"t"}"#);
        let body = serde_json::to_string(&CreateFolderBody { display_name: "R" }).unwrap();
        assert_eq!(body, r#"{"DisplayName":"R"}"#);
    }
}
