//! SOAP/XML transport
//!
//! Builds request envelopes, sends them through the host's SOAP channel and
//! parses the namespaced responses.

pub mod parser;
pub mod templates;
pub mod xml;

use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    CopyItemsResponse, ExchangeTransport, FindFoldersPage, FindItemsPage, Traversal,
};
use crate::error::{RecoveryError, Result};
use crate::host::MailboxHost;

/// Transport speaking SOAP through a [`MailboxHost`]
pub struct EwsTransport {
    host: Arc<dyn MailboxHost>,
}

impl EwsTransport {
    pub fn new(host: Arc<dyn MailboxHost>) -> Self {
        Self { host }
    }

    async fn send(&self, operation: &str, envelope: String) -> Result<String> {
        debug!("EWS {} request ({} bytes)", operation, envelope.len());
        self.host.make_ews_request(envelope).await
    }
}

#[async_trait::async_trait]
impl ExchangeTransport for EwsTransport {
    async fn find_items(
        &self,
        folder_id: &str,
        max_entries: usize,
        offset: usize,
    ) -> Result<FindItemsPage> {
        let response = self
            .send("FindItem", templates::find_item(folder_id, max_entries, offset))
            .await?;

        let (status, page) = parser::parse_find_item(&response)?;
        if !status.class.is_success() {
            warn!("FindItem returned {}: {}", status.class, status.code);
            return Err(RecoveryError::Discovery(status.code));
        }

        debug!(
            "FindItem at offset {}: {} items, last page {}",
            offset,
            page.items.len(),
            page.is_last_page
        );
        Ok(page)
    }

    async fn create_folder(&self, parent_folder_id: &str, display_name: &str) -> Result<String> {
        let response = self
            .send(
                "CreateFolder",
                templates::create_folder(parent_folder_id, display_name),
            )
            .await?;

        let (status, folder_id) = parser::parse_create_folder(&response)?;
        parser::ensure_success("CreateFolder", &status)?;
        Ok(folder_id)
    }

    async fn copy_items(
        &self,
        item_ids: &[String],
        target_folder_id: &str,
    ) -> Result<CopyItemsResponse> {
        let response = self
            .send("CopyItem", templates::copy_item(item_ids, target_folder_id))
            .await?;

        parser::parse_copy_item(&response, item_ids)
    }

    async fn find_folders(
        &self,
        parent_folder_id: &str,
        traversal: Traversal,
        max_entries: usize,
        offset: usize,
    ) -> Result<FindFoldersPage> {
        let response = self
            .send(
                "FindFolder",
                templates::find_folder(parent_folder_id, traversal, max_entries, offset),
            )
            .await?;

        let (status, page) = parser::parse_find_folder(&response)?;
        parser::ensure_success("FindFolder", &status)?;
        Ok(page)
    }

    fn name(&self) -> &str {
        "ews"
    }
}

#[cfg(test)]
mod tests {
    use super::templates::{MESSAGES_NS, TYPES_NS};
    use super::*;
    use crate::host::MockMailboxHost;
    use crate::transport::ResponseClass;

    fn wrap(body: &str) -> String {
        format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body xmlns:m="{}" xmlns:t="{}">{}</s:Body></s:Envelope>"#,
            MESSAGES_NS, TYPES_NS, body
        )
    }

    fn transport_answering(response: String) -> EwsTransport {
        let mut host = MockMailboxHost::new();
        host.expect_make_ews_request()
            .times(1)
            .returning(move |_| Ok(response.clone()));
        EwsTransport::new(Arc::new(host))
    }

    #[tokio::test]
    async fn test_find_items_error_is_discovery_error() {
        let transport = transport_answering(wrap(
            r#"<m:FindItemResponseMessage ResponseClass="Error"><m:ResponseCode>ErrorServerBusy</m:ResponseCode></m:FindItemResponseMessage>"#,
        ));

        let result = transport.find_items("recoverableitemsdeletions", 50, 0).await;
        assert!(matches!(result, Err(RecoveryError::Discovery(code)) if code == "ErrorServerBusy"));
    }

    #[tokio::test]
    async fn test_create_folder() {
        let mut host = MockMailboxHost::new();
        host.expect_make_ews_request()
            .withf(|envelope: &String| {
                envelope.contains("<t:DisplayName>Recovered</t:DisplayName>")
                    && envelope.contains(r#"<t:DistinguishedFolderId Id="msgfolderroot"/>"#)
            })
            .times(1)
            .returning(|_| {
                Ok(wrap(
                    r#"<m:CreateFolderResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode><m:Folders><t:Folder><t:FolderId Id="new-folder"/></t:Folder></m:Folders></m:CreateFolderResponseMessage>"#,
                ))
            });

        let transport = EwsTransport::new(Arc::new(host));
        let folder_id = transport
            .create_folder("msgfolderroot", "Recovered")
            .await
            .unwrap();
        assert_eq!(folder_id, "new-folder");
    }

    #[tokio::test]
    async fn test_create_folder_failure_is_service_error() {
        let transport = transport_answering(wrap(
            r#"<m:CreateFolderResponseMessage ResponseClass="Error"><m:ResponseCode>ErrorFolderExists</m:ResponseCode></m:CreateFolderResponseMessage>"#,
        ));

        let result = transport.create_folder("msgfolderroot", "Recovered").await;
        assert!(matches!(
            result,
            Err(RecoveryError::Service { code, .. }) if code == "ErrorFolderExists"
        ));
    }

    #[tokio::test]
    async fn test_copy_items_reports_partial_failure() {
        let transport = transport_answering(wrap(concat!(
            r#"<m:CopyItemResponseMessage ResponseClass="Error"><m:ResponseCode>ErrorItemCorrupt</m:ResponseCode></m:CopyItemResponseMessage>"#,
            r#"<m:CopyItemResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode><m:Items><t:Message><t:ItemId Id="n2"/></t:Message></m:Items></m:CopyItemResponseMessage>"#
        )));

        let ids = vec!["i1".to_string(), "i2".to_string()];
        let response = transport.copy_items(&ids, "target").await.unwrap();
        assert_eq!(response.response_class, ResponseClass::Error);
        assert_eq!(response.response_code, "ErrorItemCorrupt");
        assert_eq!(response.copied_item_ids, vec!["i2".to_string()]);
    }

    #[tokio::test]
    async fn test_host_failure_propagates() {
        let mut host = MockMailboxHost::new();
        host.expect_make_ews_request()
            .returning(|_| Err(RecoveryError::Host("offline".to_string())));
        let transport = EwsTransport::new(Arc::new(host));

        let result = transport
            .find_folders("root", Traversal::Shallow, 10, 0)
            .await;
        assert!(matches!(result, Err(RecoveryError::Host(_))));
    }
}
