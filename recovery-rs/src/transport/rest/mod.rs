//! REST/OData transport
//!
//! Talks to the mailbox REST API with bearer tokens from the host. Paging
//! is offset based: a page shorter than requested is the last one.

pub mod base_url;
pub mod odata;

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use self::odata::{
    expand_properties, props, CopyMessageBody, CreateFolderBody, ODataCollection, RestFolder,
    RestMessage,
};
use super::{
    CopyItemsResponse, DiscoveredItem, ExchangeTransport, FindFoldersPage, FindItemsPage,
    ResponseClass, Traversal,
};
use crate::error::{RecoveryError, Result};
use crate::hierarchy::{normalize_folder_path, Folder};
use crate::host::MailboxHost;
use crate::identifier;

const MESSAGE_FIELDS: &str = "Id,Subject";
const FOLDER_FIELDS: &str = "Id,ChildFolderCount,WellKnownName";

/// Transport speaking OData over HTTPS
pub struct RestTransport {
    host: Arc<dyn MailboxHost>,
    client: reqwest::Client,
}

/// Token and base URL for one operation
struct Session {
    token: String,
    base: String,
}

impl RestTransport {
    pub fn new(host: Arc<dyn MailboxHost>) -> Self {
        Self {
            host,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn session(&self) -> Result<Session> {
        let token = self.host.callback_token().await?;
        let base = base_url::resolve_base_url(self.host.rest_url().as_deref(), &token)?;
        Ok(Session { token, base })
    }

    fn endpoint(base: &str, segments: &[&str]) -> Result<url::Url> {
        let mut url = url::Url::parse(base)
            .map_err(|e| RecoveryError::Host(format!("Invalid REST base URL '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| RecoveryError::Host(format!("REST base URL cannot be a base: {}", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("{} failed with status {}: {}", operation, status, error_text);
            return Err(RecoveryError::service(
                operation,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        Ok(response.json().await?)
    }

    fn to_item(message: RestMessage) -> DiscoveredItem {
        DiscoveredItem {
            item_class: message
                .property(props::MESSAGE_CLASS)
                .unwrap_or_default()
                .to_string(),
            last_active_folder_id: message
                .property(props::LAST_ACTIVE_PARENT_FOLDER_ID)
                .unwrap_or_default()
                .to_string(),
            item_type: message.item_type(),
            item_id: message.id,
            subject: message.subject,
        }
    }

    fn to_folder(folder: RestFolder) -> Option<Folder> {
        let entry_id = folder.property(props::ENTRY_ID).unwrap_or_default().to_string();
        let short_folder_id = match identifier::short_folder_id(&entry_id) {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping folder {}: {}", folder.id, e);
                return None;
            }
        };

        let folder_path = normalize_folder_path(
            folder
                .property(props::FOLDER_PATH_FULL_NAME)
                .unwrap_or_default(),
        );

        Some(Folder {
            folder_id: folder.id,
            entry_id,
            short_folder_id,
            folder_path,
            distinguished_folder_id: folder.well_known_name.filter(|n| !n.is_empty()),
            child_folder_count: folder.child_folder_count,
        })
    }
}

#[async_trait::async_trait]
impl ExchangeTransport for RestTransport {
    async fn find_items(
        &self,
        folder_id: &str,
        max_entries: usize,
        offset: usize,
    ) -> Result<FindItemsPage> {
        let session = self.session().await?;
        let url = Self::endpoint(
            &session.base,
            &["api", "v2.0", "me", "mailFolders", folder_id, "messages"],
        )?;

        let request = self
            .client
            .get(url)
            .bearer_auth(&session.token)
            .query(&[
                ("$top", max_entries.to_string()),
                ("$skip", offset.to_string()),
                ("$select", MESSAGE_FIELDS.to_string()),
                (
                    "$expand",
                    expand_properties(&[props::MESSAGE_CLASS, props::LAST_ACTIVE_PARENT_FOLDER_ID]),
                ),
            ]);

        let odata: ODataCollection<RestMessage> =
            self.execute("FindItem", request).await.map_err(|e| match e {
                RecoveryError::Service { code, .. } => RecoveryError::Discovery(code),
                other => other,
            })?;

        let rows = odata.value.len();
        debug!("REST messages at offset {}: {} rows", offset, rows);

        Ok(FindItemsPage {
            items: odata.value.into_iter().map(Self::to_item).collect(),
            next_offset: offset + rows,
            is_last_page: rows < max_entries,
        })
    }

    async fn create_folder(&self, parent_folder_id: &str, display_name: &str) -> Result<String> {
        let session = self.session().await?;
        let url = Self::endpoint(
            &session.base,
            &["api", "v2.0", "me", "mailFolders", parent_folder_id, "childFolders"],
        )?;

        let request = self
            .client
            .post(url)
            .bearer_auth(&session.token)
            .json(&CreateFolderBody { display_name });

        let folder: RestFolder = self.execute("CreateFolder", request).await?;
        Ok(folder.id)
    }

    async fn copy_items(
        &self,
        item_ids: &[String],
        target_folder_id: &str,
    ) -> Result<CopyItemsResponse> {
        let session = self.session().await?;

        let mut result = CopyItemsResponse {
            response_class: ResponseClass::Success,
            response_code: "NoError".to_string(),
            copied_item_ids: Vec::new(),
            new_item_ids: Vec::new(),
        };

        for item_id in item_ids {
            let url = Self::endpoint(
                &session.base,
                &["api", "v2.0", "me", "messages", item_id.as_str(), "copy"],
            )?;
            let request = self
                .client
                .post(url)
                .bearer_auth(&session.token)
                .json(&CopyMessageBody {
                    destination_id: target_folder_id,
                });

            match self.execute::<RestMessage>("CopyItem", request).await {
                Ok(copy) => {
                    result.copied_item_ids.push(item_id.clone());
                    result.new_item_ids.push(copy.id);
                }
                Err(e) => {
                    warn!("Failed to copy item {}: {}", item_id, e);
                    if result.response_class.is_success() {
                        result.response_class = ResponseClass::Error;
                        result.response_code = match e {
                            RecoveryError::Service { code, .. } => code,
                            other => other.to_string(),
                        };
                    }
                }
            }
        }

        Ok(result)
    }

    async fn find_folders(
        &self,
        parent_folder_id: &str,
        traversal: Traversal,
        max_entries: usize,
        offset: usize,
    ) -> Result<FindFoldersPage> {
        if parent_folder_id.is_empty() {
            return Err(RecoveryError::InvalidArgument(
                "A parent folder id is required".to_string(),
            ));
        }

        if traversal != Traversal::Shallow {
            return Err(RecoveryError::UnsupportedTraversal(traversal));
        }

        let session = self.session().await?;
        let url = Self::endpoint(
            &session.base,
            &["api", "beta", "me", "mailFolders", parent_folder_id, "childFolders"],
        )?;

        let request = self
            .client
            .get(url)
            .bearer_auth(&session.token)
            .query(&[
                ("$top", max_entries.to_string()),
                ("$skip", offset.to_string()),
                ("$select", FOLDER_FIELDS.to_string()),
                (
                    "$expand",
                    expand_properties(&[props::ENTRY_ID, props::FOLDER_PATH_FULL_NAME]),
                ),
            ]);

        let odata: ODataCollection<RestFolder> = self.execute("FindFolder", request).await?;
        let rows = odata.value.len();

        Ok(FindFoldersPage {
            folders: odata.value.into_iter().filter_map(Self::to_folder).collect(),
            next_offset: offset + rows,
            is_last_page: rows < max_entries,
        })
    }

    fn name(&self) -> &str {
        "rest"
    }
}
