//! Integration tests for the item copier against the in-memory mailbox

use recovery_rs::copier::{silent, ItemCopier};
use recovery_rs::hierarchy::{Folder, FolderHierarchy, CONTACTS, MSG_FOLDER_ROOT, ROOT};
use recovery_rs::transport::mock::MockTransport;
use recovery_rs::transport::ExchangeTransport;
use std::collections::HashSet;
use std::sync::Arc;

struct Mailbox {
    mock: Arc<MockTransport>,
    source: Folder,
    inbox: Folder,
    family: Folder,
}

async fn setup_mailbox() -> Mailbox {
    let mock = Arc::new(MockTransport::new());
    let top = mock.add_folder(ROOT, "Top of Information Store", Some(MSG_FOLDER_ROOT)).await;
    let inbox = mock.add_folder(&top.folder_id, "Inbox", Some("inbox")).await;
    let contacts = mock.add_folder(&top.folder_id, "Contacts", Some(CONTACTS)).await;
    let family = mock.add_folder(&contacts.folder_id, "Family", None).await;
    let source = mock
        .add_folder(ROOT, "Deletions", Some("recoverableitemsdeletions"))
        .await;

    Mailbox {
        mock,
        source,
        inbox,
        family,
    }
}

async fn load(mock: &Arc<MockTransport>) -> Arc<FolderHierarchy> {
    Arc::new(FolderHierarchy::initialize(mock.as_ref(), 50).await.unwrap())
}

#[tokio::test]
async fn test_full_drain_with_filtering() {
    let mailbox = setup_mailbox().await;
    let mock = &mailbox.mock;

    let mut eligible = HashSet::new();
    for i in 0..120 {
        // Alternate short ids and full entry ids for the last active folder
        let last_active = if i % 2 == 0 {
            mailbox.inbox.short_folder_id.clone()
        } else {
            mailbox.inbox.entry_id.clone()
        };
        eligible.insert(mock.add_item(&mailbox.source.folder_id, "IPM.Note", &last_active).await);
    }
    for _ in 0..15 {
        mock.add_item(&mailbox.source.folder_id, "IPM.File.Document", "").await;
    }
    for _ in 0..15 {
        mock.add_item(&mailbox.source.folder_id, "IPM.Contact", &mailbox.family.entry_id)
            .await;
    }

    let hierarchy = load(mock).await;
    let target = mock.create_folder(MSG_FOLDER_ROOT, "Recovered").await.unwrap();

    let mut copier = ItemCopier::new(
        mock.clone(),
        hierarchy,
        silent(),
        "recoverableitemsdeletions",
        target.clone(),
        50,
    );

    let mut passes = 0;
    while !copier.process().await {
        passes += 1;
        assert!(passes < 10, "copier did not finish");
    }

    let requests = mock.find_item_requests().await;
    assert_eq!(requests, vec![(0, 50), (50, 50), (100, 50)]);

    let batches: Vec<usize> = mock
        .copy_requests()
        .await
        .iter()
        .map(|r| r.item_ids.len())
        .collect();
    assert_eq!(batches, vec![50, 50, 20]);

    let copied: HashSet<String> = mock.copied_ids().await.into_iter().collect();
    assert_eq!(copied, eligible);

    let summary = copier.summary();
    assert_eq!(summary.copied, 120);
    assert!(summary.bad_items.is_empty());
    assert_eq!(summary.skipped_documents, 15);
    assert_eq!(summary.skipped_contacts, 15);
    assert_eq!(summary.skipped_outside_ipm, 0);
    assert!(summary.discovery_complete);
}

#[tokio::test]
async fn test_poisoned_items_are_isolated() {
    let mailbox = setup_mailbox().await;
    let mock = &mailbox.mock;

    let mut ids = Vec::new();
    for _ in 0..40 {
        ids.push(mock.add_item(&mailbox.source.folder_id, "IPM.Note", "").await);
    }
    mock.poison(&ids[7]).await;
    mock.poison(&ids[31]).await;

    let hierarchy = load(mock).await;
    let mut copier = ItemCopier::new(
        mock.clone(),
        hierarchy,
        silent(),
        mailbox.source.folder_id.clone(),
        "target",
        20,
    );

    while !copier.process().await {}

    let mut bad = copier.state().bad_items.clone();
    bad.sort();
    let mut expected = vec![ids[7].clone(), ids[31].clone()];
    expected.sort();
    assert_eq!(bad, expected);

    // Every other id was copied exactly once
    let copied = mock.copied_ids().await;
    assert_eq!(copied.len(), 38);
    let unique: HashSet<&String> = copied.iter().collect();
    assert_eq!(unique.len(), 38);
    assert_eq!(copier.state().copied, 38);
}

#[tokio::test]
async fn test_items_from_outside_mail_tree_are_skipped() {
    let mailbox = setup_mailbox().await;
    let mock = &mailbox.mock;

    // The source folder itself lives outside the message folder root
    mock.add_item(&mailbox.source.folder_id, "IPM.Note", &mailbox.source.short_folder_id)
        .await;
    let kept = mock
        .add_item(&mailbox.source.folder_id, "IPM.Note", "bm90LWluLWluZGV4")
        .await;

    let hierarchy = load(mock).await;
    let mut copier = ItemCopier::new(
        mock.clone(),
        hierarchy,
        silent(),
        mailbox.source.folder_id.clone(),
        "target",
        10,
    );

    while !copier.process().await {}

    assert_eq!(mock.copied_ids().await, vec![kept]);
    assert_eq!(copier.summary().skipped_outside_ipm, 1);
}

#[tokio::test]
async fn test_empty_source_finishes_without_copying() {
    let mailbox = setup_mailbox().await;
    let hierarchy = load(&mailbox.mock).await;

    let mut copier = ItemCopier::new(
        mailbox.mock.clone(),
        hierarchy,
        silent(),
        mailbox.source.folder_id.clone(),
        "target",
        50,
    );

    assert!(copier.process().await);
    assert!(mailbox.mock.copy_requests().await.is_empty());
}
